use thiserror::Error;

/// Errors produced anywhere in the library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported activation type: {0}")]
    UnsupportedActivation(String),

    #[error("Shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        got: String,
    },

    #[error("Ragged batch: row {row} has {got} values, expected {expected}")]
    RaggedBatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("{0}: backward called before forward")]
    BackwardBeforeForward(&'static str),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid model file: {0}")]
    ModelFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a `ShapeMismatch` between two `(rows, cols)` shapes.
    pub(crate) fn shape(
        context: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    ) -> Error {
        Error::ShapeMismatch {
            context,
            expected: format!("{}x{}", expected.0, expected.1),
            got: format!("{}x{}", got.0, got.1),
        }
    }
}
