pub mod mnist;

pub use mnist::{load_split, Dataset, Split};
