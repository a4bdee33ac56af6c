use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Magic number of an IDX3 unsigned-byte image file.
pub const IMAGE_MAGIC: u32 = 0x0000_0803;
/// Magic number of an IDX1 unsigned-byte label file.
pub const LABEL_MAGIC: u32 = 0x0000_0801;

/// Which half of MNIST to load; selects the standard file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn prefix(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "t10k",
        }
    }

    pub fn image_file(&self) -> String {
        format!("{}-images.idx3-ubyte", self.prefix())
    }

    pub fn label_file(&self) -> String {
        format!("{}-labels.idx1-ubyte", self.prefix())
    }
}

/// Normalized images (one row per sample) and matching one-hot targets.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub images: Matrix,
    pub labels: Matrix,
}

impl Dataset {
    pub fn new(images: Matrix, labels: Matrix) -> Result<Dataset> {
        if images.rows != labels.rows {
            return Err(Error::InvalidDataset(format!(
                "{} images but {} labels",
                images.rows, labels.rows
            )));
        }
        Ok(Dataset { images, labels })
    }

    pub fn len(&self) -> usize {
        self.images.rows
    }

    pub fn is_empty(&self) -> bool {
        self.images.rows == 0
    }
}

fn read_be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

/// Parses an IDX3 image file.
///
/// ```text
/// bytes  0-3:   magic 0x00000803 (big-endian u32)
/// bytes  4-7:   N     number of images
/// bytes  8-11:  rows
/// bytes 12-15:  cols
/// bytes 16..:   N * rows * cols bytes, row-major, uint8
/// ```
///
/// Returns an `N × (rows*cols)` matrix of raw pixel values in `[0, 255]`.
pub fn parse_images(bytes: &[u8]) -> Result<Matrix> {
    if bytes.len() < 16 {
        return Err(Error::InvalidDataset(format!(
            "image file too short: expected at least 16 header bytes, got {}",
            bytes.len()
        )));
    }
    let magic = read_be_u32(bytes, 0);
    if magic != IMAGE_MAGIC {
        return Err(Error::InvalidDataset(format!(
            "image file magic number mismatch (got {:#010x}, expected {:#010x})",
            magic, IMAGE_MAGIC
        )));
    }

    let n_items = read_be_u32(bytes, 4) as usize;
    let rows = read_be_u32(bytes, 8) as usize;
    let cols = read_be_u32(bytes, 12) as usize;

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        Error::InvalidDataset(format!("rows * cols overflows (rows={}, cols={})", rows, cols))
    })?;
    let data_len = n_items.checked_mul(n_pixels).ok_or_else(|| {
        Error::InvalidDataset(format!(
            "n_items * n_pixels overflows (n_items={}, n_pixels={})",
            n_items, n_pixels
        ))
    })?;
    if bytes.len() - 16 < data_len {
        return Err(Error::InvalidDataset(format!(
            "image file declares {} images of {}x{} pixels ({} data bytes) but only {} follow the header",
            n_items,
            rows,
            cols,
            data_len,
            bytes.len() - 16
        )));
    }

    let data = if n_pixels == 0 {
        vec![Vec::new(); n_items]
    } else {
        bytes[16..16 + data_len]
            .chunks_exact(n_pixels)
            .map(|chunk| chunk.iter().map(|&px| px as f32).collect())
            .collect()
    };
    Ok(Matrix { rows: n_items, cols: n_pixels, data })
}

/// Parses an IDX1 label file.
///
/// ```text
/// bytes 0-3:  magic 0x00000801 (big-endian u32)
/// bytes 4-7:  N     number of labels
/// bytes 8..:  N bytes, each a class index
/// ```
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < 8 {
        return Err(Error::InvalidDataset(format!(
            "label file too short: expected at least 8 header bytes, got {}",
            bytes.len()
        )));
    }
    let magic = read_be_u32(bytes, 0);
    if magic != LABEL_MAGIC {
        return Err(Error::InvalidDataset(format!(
            "label file magic number mismatch (got {:#010x}, expected {:#010x})",
            magic, LABEL_MAGIC
        )));
    }

    let n_items = read_be_u32(bytes, 4) as usize;
    if bytes.len() - 8 < n_items {
        return Err(Error::InvalidDataset(format!(
            "label file declares {} labels but only {} bytes follow the header",
            n_items,
            bytes.len() - 8
        )));
    }
    Ok(bytes[8..8 + n_items].to_vec())
}

/// Scales raw pixel values from `[0, 255]` to `[0, 1]`.
pub fn normalize_images(images: &mut Matrix) {
    for row in images.data.iter_mut() {
        for px in row.iter_mut() {
            *px /= 255.0;
        }
    }
}

/// One row per label with a single 1.0 at the label's index.
pub fn one_hot_encode(labels: &[u8], num_classes: usize) -> Result<Matrix> {
    let mut encoded = Matrix::zeros(labels.len(), num_classes);
    for (i, &label) in labels.iter().enumerate() {
        let class = label as usize;
        if class >= num_classes {
            return Err(Error::InvalidDataset(format!(
                "label at index {}: class {} is out of range for {} classes",
                i, class, num_classes
            )));
        }
        encoded.data[i][class] = 1.0;
    }
    Ok(encoded)
}

pub fn load_images<P: AsRef<Path>>(path: P) -> Result<Matrix> {
    parse_images(&std::fs::read(path)?)
}

pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    parse_labels(&std::fs::read(path)?)
}

/// Loads one split from `dir`, normalized and one-hot encoded.
pub fn load_split<P: AsRef<Path>>(dir: P, split: Split, num_classes: usize) -> Result<Dataset> {
    let dir = dir.as_ref();
    let mut images = load_images(dir.join(split.image_file()))?;
    let labels = load_labels(dir.join(split.label_file()))?;
    normalize_images(&mut images);
    let labels = one_hot_encode(&labels, num_classes)?;
    let dataset = Dataset::new(images, labels)?;
    info!(split = ?split, samples = dataset.len(), features = dataset.images.cols, "dataset loaded");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_bytes(n: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&n.to_be_bytes());
        bytes.extend_from_slice(&rows.to_be_bytes());
        bytes.extend_from_slice(&cols.to_be_bytes());
        bytes.extend_from_slice(pixels);
        bytes
    }

    fn label_bytes(labels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        bytes.extend_from_slice(labels);
        bytes
    }

    #[test]
    fn parses_images_row_major() {
        let m = parse_images(&image_bytes(2, 1, 2, &[0, 255, 51, 102])).unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.data, vec![vec![0.0, 255.0], vec![51.0, 102.0]]);
    }

    #[test]
    fn normalization_maps_to_unit_interval() {
        let mut m = parse_images(&image_bytes(1, 1, 3, &[0, 51, 255])).unwrap();
        normalize_images(&mut m);
        assert_eq!(m.data, vec![vec![0.0, 0.2, 1.0]]);
    }

    #[test]
    fn rejects_wrong_image_magic() {
        let mut bytes = image_bytes(1, 1, 1, &[0]);
        bytes[3] = 0x01;
        assert!(matches!(parse_images(&bytes), Err(Error::InvalidDataset(_))));
    }

    #[test]
    fn rejects_truncated_images() {
        let bytes = image_bytes(2, 2, 2, &[1, 2, 3, 4, 5]);
        assert!(matches!(parse_images(&bytes), Err(Error::InvalidDataset(_))));
        assert!(parse_images(&[0, 0, 8]).is_err());
    }

    #[test]
    fn parses_labels() {
        assert_eq!(parse_labels(&label_bytes(&[7, 0, 9])).unwrap(), vec![7, 0, 9]);
    }

    #[test]
    fn rejects_truncated_labels() {
        let mut bytes = label_bytes(&[1, 2, 3]);
        bytes.pop();
        assert!(matches!(parse_labels(&bytes), Err(Error::InvalidDataset(_))));
    }

    #[test]
    fn one_hot_places_single_one() {
        let m = one_hot_encode(&[2, 0], 3).unwrap();
        assert_eq!(m.data, vec![vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]]);
    }

    #[test]
    fn one_hot_rejects_out_of_range_label() {
        assert!(matches!(one_hot_encode(&[3], 3), Err(Error::InvalidDataset(_))));
    }

    #[test]
    fn dataset_requires_matching_counts() {
        assert!(Dataset::new(Matrix::zeros(2, 4), Matrix::zeros(3, 10)).is_err());
    }

    #[test]
    fn split_file_names_follow_convention() {
        assert_eq!(Split::Train.image_file(), "train-images.idx3-ubyte");
        assert_eq!(Split::Test.label_file(), "t10k-labels.idx1-ubyte");
    }
}
