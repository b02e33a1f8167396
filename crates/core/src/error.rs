//! Error types for geochroma

use thiserror::Error;

/// Main error type for geochroma operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error(
        "Band shape mismatch: {band} is {}x{}, expected {}x{}",
        actual.0, actual.1, expected.0, expected.1
    )]
    ShapeMismatch {
        band: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Invalid legend ramp '{key}': {reason}")]
    InvalidRamp { key: String, reason: String },

    #[error("Unknown legend preset: {0}")]
    UnknownPreset(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shape mismatch between a band and the reference shape.
    pub fn shape_mismatch(
        band: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        Error::ShapeMismatch {
            band,
            expected,
            actual,
        }
    }
}

/// Result type alias for geochroma operations
pub type Result<T> = std::result::Result<T, Error>;
