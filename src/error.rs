use thiserror::Error;

/// Raised by the disjoint-set forest when an element index is outside `[0, len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForestError {
    #[error("Index {index} is out of range for a forest of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Raised when external settings fall outside their documented ranges.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} = {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error(transparent)]
    Forest(#[from] ForestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Raster has no pixels ({width}x{height})")]
    EmptyRaster { width: u32, height: u32 },

    #[error("Raster is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Mask has {actual} entries, expected {expected}")]
    MaskLengthMismatch { expected: usize, actual: usize },

    #[error("Detection requires a running tokio runtime")]
    NoRuntime,

    #[error("Suppression stage aborted: {0}")]
    StageAborted(String),
}

pub type DetectionResult<T> = Result<T, DetectionError>;
