use geo_tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("dimension mismatch: expected points of dimension {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("cannot pair batches of {a} and {b} points")]
    ShapeMismatch { a: usize, b: usize },
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("manifold dimension must be positive, got {0}")]
    InvalidDimension(usize),
    #[error("expected an array of rank {expected}, got rank {got}")]
    InvalidRank { expected: String, got: usize },
    #[error("number of samples must be positive, got {0}")]
    InvalidSampleCount(usize),
    #[error("sampling bound must be positive and finite, got {0}")]
    InvalidBound(f64),
    #[error("tensor error: {0}")]
    Tensor(TensorError),
}

impl From<TensorError> for GeometryError {
    fn from(err: TensorError) -> Self {
        match err {
            TensorError::BackendUnavailable(msg) => GeometryError::BackendUnavailable(msg),
            other => GeometryError::Tensor(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeometryError>;
