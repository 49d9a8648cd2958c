use crate::dtype::DType;
use crate::error::{Result, TensorError};

/// Host-side element storage for a concrete tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    F64(Vec<f64>),
    Bool(Vec<bool>),
}

impl Storage {
    /// Returns the data as an f64 slice.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` for boolean storage.
    pub fn as_f64_slice(&self) -> Result<&[f64]> {
        match self {
            Storage::F64(v) => Ok(v.as_slice()),
            other => Err(TensorError::DTypeMismatch {
                expected: DType::F64.to_string(),
                got: other.dtype().to_string(),
            }),
        }
    }

    /// Returns the data as a bool slice.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` for floating point storage.
    pub fn as_bool_slice(&self) -> Result<&[bool]> {
        match self {
            Storage::Bool(v) => Ok(v.as_slice()),
            other => Err(TensorError::DTypeMismatch {
                expected: DType::Bool.to_string(),
                got: other.dtype().to_string(),
            }),
        }
    }

    /// Returns the dtype of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            Storage::F64(_) => DType::F64,
            Storage::Bool(_) => DType::Bool,
        }
    }
}
