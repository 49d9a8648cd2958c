use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::Storage;

/// A concrete, fully materialized tensor.
///
/// Holds contiguous row-major data with an associated shape. This is what
/// `Backend::eval` hands back regardless of the engine that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
}

impl Tensor {
    /// Create a new f64 tensor from data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f64>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        Tensor {
            storage: Storage::F64(data),
            shape,
        }
    }

    /// Fallible variant of [`Tensor::new`].
    pub fn from_shape_vec(data: Vec<f64>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor::new(data, shape))
    }

    /// Create a boolean tensor.
    pub fn from_bools(data: Vec<bool>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor {
            storage: Storage::Bool(data),
            shape,
        })
    }

    /// A rank-0 tensor holding one value.
    pub fn scalar(value: f64) -> Self {
        Tensor::new(vec![value], Shape::scalar())
    }

    /// The `k x k` identity matrix.
    pub fn eye(k: usize) -> Self {
        let mut data = vec![0.0; k * k];
        for i in 0..k {
            data[i * k + i] = 1.0;
        }
        Tensor::new(data, Shape::new(vec![k, k]))
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Returns the underlying data as an f64 slice.
    pub fn data_f64(&self) -> Result<&[f64]> {
        self.storage.as_f64_slice()
    }

    /// Returns the underlying data as a bool slice.
    pub fn data_bool(&self) -> Result<&[bool]> {
        self.storage.as_bool_slice()
    }

    /// Reshape the tensor, returning a new tensor with the same data but
    /// a different shape.
    ///
    /// The total number of elements must remain the same.
    pub fn reshape(&self, new_shape: Shape) -> Result<Tensor> {
        if self.shape.numel() != new_shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: new_shape.dims().to_vec(),
            });
        }
        Ok(Tensor {
            storage: self.storage.clone(),
            shape: new_shape,
        })
    }

    /// Elementwise comparison within an absolute tolerance.
    ///
    /// Shapes and dtypes must match exactly; booleans compare by equality.
    pub fn all_close(&self, other: &Tensor, tol: f64) -> bool {
        if self.shape != other.shape {
            return false;
        }
        match (&self.storage, &other.storage) {
            (Storage::F64(a), Storage::F64(b)) => {
                a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tol)
            }
            (Storage::Bool(a), Storage::Bool(b)) => a == b,
            _ => false,
        }
    }
}
