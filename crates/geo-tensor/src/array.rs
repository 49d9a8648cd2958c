use std::sync::Arc;

use crate::config::BackendKind;
use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;

#[cfg(feature = "graph")]
use crate::graph::Node;

/// A value produced by a [`Backend`](crate::Backend).
///
/// An `Array` remembers which engine built it. The eager engine always hands
/// out concrete arrays; the graph engine hands out deferred nodes that only
/// hold a statically known shape until they are passed to `Backend::eval`.
#[derive(Debug, Clone)]
pub struct Array {
    backend: BackendKind,
    shape: Shape,
    dtype: DType,
    repr: Repr,
}

#[derive(Debug, Clone)]
pub(crate) enum Repr {
    Concrete(Arc<Tensor>),
    #[cfg(feature = "graph")]
    Deferred(Arc<Node>),
}

impl Array {
    pub(crate) fn concrete(backend: BackendKind, tensor: Tensor) -> Self {
        Array {
            backend,
            shape: tensor.shape().clone(),
            dtype: tensor.dtype(),
            repr: Repr::Concrete(Arc::new(tensor)),
        }
    }

    #[cfg(feature = "graph")]
    pub(crate) fn deferred(backend: BackendKind, node: Arc<Node>) -> Self {
        Array {
            backend,
            shape: node.shape().clone(),
            dtype: node.dtype(),
            repr: Repr::Deferred(node),
        }
    }

    pub(crate) fn repr(&self) -> &Repr {
        &self.repr
    }

    /// Static shape, available without evaluation.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The engine that built this array.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend
    }

    /// Whether the values of this array have been computed.
    ///
    /// Always true for eager arrays; true for deferred arrays once they have
    /// been evaluated.
    pub fn is_materialized(&self) -> bool {
        match &self.repr {
            Repr::Concrete(_) => true,
            #[cfg(feature = "graph")]
            Repr::Deferred(node) => node.is_materialized(),
        }
    }

    /// Fails with `BackendMismatch` unless this array was built by `kind`.
    pub(crate) fn check_owner(&self, kind: BackendKind) -> Result<()> {
        if self.backend != kind {
            return Err(TensorError::BackendMismatch {
                expected: kind.to_string(),
                got: self.backend.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_array_metadata() {
        let a = Array::concrete(
            BackendKind::Eager,
            Tensor::new(vec![0.0, 1.0], Shape::new(vec![2])),
        );
        assert_eq!(a.shape().dims(), &[2]);
        assert_eq!(a.ndim(), 1);
        assert_eq!(a.dtype(), DType::F64);
        assert_eq!(a.backend_kind(), BackendKind::Eager);
        assert!(a.is_materialized());
    }

    #[test]
    fn test_check_owner() {
        let a = Array::concrete(BackendKind::Eager, Tensor::scalar(1.0));
        assert!(a.check_owner(BackendKind::Eager).is_ok());
        assert!(matches!(
            a.check_owner(BackendKind::Graph),
            Err(TensorError::BackendMismatch { .. })
        ));
    }
}
