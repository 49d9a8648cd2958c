use crate::array::{Array, Repr};
use crate::backend::{Backend, SeedSource};
use crate::config::BackendKind;
use crate::error::{Result, TensorError};
use crate::kernels::{self, BinaryOp};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Eager array engine.
///
/// Every build operation runs its kernel immediately, so arrays are always
/// materialized and `eval` just copies the tensor out.
#[derive(Debug)]
pub struct EagerBackend {
    seeds: SeedSource,
}

impl EagerBackend {
    pub fn new() -> Self {
        EagerBackend {
            seeds: SeedSource::from_entropy(),
        }
    }

    fn tensor<'a>(&self, a: &'a Array) -> Result<&'a Tensor> {
        a.check_owner(self.kind())?;
        match a.repr() {
            Repr::Concrete(t) => Ok(t.as_ref()),
            #[cfg(feature = "graph")]
            Repr::Deferred(_) => Err(TensorError::Other(
                "eager backend received a deferred array".to_string(),
            )),
        }
    }

    fn wrap(&self, tensor: Tensor) -> Array {
        Array::concrete(self.kind(), tensor)
    }
}

impl Default for EagerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for EagerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Eager
    }

    fn constant(&self, tensor: Tensor) -> Array {
        self.wrap(tensor)
    }

    fn binary(&self, op: BinaryOp, a: &Array, b: &Array) -> Result<Array> {
        Ok(self.wrap(kernels::binary(op, self.tensor(a)?, self.tensor(b)?)?))
    }

    fn scale(&self, a: &Array, s: f64) -> Result<Array> {
        Ok(self.wrap(kernels::scale(self.tensor(a)?, s)?))
    }

    fn sqrt(&self, a: &Array) -> Result<Array> {
        Ok(self.wrap(kernels::sqrt(self.tensor(a)?)?))
    }

    fn dot(&self, a: &Array, b: &Array) -> Result<Array> {
        Ok(self.wrap(kernels::dot(self.tensor(a)?, self.tensor(b)?)?))
    }

    fn matmul(&self, a: &Array, b: &Array) -> Result<Array> {
        Ok(self.wrap(kernels::matmul(self.tensor(a)?, self.tensor(b)?)?))
    }

    fn transpose(&self, a: &Array) -> Result<Array> {
        Ok(self.wrap(kernels::transpose(self.tensor(a)?)?))
    }

    fn reshape(&self, a: &Array, shape: Shape) -> Result<Array> {
        Ok(self.wrap(self.tensor(a)?.reshape(shape)?))
    }

    fn sum_axis(&self, a: &Array, axis: usize) -> Result<Array> {
        Ok(self.wrap(kernels::sum_axis(self.tensor(a)?, axis)?))
    }

    fn random_uniform(&self, shape: Shape, low: f64, high: f64) -> Result<Array> {
        kernels::check_uniform_range(low, high)?;
        let seed = self.seeds.next_seed();
        Ok(self.wrap(kernels::random_uniform(&shape, low, high, seed)?))
    }

    fn seed(&self, seed: u64) {
        self.seeds.reseed(seed);
    }

    fn eval(&self, a: &Array) -> Result<Tensor> {
        Ok(self.tensor(a)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> EagerBackend {
        EagerBackend::new()
    }

    #[test]
    fn test_ops_are_materialized_immediately() {
        let b = backend();
        let x = b.from_vec(vec![0.0, 1.0], &[2]).unwrap();
        let y = b.from_vec(vec![2.0, 10.0], &[2]).unwrap();
        let d = b.dot(&x, &y).unwrap();
        assert!(d.is_materialized());
        assert_eq!(d.shape().ndim(), 0);
        assert_eq!(b.eval(&d).unwrap().data_f64().unwrap(), &[10.0]);
    }

    #[test]
    fn test_eval_is_identity() {
        let b = backend();
        let t = Tensor::new(vec![1.0, 2.0], Shape::new(vec![1, 2]));
        let a = b.constant(t.clone());
        assert_eq!(b.eval(&a).unwrap(), t);
    }

    #[test]
    fn test_eye_and_transpose() {
        let b = backend();
        let i = b.eye(2);
        assert_eq!(
            b.eval(&i).unwrap().data_f64().unwrap(),
            &[1.0, 0.0, 0.0, 1.0]
        );
        let m = b.from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let mt = b.transpose(&m).unwrap();
        assert_eq!(
            b.eval(&mt).unwrap().data_f64().unwrap(),
            &[1.0, 3.0, 2.0, 4.0]
        );
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let b = backend();
        b.seed(1234);
        let first = b.random_uniform(Shape::new(vec![3, 2]), -1.0, 1.0).unwrap();
        b.seed(1234);
        let second = b.random_uniform(Shape::new(vec![3, 2]), -1.0, 1.0).unwrap();
        assert_eq!(b.eval(&first).unwrap(), b.eval(&second).unwrap());
    }

    #[test]
    fn test_reshape_and_sum() {
        let b = backend();
        let a = b.from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4]).unwrap();
        let r = b.reshape(&a, Shape::new(vec![2, 2])).unwrap();
        let s = b.sum_axis(&r, 1).unwrap();
        assert_eq!(b.eval(&s).unwrap().data_f64().unwrap(), &[3.0, 7.0]);
        assert!(b.reshape(&a, Shape::new(vec![3])).is_err());
    }

    #[test]
    fn test_bool_inputs_rejected_by_arithmetic() {
        let b = backend();
        let flags = b.from_bools(vec![true, false], &[2]).unwrap();
        assert!(matches!(
            b.scale(&flags, 2.0),
            Err(TensorError::DTypeMismatch { .. })
        ));
    }
}
