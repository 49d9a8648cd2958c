use std::fmt::Debug;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::array::Array;
use crate::config::BackendKind;
use crate::error::Result;
use crate::kernels::BinaryOp;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Capability interface every numeric engine implements.
///
/// Operations are split in two phases. The *build* operations (everything
/// returning an [`Array`]) may defer work; [`Backend::eval`] *materializes*
/// an array into a concrete [`Tensor`]. Eager engines compute during build
/// and treat `eval` as a copy-out, graph engines compute only in `eval`.
///
/// Every operation rejects arrays built by a different engine with
/// `TensorError::BackendMismatch`.
pub trait Backend: Send + Sync + Debug {
    /// Which engine this is.
    fn kind(&self) -> BackendKind;

    /// Returns the name of this backend (e.g., "eager", "graph").
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Fails with `BackendMismatch` unless `a` was built by this engine.
    fn ensure_owned(&self, a: &Array) -> Result<()> {
        a.check_owner(self.kind())
    }

    /// Wrap a concrete tensor as an array owned by this backend.
    fn constant(&self, tensor: Tensor) -> Array;

    /// Build an f64 array from row-major data.
    fn from_vec(&self, data: Vec<f64>, dims: &[usize]) -> Result<Array> {
        Ok(self.constant(Tensor::from_shape_vec(data, Shape::from_slice(dims))?))
    }

    /// Build a boolean array from row-major data.
    fn from_bools(&self, data: Vec<bool>, dims: &[usize]) -> Result<Array> {
        Ok(self.constant(Tensor::from_bools(data, Shape::from_slice(dims))?))
    }

    /// Elementwise binary operation with numpy broadcasting.
    fn binary(&self, op: BinaryOp, a: &Array, b: &Array) -> Result<Array>;

    fn add(&self, a: &Array, b: &Array) -> Result<Array> {
        self.binary(BinaryOp::Add, a, b)
    }

    fn sub(&self, a: &Array, b: &Array) -> Result<Array> {
        self.binary(BinaryOp::Sub, a, b)
    }

    fn mul(&self, a: &Array, b: &Array) -> Result<Array> {
        self.binary(BinaryOp::Mul, a, b)
    }

    /// Scalar multiplication: result[i] = a[i] * s.
    fn scale(&self, a: &Array, s: f64) -> Result<Array>;

    /// Elementwise square root.
    fn sqrt(&self, a: &Array) -> Result<Array>;

    /// Numpy-style dot product of operands of rank at most 2.
    ///
    /// - `(k) . (k) -> ()`
    /// - `(m, k) . (k) -> (m)`
    /// - `(k) . (k, n) -> (n)`
    /// - `(m, k) . (k, n) -> (m, n)`
    fn dot(&self, a: &Array, b: &Array) -> Result<Array>;

    /// Matrix product of rank-2 or rank-3 (batched) operands.
    fn matmul(&self, a: &Array, b: &Array) -> Result<Array>;

    /// Reverse the axis order. Rank 0 and 1 arrays are returned unchanged.
    fn transpose(&self, a: &Array) -> Result<Array>;

    /// Reinterpret the data with a new shape of the same element count.
    fn reshape(&self, a: &Array, shape: Shape) -> Result<Array>;

    /// Sum along `axis`, removing it.
    fn sum_axis(&self, a: &Array, axis: usize) -> Result<Array>;

    /// The `k x k` identity matrix.
    fn eye(&self, k: usize) -> Array {
        self.constant(Tensor::eye(k))
    }

    /// Independent uniform samples from `[low, high)`.
    fn random_uniform(&self, shape: Shape, low: f64, high: f64) -> Result<Array>;

    /// Reseed the sampler behind `random_uniform`.
    fn seed(&self, seed: u64);

    /// Materialize an array into a concrete tensor.
    fn eval(&self, a: &Array) -> Result<Tensor>;
}

/// Seeded source of per-call sampling seeds.
///
/// Each `random_uniform` call takes one 64-bit sub-seed from here, and the
/// values are generated from that sub-seed alone. Engines that share a seed
/// therefore produce identical samples whenever they sample.
#[derive(Debug)]
pub(crate) struct SeedSource {
    rng: Mutex<StdRng>,
}

impl SeedSource {
    pub(crate) fn from_entropy() -> Self {
        SeedSource {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub(crate) fn reseed(&self, seed: u64) {
        *self.lock() = StdRng::seed_from_u64(seed);
    }

    pub(crate) fn next_seed(&self) -> u64 {
        self.lock().gen()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StdRng> {
        // The RNG has no invariant a panicking holder could break.
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
