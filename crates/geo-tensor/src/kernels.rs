//! Concrete numeric kernels shared by every backend.
//!
//! Each kernel comes with a shape-inference function so the graph engine can
//! know result shapes at build time without running anything. Kernels work on
//! f64 tensors only and are written as plain loops.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Elementwise binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

impl BinaryOp {
    fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
        }
    }
}

/// Geometry of a (possibly batched) matrix product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatmulDims {
    batch: usize,
    a_batched: bool,
    b_batched: bool,
    m: usize,
    k: usize,
    n: usize,
}

pub fn binary_shape(a: &Shape, b: &Shape) -> Result<Shape> {
    Shape::broadcast_shape(a, b)
}

/// Elementwise `op` with numpy broadcasting.
pub fn binary(op: BinaryOp, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let out = binary_shape(a.shape(), b.shape())?;
    let x = a.data_f64()?;
    let y = b.data_f64()?;

    let data = if a.shape() == b.shape() {
        x.iter().zip(y.iter()).map(|(&p, &q)| op.apply(p, q)).collect()
    } else {
        let xi = a.shape().broadcast_offsets(&out);
        let yi = b.shape().broadcast_offsets(&out);
        xi.iter()
            .zip(yi.iter())
            .map(|(&i, &j)| op.apply(x[i], y[j]))
            .collect()
    };
    Ok(Tensor::new(data, out))
}

/// Scalar multiplication: result[i] = a[i] * s.
pub fn scale(a: &Tensor, s: f64) -> Result<Tensor> {
    let data = a.data_f64()?.iter().map(|x| x * s).collect();
    Ok(Tensor::new(data, a.shape().clone()))
}

/// Elementwise square root.
pub fn sqrt(a: &Tensor) -> Result<Tensor> {
    let data = a.data_f64()?.iter().map(|x| x.sqrt()).collect();
    Ok(Tensor::new(data, a.shape().clone()))
}

/// Result shape of numpy-style `dot` for operands of rank at most 2.
pub fn dot_shape(a: &Shape, b: &Shape) -> Result<Shape> {
    let mismatch = |m, k, k2, n| TensorError::MatmulMismatch { m, k, k2, n };
    match (a.dims(), b.dims()) {
        ([], _) => Ok(b.clone()),
        (_, []) => Ok(a.clone()),
        (&[k], &[k2]) if k == k2 => Ok(Shape::scalar()),
        (&[k], &[k2]) => Err(mismatch(1, k, k2, 1)),
        (&[m, k], &[k2]) if k == k2 => Ok(Shape::new(vec![m])),
        (&[m, k], &[k2]) => Err(mismatch(m, k, k2, 1)),
        (&[k], &[k2, n]) if k == k2 => Ok(Shape::new(vec![n])),
        (&[k], &[k2, n]) => Err(mismatch(1, k, k2, n)),
        (&[m, k], &[k2, n]) if k == k2 => Ok(Shape::new(vec![m, n])),
        (&[m, k], &[k2, n]) => Err(mismatch(m, k, k2, n)),
        _ => Err(TensorError::Other(format!(
            "dot supports operands of rank <= 2, got {} and {}; use matmul for batches",
            a, b
        ))),
    }
}

/// Numpy-style `dot` for operands of rank at most 2.
pub fn dot(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let out = dot_shape(a.shape(), b.shape())?;
    if a.shape().ndim() == 0 || b.shape().ndim() == 0 {
        return binary(BinaryOp::Mul, a, b);
    }

    // Promote vectors to matrices, multiply, then drop the promoted axes.
    // dot_shape has already limited both operands to rank 1 or 2.
    let (m, k) = match a.shape().dims() {
        &[k] => (1, k),
        dims => (dims[0], dims[1]),
    };
    let n = match b.shape().dims() {
        &[_] => 1,
        dims => dims[1],
    };
    let data = matmul_kernel(a.data_f64()?, b.data_f64()?, m, k, n);
    Ok(Tensor::new(data, out))
}

fn matmul_dims(a: &Shape, b: &Shape) -> Result<MatmulDims> {
    let (a_batch, m, k) = match a.dims() {
        &[m, k] => (None, m, k),
        &[bt, m, k] => (Some(bt), m, k),
        _ => {
            return Err(TensorError::Other(format!(
                "matmul requires rank 2 or 3 operands, got {}",
                a
            )))
        }
    };
    let (b_batch, k2, n) = match b.dims() {
        &[k2, n] => (None, k2, n),
        &[bt, k2, n] => (Some(bt), k2, n),
        _ => {
            return Err(TensorError::Other(format!(
                "matmul requires rank 2 or 3 operands, got {}",
                b
            )))
        }
    };
    if k != k2 {
        return Err(TensorError::MatmulMismatch { m, k, k2, n });
    }

    let batch = match (a_batch, b_batch) {
        (None, None) => 1,
        (Some(x), None) | (None, Some(x)) => x,
        (Some(x), Some(y)) if x == y || y == 1 => x,
        (Some(1), Some(y)) => y,
        (Some(_), Some(_)) => {
            return Err(TensorError::BroadcastError {
                a: a.dims().to_vec(),
                b: b.dims().to_vec(),
            })
        }
    };

    Ok(MatmulDims {
        batch,
        a_batched: a_batch.map_or(false, |x| x > 1),
        b_batched: b_batch.map_or(false, |x| x > 1),
        m,
        k,
        n,
    })
}

/// Result shape of `matmul`.
pub fn matmul_shape(a: &Shape, b: &Shape) -> Result<Shape> {
    let d = matmul_dims(a, b)?;
    if a.ndim() == 2 && b.ndim() == 2 {
        Ok(Shape::new(vec![d.m, d.n]))
    } else {
        Ok(Shape::new(vec![d.batch, d.m, d.n]))
    }
}

/// Matrix product of rank-2 matrices, or of stacks of them.
///
/// - `[m, k] @ [k, n] -> [m, n]`
/// - `[b, m, k] @ [k, n] -> [b, m, n]` (and the mirrored case)
/// - `[b, m, k] @ [b, k, n] -> [b, m, n]`, a batch of 1 broadcasts
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let out = matmul_shape(a.shape(), b.shape())?;
    let d = matmul_dims(a.shape(), b.shape())?;
    let x = a.data_f64()?;
    let y = b.data_f64()?;

    let mut data = Vec::with_capacity(out.numel());
    for i in 0..d.batch {
        let xa = if d.a_batched { i * d.m * d.k } else { 0 };
        let yb = if d.b_batched { i * d.k * d.n } else { 0 };
        data.extend(matmul_kernel(
            &x[xa..xa + d.m * d.k],
            &y[yb..yb + d.k * d.n],
            d.m,
            d.k,
            d.n,
        ));
    }
    Ok(Tensor::new(data, out))
}

/// C = A @ B for row-major `[m, k]` and `[k, n]` data.
fn matmul_kernel(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0f64; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0f64;
            for p in 0..k {
                sum += a[i * k + p] * b[p * n + j];
            }
            c[i * n + j] = sum;
        }
    }
    c
}

/// Reverse the axis order of a tensor.
pub fn transpose(a: &Tensor) -> Result<Tensor> {
    let shape = a.shape();
    let x = a.data_f64()?;
    if shape.ndim() <= 1 {
        return Ok(a.clone());
    }
    let out = shape.reversed();
    let src_strides = shape.strides();
    let out_strides = out.strides();
    let ndim = shape.ndim();

    let data = (0..out.numel())
        .map(|flat| {
            let mut offset = 0;
            for axis in 0..ndim {
                let coord = (flat / out_strides[axis]) % out.dim(axis);
                offset += coord * src_strides[ndim - 1 - axis];
            }
            x[offset]
        })
        .collect();
    Ok(Tensor::new(data, out))
}

pub fn sum_axis_shape(a: &Shape, axis: usize) -> Result<Shape> {
    a.remove_axis(axis)
}

/// Sum along `axis`, removing it.
pub fn sum_axis(a: &Tensor, axis: usize) -> Result<Tensor> {
    let out = sum_axis_shape(a.shape(), axis)?;
    let dims = a.shape().dims();
    let outer: usize = dims[..axis].iter().product();
    let len = dims[axis];
    let inner: usize = dims[axis + 1..].iter().product();
    let x = a.data_f64()?;

    let mut data = vec![0.0f64; outer * inner];
    for o in 0..outer {
        for l in 0..len {
            let base = (o * len + l) * inner;
            for i in 0..inner {
                data[o * inner + i] += x[base + i];
            }
        }
    }
    Ok(Tensor::new(data, out))
}

/// Fails unless `[low, high)` is a finite, non-empty interval.
///
/// Engines call this before drawing a sub-seed, so a rejected request leaves
/// the sampler stream untouched.
pub fn check_uniform_range(low: f64, high: f64) -> Result<()> {
    if !(low.is_finite() && high.is_finite()) || low >= high {
        return Err(TensorError::Other(format!(
            "random_uniform requires finite low < high, got [{}, {})",
            low, high
        )));
    }
    Ok(())
}

/// Draw `shape.numel()` values uniformly from `[low, high)` using an RNG
/// seeded with `seed`.
pub fn random_uniform(shape: &Shape, low: f64, high: f64, seed: u64) -> Result<Tensor> {
    check_uniform_range(low, high)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let distribution = Uniform::new(low, high);
    let data = (0..shape.numel())
        .map(|_| distribution.sample(&mut rng))
        .collect();
    Ok(Tensor::new(data, shape.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn t(data: &[f64], dims: &[usize]) -> Tensor {
        Tensor::new(data.to_vec(), Shape::from_slice(dims))
    }

    #[test]
    fn test_add_same_shape() {
        let r = binary(BinaryOp::Add, &t(&[1.0, 2.0], &[2]), &t(&[3.0, 4.0], &[2])).unwrap();
        assert_eq!(r.data_f64().unwrap(), &[4.0, 6.0]);
    }

    #[test]
    fn test_mul_broadcast_row() {
        let batch = t(&[2.0, 1.0, -2.0, -4.0, -5.0, 1.0], &[3, 2]);
        let row = t(&[2.0, 10.0], &[1, 2]);
        let r = binary(BinaryOp::Mul, &batch, &row).unwrap();
        assert_eq!(r.shape().dims(), &[3, 2]);
        assert_eq!(r.data_f64().unwrap(), &[4.0, 10.0, -4.0, -40.0, -10.0, 10.0]);
    }

    #[test]
    fn test_sub_broadcast_error() {
        let a = t(&[1.0, 2.0, 3.0], &[3, 1]);
        let b = t(&[1.0, 2.0], &[2, 1]);
        assert!(matches!(
            binary(BinaryOp::Sub, &a, &b),
            Err(TensorError::BroadcastError { .. })
        ));
    }

    #[test]
    fn test_dot_vectors() {
        let r = dot(&t(&[0.0, 1.0], &[2]), &t(&[2.0, 10.0], &[2])).unwrap();
        assert_eq!(r.shape().ndim(), 0);
        assert_eq!(r.data_f64().unwrap(), &[10.0]);
    }

    #[test]
    fn test_dot_matrix_vector() {
        let a = t(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let r = dot(&a, &t(&[1.0, 1.0], &[2])).unwrap();
        assert_eq!(r.shape().dims(), &[2]);
        assert_eq!(r.data_f64().unwrap(), &[3.0, 7.0]);

        let r = dot(&t(&[1.0, 1.0], &[2]), &a).unwrap();
        assert_eq!(r.data_f64().unwrap(), &[4.0, 6.0]);
    }

    #[test]
    fn test_dot_matrices() {
        let a = t(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let b = t(&[5.0, 6.0, 7.0, 8.0], &[2, 2]);
        let r = dot(&a, &b).unwrap();
        assert_eq!(r.data_f64().unwrap(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_dot_mismatch() {
        assert!(matches!(
            dot(&t(&[1.0, 2.0, 3.0], &[3]), &t(&[1.0, 2.0], &[2])),
            Err(TensorError::MatmulMismatch { .. })
        ));
    }

    #[test]
    fn test_batched_matmul() {
        let stack = t(&[1.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 2.0], &[2, 2, 2]);
        let x = t(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let r = matmul(&stack, &x).unwrap();
        assert_eq!(r.shape().dims(), &[2, 2, 2]);
        assert_eq!(
            r.data_f64().unwrap(),
            &[1.0, 2.0, 3.0, 4.0, 2.0, 4.0, 6.0, 8.0]
        );

        let one = t(&[1.0, 0.0, 0.0, 1.0], &[1, 2, 2]);
        let r = matmul(&x, &one).unwrap();
        assert_eq!(r.shape().dims(), &[1, 2, 2]);
        assert_eq!(r.data_f64().unwrap(), x.data_f64().unwrap());
    }

    #[test]
    fn test_transpose() {
        let a = t(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let r = transpose(&a).unwrap();
        assert_eq!(r.shape().dims(), &[3, 2]);
        assert_eq!(r.data_f64().unwrap(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        let v = t(&[2.0, 10.0], &[2]);
        assert_eq!(transpose(&v).unwrap(), v);
    }

    #[test]
    fn test_sum_axis() {
        let a = t(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]);
        assert_eq!(sum_axis(&a, 1).unwrap().data_f64().unwrap(), &[3.0, 7.0, 11.0]);
        assert_eq!(sum_axis(&a, 0).unwrap().data_f64().unwrap(), &[9.0, 12.0]);
        assert!(sum_axis(&a, 2).is_err());
    }

    #[test]
    fn test_sqrt_scale() {
        let a = t(&[4.0, 25.0], &[2]);
        assert_eq!(sqrt(&a).unwrap().data_f64().unwrap(), &[2.0, 5.0]);
        assert_eq!(scale(&a, -0.5).unwrap().data_f64().unwrap(), &[-2.0, -12.5]);
    }

    #[test]
    fn test_random_uniform_bounds_and_determinism() {
        let shape = Shape::new(vec![50, 3]);
        let a = random_uniform(&shape, -1.0, 1.0, 7).unwrap();
        let b = random_uniform(&shape, -1.0, 1.0, 7).unwrap();
        assert_eq!(a, b);
        assert!(a.data_f64().unwrap().iter().all(|&x| (-1.0..1.0).contains(&x)));

        let mean = a.data_f64().unwrap().iter().sum::<f64>() / 150.0;
        assert_relative_eq!(mean, 0.0, epsilon = 0.25);
    }

    #[test]
    fn test_random_uniform_invalid_range() {
        assert!(random_uniform(&Shape::new(vec![1]), 1.0, 1.0, 0).is_err());
        assert!(random_uniform(&Shape::new(vec![1]), 0.0, f64::NAN, 0).is_err());
        assert!(check_uniform_range(2.0, -2.0).is_err());
        assert!(check_uniform_range(-1.0, 1.0).is_ok());
    }
}
