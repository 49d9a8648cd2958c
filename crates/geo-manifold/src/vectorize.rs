//! Shape normalization shared by every manifold and metric.
//!
//! Points arrive either as a single point `(dim,)` or as a batch
//! `(n, dim)`. Everything downstream sees the batch form only, and pairwise
//! results always come back as a column `(n, 1)`.

use geo_tensor::{Array, Backend, Shape};

use crate::error::{GeometryError, Result};

/// Promote `x` to rank `to_ndim` by prepending a length-1 axis.
///
/// Arrays already at `to_ndim` pass through; any other rank is rejected, as
/// is an array built by a different backend.
pub fn to_ndarray(backend: &dyn Backend, x: &Array, to_ndim: usize) -> Result<Array> {
    backend.ensure_owned(x)?;
    let ndim = x.ndim();
    if ndim == to_ndim {
        return Ok(x.clone());
    }
    if ndim + 1 == to_ndim {
        let mut dims = Vec::with_capacity(to_ndim);
        dims.push(1);
        dims.extend_from_slice(x.shape().dims());
        return Ok(backend.reshape(x, Shape::new(dims))?);
    }
    Err(GeometryError::InvalidRank {
        expected: format!("{} or {}", to_ndim.saturating_sub(1), to_ndim),
        got: ndim,
    })
}

/// Fails with `DimensionMismatch` unless the trailing axis equals `dimension`.
pub fn check_dimension(points: &Array, dimension: usize) -> Result<()> {
    let got = points.shape().last_dim().unwrap_or(0);
    if got != dimension {
        return Err(GeometryError::DimensionMismatch {
            expected: dimension,
            got,
        });
    }
    Ok(())
}

/// Canonical `(n, dimension)` batch form of a point-like input.
pub fn to_points(backend: &dyn Backend, point: &Array, dimension: usize) -> Result<Array> {
    let points = to_ndarray(backend, point, 2)?;
    check_dimension(&points, dimension)?;
    Ok(points)
}

/// Number of points in a normalized batch.
pub fn n_points(points: &Array) -> usize {
    points.shape().dim(0)
}

/// Two batches ready for a pairwise operation.
#[derive(Debug, Clone)]
pub struct PointPair {
    pub a: Array,
    pub b: Array,
    /// Number of pairs the result will have.
    pub n: usize,
}

/// Normalize both operands of a pairwise operation and work out how they pair.
///
/// A single point pairs with every point of the other side; two batches pair
/// elementwise and must have the same length.
pub fn broadcast_pair(
    backend: &dyn Backend,
    a: &Array,
    b: &Array,
    dimension: usize,
) -> Result<PointPair> {
    let a = to_points(backend, a, dimension)?;
    let b = to_points(backend, b, dimension)?;
    let (na, nb) = (n_points(&a), n_points(&b));

    let n = match (na, nb) {
        _ if na == nb => na,
        (1, _) => nb,
        (_, 1) => na,
        _ => return Err(GeometryError::ShapeMismatch { a: na, b: nb }),
    };
    Ok(PointPair { a, b, n })
}

/// Shape per-pair values as a column `(n, 1)`.
///
/// Accepts a rank-0 scalar, a vector `(n,)` or an existing column.
pub fn to_scalar(backend: &dyn Backend, values: &Array) -> Result<Array> {
    match values.shape().dims() {
        [] => Ok(backend.reshape(values, Shape::new(vec![1, 1]))?),
        &[n] => Ok(backend.reshape(values, Shape::new(vec![n, 1]))?),
        &[_, 1] => Ok(values.clone()),
        _ => Err(GeometryError::InvalidRank {
            expected: "0, 1 or (n, 1)".to_string(),
            got: values.ndim(),
        }),
    }
}

/// Shape a matrix as a batch of matrices `(1, d, d)`.
pub fn to_matrix(backend: &dyn Backend, matrix: &Array) -> Result<Array> {
    to_ndarray(backend, matrix, 3)
}
