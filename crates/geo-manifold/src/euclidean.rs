use std::sync::Arc;

use geo_tensor::{registry, Array, Backend, Shape};
use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::manifold::Manifold;
use crate::metric::RiemannianMetric;
use crate::vectorize;

/// Default half-width of the sampling box used by `random_uniform`.
pub const DEFAULT_BOUND: f64 = 1.0;

/// Euclidean space R^n with the standard metric.
#[derive(Debug, Clone)]
pub struct EuclideanSpace {
    dimension: usize,
    metric: EuclideanMetric,
}

impl EuclideanSpace {
    /// Create R^`dimension` on the process-wide backend.
    ///
    /// The registry is initialized from the environment if nothing has
    /// initialized it yet.
    pub fn new(dimension: usize) -> Result<Self> {
        Self::with_backend(dimension, registry::global()?)
    }

    /// Create R^`dimension` on an explicitly chosen backend.
    pub fn with_backend(dimension: usize, backend: Arc<dyn Backend>) -> Result<Self> {
        if dimension == 0 {
            return Err(GeometryError::InvalidDimension(dimension));
        }
        debug!(dimension, backend = backend.name(), "created euclidean space");
        Ok(EuclideanSpace {
            dimension,
            metric: EuclideanMetric { dimension, backend },
        })
    }

    /// The standard metric of this space.
    pub fn metric(&self) -> &EuclideanMetric {
        &self.metric
    }

    /// Random points with coordinates uniform on `[-bound, bound)`.
    pub fn random_uniform_with_bound(&self, n_samples: usize, bound: f64) -> Result<Array> {
        if n_samples == 0 {
            return Err(GeometryError::InvalidSampleCount(n_samples));
        }
        if !(bound.is_finite() && bound > 0.0) {
            return Err(GeometryError::InvalidBound(bound));
        }
        let shape = Shape::new(vec![n_samples, self.dimension]);
        Ok(self.backend().random_uniform(shape, -bound, bound)?)
    }
}

impl Manifold for EuclideanSpace {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend(&self) -> &Arc<dyn Backend> {
        &self.metric.backend
    }

    /// True for every point whose trailing axis has length `dimension`.
    fn belongs(&self, point: &Array) -> Result<Array> {
        let backend = self.backend();
        let points = vectorize::to_ndarray(backend.as_ref(), point, 2)?;
        let n = vectorize::n_points(&points);
        let inside = points.shape().last_dim() == Some(self.dimension);
        Ok(backend.from_bools(vec![inside; n], &[n, 1])?)
    }

    fn random_uniform(&self, n_samples: usize) -> Result<Array> {
        self.random_uniform_with_bound(n_samples, DEFAULT_BOUND)
    }
}

/// The dot product on R^n.
#[derive(Debug, Clone)]
pub struct EuclideanMetric {
    dimension: usize,
    backend: Arc<dyn Backend>,
}

impl EuclideanMetric {
    /// Arithmetic mean of a batch of points, shape `(1, dim)`.
    ///
    /// An empty batch has no mean and is rejected with `InvalidSampleCount`.
    pub fn mean(&self, points: &Array) -> Result<Array> {
        let backend = self.backend.as_ref();
        let points = vectorize::to_points(backend, points, self.dimension)?;
        let n = vectorize::n_points(&points);
        if n == 0 {
            return Err(GeometryError::InvalidSampleCount(n));
        }
        let total = backend.sum_axis(&points, 0)?;
        let mean = backend.scale(&total, 1.0 / n as f64)?;
        Ok(backend.reshape(&mean, Shape::new(vec![1, self.dimension]))?)
    }
}

impl RiemannianMetric for EuclideanMetric {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// The identity, shape `(1, dim, dim)`.
    fn inner_product_matrix(&self) -> Result<Array> {
        let eye = self.backend.eye(self.dimension);
        vectorize::to_matrix(self.backend.as_ref(), &eye)
    }

    /// `base_point + tangent_vec`.
    fn exp(&self, tangent_vec: &Array, base_point: &Array) -> Result<Array> {
        let pair = vectorize::broadcast_pair(
            self.backend.as_ref(),
            tangent_vec,
            base_point,
            self.dimension,
        )?;
        Ok(self.backend.add(&pair.b, &pair.a)?)
    }

    /// `point - base_point`.
    fn log(&self, point: &Array, base_point: &Array) -> Result<Array> {
        let pair =
            vectorize::broadcast_pair(self.backend.as_ref(), point, base_point, self.dimension)?;
        Ok(self.backend.sub(&pair.a, &pair.b)?)
    }
}
