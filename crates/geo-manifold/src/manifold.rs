use std::sync::Arc;

use geo_tensor::{Array, Backend};

use crate::error::Result;
use crate::vectorize;

/// A space of points of fixed dimension.
///
/// Every operation accepts a single point `(dim,)` or a batch `(n, dim)` and
/// returns batched results. Returned arrays may be deferred, so pass them to
/// `Backend::eval` before reading values.
pub trait Manifold: Send + Sync {
    /// Dimension of the points.
    fn dimension(&self) -> usize;

    /// The engine every operation runs on.
    fn backend(&self) -> &Arc<dyn Backend>;

    /// Per-point membership test, a boolean column `(n, 1)`.
    fn belongs(&self, point: &Array) -> Result<Array>;

    /// `n_samples` random points, shape `(n_samples, dim)`.
    fn random_uniform(&self, n_samples: usize) -> Result<Array>;

    /// Canonical representative of each point, shape `(n, dim)`.
    fn regularize(&self, point: &Array) -> Result<Array> {
        vectorize::to_points(self.backend().as_ref(), point, self.dimension())
    }
}
