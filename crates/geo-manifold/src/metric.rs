use std::sync::Arc;

use geo_tensor::{Array, Backend, Shape};

use crate::error::Result;
use crate::vectorize;

/// A bilinear form on the points of a manifold.
///
/// Implementors supply the form's matrix plus `exp`/`log`; inner products,
/// norms and distances are derived from those. All pairwise results follow
/// the broadcasting rules of [`vectorize::broadcast_pair`] and are shaped
/// `(n, 1)`.
pub trait RiemannianMetric: Send + Sync {
    /// Dimension of the associated manifold.
    fn dimension(&self) -> usize;

    /// The engine every operation runs on.
    fn backend(&self) -> &Arc<dyn Backend>;

    /// Matrix of the form as a batch, shape `(m, dim, dim)`.
    ///
    /// `m` is 1 for a constant metric.
    fn inner_product_matrix(&self) -> Result<Array>;

    /// Riemannian exponential: move `base_point` along `tangent_vec`.
    fn exp(&self, tangent_vec: &Array, base_point: &Array) -> Result<Array>;

    /// Riemannian logarithm: tangent vector at `base_point` pointing to `point`.
    fn log(&self, point: &Array, base_point: &Array) -> Result<Array>;

    /// `<a, b>` for each pair, shape `(n, 1)`.
    fn inner_product(&self, a: &Array, b: &Array) -> Result<Array> {
        let backend = self.backend().as_ref();
        let dim = self.dimension();
        let pair = vectorize::broadcast_pair(backend, a, b, dim)?;
        let matrix = vectorize::to_matrix(backend, &self.inner_product_matrix()?)?;

        let aux = if matrix.shape().dim(0) == 1 {
            let matrix = backend.reshape(&matrix, Shape::new(vec![dim, dim]))?;
            backend.dot(&pair.a, &matrix)?
        } else {
            // One matrix per point: (n, 1, dim) @ (n, dim, dim) -> (n, 1, dim).
            let rows = vectorize::n_points(&pair.a);
            let stacked = backend.reshape(&pair.a, Shape::new(vec![rows, 1, dim]))?;
            let product = backend.matmul(&stacked, &matrix)?;
            let batch = product.shape().dim(0);
            backend.reshape(&product, Shape::new(vec![batch, dim]))?
        };

        let weighted = backend.mul(&aux, &pair.b)?;
        let values = backend.sum_axis(&weighted, 1)?;
        vectorize::to_scalar(backend, &values)
    }

    /// `<v, v>` for each vector.
    fn squared_norm(&self, vector: &Array) -> Result<Array> {
        self.inner_product(vector, vector)
    }

    /// Length of each vector under the metric.
    fn norm(&self, vector: &Array) -> Result<Array> {
        Ok(self.backend().sqrt(&self.squared_norm(vector)?)?)
    }

    /// Squared geodesic distance for each pair.
    fn squared_dist(&self, a: &Array, b: &Array) -> Result<Array> {
        let log = self.log(b, a)?;
        self.squared_norm(&log)
    }

    /// Geodesic distance for each pair.
    fn dist(&self, a: &Array, b: &Array) -> Result<Array> {
        Ok(self.backend().sqrt(&self.squared_dist(a, b)?)?)
    }
}
