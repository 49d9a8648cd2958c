//! `geo-manifold` - Manifolds and Riemannian metrics over pluggable backends.
//!
//! Operations accept single points or batches and behave the same on the
//! eager and the graph engine of `geo-tensor`. Results from the graph engine
//! are deferred; call `Backend::eval` to read them.

pub mod error;
pub mod euclidean;
pub mod manifold;
pub mod metric;
pub mod vectorize;

pub use error::{GeometryError, Result};
pub use euclidean::{EuclideanMetric, EuclideanSpace};
pub use manifold::Manifold;
pub use metric::RiemannianMetric;

pub use geo_tensor::{Array, Backend, BackendKind, Tensor};
