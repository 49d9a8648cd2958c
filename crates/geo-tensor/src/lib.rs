//! `geo-tensor` - Tensor values and pluggable numeric backends for geo-manifold.
//!
//! This crate provides:
//! - A concrete `Tensor` type (f64 or bool, row-major)
//! - A `Backend` trait split into build and materialize phases
//! - An `EagerBackend` that computes immediately
//! - A `GraphBackend` that records a graph and computes on `eval` (feature `graph`)
//! - Environment-driven backend selection and a once-initialized process registry

pub mod array;
pub mod backend;
pub mod config;
pub mod dtype;
pub mod eager;
pub mod error;
#[cfg(feature = "graph")]
pub mod graph;
pub mod kernels;
pub mod registry;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use array::Array;
pub use backend::Backend;
pub use config::{BackendConfig, BackendKind};
pub use dtype::DType;
pub use eager::EagerBackend;
pub use error::{Result, TensorError};
#[cfg(feature = "graph")]
pub use graph::GraphBackend;
pub use kernels::BinaryOp;
pub use shape::Shape;
pub use storage::Storage;
pub use tensor::Tensor;
