//! Deferred-evaluation engine.
//!
//! Build operations only record a node in a computation graph, with its
//! result shape inferred up front. Nothing is computed until
//! `Backend::eval` walks the graph; each node memoizes its value, so shared
//! subgraphs and repeated evaluation run every kernel at most once.

use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::array::{Array, Repr};
use crate::backend::{Backend, SeedSource};
use crate::config::BackendKind;
use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::kernels::{self, BinaryOp};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Operation recorded by a graph node. Operands live in `Node::inputs`.
#[derive(Debug)]
enum Op {
    Constant(Tensor),
    Binary(BinaryOp),
    Scale(f64),
    Sqrt,
    Dot,
    Matmul,
    Transpose,
    Reshape,
    SumAxis(usize),
    RandomUniform { low: f64, high: f64, seed: u64 },
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Constant(_) => "constant",
            Op::Binary(op) => op.name(),
            Op::Scale(_) => "scale",
            Op::Sqrt => "sqrt",
            Op::Dot => "dot",
            Op::Matmul => "matmul",
            Op::Transpose => "transpose",
            Op::Reshape => "reshape",
            Op::SumAxis(_) => "sum_axis",
            Op::RandomUniform { .. } => "random_uniform",
        }
    }
}

/// A node of the deferred computation graph.
#[derive(Debug)]
pub struct Node {
    op: Op,
    inputs: Vec<Arc<Node>>,
    shape: Shape,
    dtype: DType,
    value: OnceLock<Tensor>,
}

impl Node {
    fn new(op: Op, inputs: Vec<Arc<Node>>, shape: Shape, dtype: DType) -> Arc<Node> {
        Arc::new(Node {
            op,
            inputs,
            shape,
            dtype,
            value: OnceLock::new(),
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn is_materialized(&self) -> bool {
        self.value.get().is_some()
    }

    /// Value of an input that the evaluation order has already computed.
    fn input(&self, i: usize) -> Result<&Tensor> {
        self.inputs
            .get(i)
            .and_then(|node| node.value.get())
            .ok_or_else(|| {
                TensorError::Other(format!("{} node input {} not evaluated", self.op.name(), i))
            })
    }

    /// Run this node's kernel. Every input must be materialized.
    fn compute(&self) -> Result<Tensor> {
        match &self.op {
            Op::Constant(t) => Ok(t.clone()),
            Op::Binary(op) => kernels::binary(*op, self.input(0)?, self.input(1)?),
            Op::Scale(s) => kernels::scale(self.input(0)?, *s),
            Op::Sqrt => kernels::sqrt(self.input(0)?),
            Op::Dot => kernels::dot(self.input(0)?, self.input(1)?),
            Op::Matmul => kernels::matmul(self.input(0)?, self.input(1)?),
            Op::Transpose => kernels::transpose(self.input(0)?),
            Op::Reshape => self.input(0)?.reshape(self.shape.clone()),
            Op::SumAxis(axis) => kernels::sum_axis(self.input(0)?, *axis),
            Op::RandomUniform { low, high, seed } => {
                kernels::random_uniform(&self.shape, *low, *high, *seed)
            }
        }
    }

    /// Compute (or fetch) this node's value, counting kernels that actually ran.
    ///
    /// Walks the graph in post-order with an explicit stack, so graph depth
    /// is bounded by memory rather than by the thread's stack.
    fn materialize(&self, executed: &mut usize) -> Result<Tensor> {
        let mut stack: Vec<(&Node, bool)> = vec![(self, false)];
        while let Some((node, inputs_ready)) = stack.pop() {
            if node.is_materialized() {
                continue;
            }
            if inputs_ready {
                let value = node.compute()?;
                *executed += 1;
                trace!(op = node.op.name(), shape = %node.shape, "executed graph node");
                // Another thread may have won the race; both computed the same value.
                let _ = node.value.set(value);
            } else {
                stack.push((node, true));
                for input in node.inputs.iter().rev() {
                    if !input.is_materialized() {
                        stack.push((input.as_ref(), false));
                    }
                }
            }
        }
        self.value
            .get()
            .cloned()
            .ok_or_else(|| TensorError::Other(format!("{} node not evaluated", self.op.name())))
    }
}

impl Drop for Node {
    // Unlink inputs iteratively so dropping a long chain cannot recurse.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.inputs);
        while let Some(node) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(node) {
                pending.append(&mut node.inputs);
            }
        }
    }
}

/// Deferred (graph) engine.
#[derive(Debug)]
pub struct GraphBackend {
    seeds: SeedSource,
}

impl GraphBackend {
    pub fn new() -> Self {
        GraphBackend {
            seeds: SeedSource::from_entropy(),
        }
    }

    /// Graph node behind an array, lifting concrete arrays into constants.
    fn node(&self, a: &Array) -> Result<Arc<Node>> {
        a.check_owner(self.kind())?;
        match a.repr() {
            Repr::Deferred(node) => Ok(Arc::clone(node)),
            Repr::Concrete(t) => Ok(Node::new(
                Op::Constant(t.as_ref().clone()),
                Vec::new(),
                t.shape().clone(),
                t.dtype(),
            )),
        }
    }

    fn float_node(&self, a: &Array) -> Result<Arc<Node>> {
        let node = self.node(a)?;
        if node.dtype() != DType::F64 {
            return Err(TensorError::DTypeMismatch {
                expected: DType::F64.to_string(),
                got: node.dtype().to_string(),
            });
        }
        Ok(node)
    }

    fn wrap(&self, op: Op, inputs: Vec<Arc<Node>>, shape: Shape) -> Array {
        Array::deferred(self.kind(), Node::new(op, inputs, shape, DType::F64))
    }
}

impl Default for GraphBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for GraphBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Graph
    }

    fn constant(&self, tensor: Tensor) -> Array {
        let shape = tensor.shape().clone();
        let dtype = tensor.dtype();
        let node = Node::new(Op::Constant(tensor), Vec::new(), shape, dtype);
        Array::deferred(self.kind(), node)
    }

    fn binary(&self, op: BinaryOp, a: &Array, b: &Array) -> Result<Array> {
        let (a, b) = (self.float_node(a)?, self.float_node(b)?);
        let shape = kernels::binary_shape(a.shape(), b.shape())?;
        Ok(self.wrap(Op::Binary(op), vec![a, b], shape))
    }

    fn scale(&self, a: &Array, s: f64) -> Result<Array> {
        let a = self.float_node(a)?;
        let shape = a.shape().clone();
        Ok(self.wrap(Op::Scale(s), vec![a], shape))
    }

    fn sqrt(&self, a: &Array) -> Result<Array> {
        let a = self.float_node(a)?;
        let shape = a.shape().clone();
        Ok(self.wrap(Op::Sqrt, vec![a], shape))
    }

    fn dot(&self, a: &Array, b: &Array) -> Result<Array> {
        let (a, b) = (self.float_node(a)?, self.float_node(b)?);
        let shape = kernels::dot_shape(a.shape(), b.shape())?;
        Ok(self.wrap(Op::Dot, vec![a, b], shape))
    }

    fn matmul(&self, a: &Array, b: &Array) -> Result<Array> {
        let (a, b) = (self.float_node(a)?, self.float_node(b)?);
        let shape = kernels::matmul_shape(a.shape(), b.shape())?;
        Ok(self.wrap(Op::Matmul, vec![a, b], shape))
    }

    fn transpose(&self, a: &Array) -> Result<Array> {
        let a = self.float_node(a)?;
        let shape = a.shape().reversed();
        Ok(self.wrap(Op::Transpose, vec![a], shape))
    }

    fn reshape(&self, a: &Array, shape: Shape) -> Result<Array> {
        let a = self.node(a)?;
        if a.shape().numel() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: a.shape().dims().to_vec(),
                got: shape.dims().to_vec(),
            });
        }
        let dtype = a.dtype();
        Ok(Array::deferred(
            self.kind(),
            Node::new(Op::Reshape, vec![a], shape, dtype),
        ))
    }

    fn sum_axis(&self, a: &Array, axis: usize) -> Result<Array> {
        let a = self.float_node(a)?;
        let shape = kernels::sum_axis_shape(a.shape(), axis)?;
        Ok(self.wrap(Op::SumAxis(axis), vec![a], shape))
    }

    fn random_uniform(&self, shape: Shape, low: f64, high: f64) -> Result<Array> {
        kernels::check_uniform_range(low, high)?;
        let seed = self.seeds.next_seed();
        Ok(self.wrap(Op::RandomUniform { low, high, seed }, Vec::new(), shape))
    }

    fn seed(&self, seed: u64) {
        self.seeds.reseed(seed);
    }

    fn eval(&self, a: &Array) -> Result<Tensor> {
        a.check_owner(self.kind())?;
        match a.repr() {
            Repr::Concrete(t) => Ok(t.as_ref().clone()),
            Repr::Deferred(node) => {
                let mut executed = 0;
                let value = node.materialize(&mut executed)?;
                debug!(
                    backend = self.name(),
                    shape = %value.shape(),
                    executed,
                    "materialized deferred array"
                );
                Ok(value)
            }
        }
    }
}
