use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of axis lengths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of axis lengths.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Create a shape from a slice of axis lengths.
    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// The rank-0 shape of a single scalar.
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    /// Number of axes (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all axis lengths).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the length of axis `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Length of the trailing axis, or `None` for a scalar.
    pub fn last_dim(&self) -> Option<usize> {
        self.dims.last().copied()
    }

    /// Returns a reference to the underlying axis lengths.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Row-major contiguous strides.
    ///
    /// For a shape [d0, d1, d2], the strides are [d1*d2, d2, 1].
    pub fn strides(&self) -> Vec<usize> {
        if self.dims.is_empty() {
            return vec![];
        }
        let mut strides = vec![0usize; self.dims.len()];
        strides[self.dims.len() - 1] = 1;
        for i in (0..self.dims.len() - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Shape with axis `axis` removed.
    pub fn remove_axis(&self, axis: usize) -> Result<Shape> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis,
                ndim: self.ndim(),
            });
        }
        let mut dims = self.dims.clone();
        dims.remove(axis);
        Ok(Shape::new(dims))
    }

    /// Shape with the axis order reversed.
    pub fn reversed(&self) -> Shape {
        let mut dims = self.dims.clone();
        dims.reverse();
        Shape::new(dims)
    }

    /// Compute the broadcast shape of `a` and `b` using numpy-style broadcasting rules.
    ///
    /// The shorter shape is padded with ones on the left, then each axis must
    /// either agree or be 1 on one side.
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape> {
        let max_ndim = a.ndim().max(b.ndim());
        let mut result = Vec::with_capacity(max_ndim);

        for i in 0..max_ndim {
            let da = if i < a.ndim() {
                a.dims[a.ndim() - 1 - i]
            } else {
                1
            };
            let db = if i < b.ndim() {
                b.dims[b.ndim() - 1 - i]
            } else {
                1
            };

            if da == db || db == 1 {
                result.push(da);
            } else if da == 1 {
                result.push(db);
            } else {
                return Err(TensorError::BroadcastError {
                    a: a.dims.clone(),
                    b: b.dims.clone(),
                });
            }
        }

        result.reverse();
        Ok(Shape::new(result))
    }

    /// For every flat index of `out`, the flat index of `self` it reads from
    /// when `self` is broadcast to `out`.
    ///
    /// `out` must be a valid broadcast target of `self`.
    pub fn broadcast_offsets(&self, out: &Shape) -> Vec<usize> {
        let pad = out.ndim() - self.ndim();
        let src_strides = self.strides();
        let out_strides = out.strides();

        (0..out.numel())
            .map(|flat| {
                let mut offset = 0;
                for (axis, &len) in self.dims.iter().enumerate() {
                    if len == 1 {
                        continue;
                    }
                    let out_axis = axis + pad;
                    let coord = (flat / out_strides[out_axis]) % out.dims[out_axis];
                    offset += coord * src_strides[axis];
                }
                offset
            })
            .collect()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        if self.dims.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}
