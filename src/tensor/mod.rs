//! Batched square-matrix tensor abstraction
//!
//! The solver operates on batches of square score matrices of shape
//! `[batch, N, N]`. This module wraps `ndarray::Array3<f32>` behind the small
//! set of operations the algorithm needs (element-wise maps, lane reductions
//! along rows or columns, exponential/logarithm) so the iteration logic stays
//! independent of tensor-library details.

use ndarray::{Array2, Array3, ArrayView3, Axis};

use crate::{PermMLError, Result};

/// Axis along which a normalization runs.
///
/// `Rows` normalizes each row vector (reduces over the column index),
/// `Columns` normalizes each column vector (reduces over the row index).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormAxis {
    /// Normalize every row to sum to one
    Rows,
    /// Normalize every column to sum to one
    Columns,
}

impl NormAxis {
    /// The ndarray axis that a lane of this kind runs along.
    pub(crate) fn lane_axis(self) -> Axis {
        match self {
            NormAxis::Rows => Axis(2),
            NormAxis::Columns => Axis(1),
        }
    }
}

/// A batch of real-valued square matrices, shape `[batch, N, N]`.
///
/// Ownership is local to one forward computation: every operation consumes or
/// borrows the value and produces a fresh one, so there is no shared mutable
/// state across invocations.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchMatrix {
    data: Array3<f32>,
}

impl BatchMatrix {
    /// Wrap an existing `[batch, N, N]` array, rejecting non-square batches.
    pub fn new(data: Array3<f32>) -> Result<Self> {
        let (_, rows, cols) = data.dim();
        if rows != cols {
            return Err(PermMLError::ShapeError(format!(
                "expected square matrices, got {}x{}",
                rows, cols
            )));
        }
        Ok(BatchMatrix { data })
    }

    /// Stack a slice of equally-sized square matrices into a batch.
    pub fn from_matrices(matrices: &[Array2<f32>]) -> Result<Self> {
        let first = matrices
            .first()
            .ok_or_else(|| PermMLError::ShapeError("empty batch".to_string()))?;
        let (rows, cols) = first.dim();
        if rows != cols {
            return Err(PermMLError::ShapeError(format!(
                "expected square matrices, got {}x{}",
                rows, cols
            )));
        }
        let mut data = Array3::zeros((matrices.len(), rows, cols));
        for (i, m) in matrices.iter().enumerate() {
            if m.dim() != (rows, cols) {
                return Err(PermMLError::ShapeError(format!(
                    "matrix {} has shape {:?}, expected {:?}",
                    i,
                    m.dim(),
                    (rows, cols)
                )));
            }
            data.index_axis_mut(Axis(0), i).assign(m);
        }
        Ok(BatchMatrix { data })
    }

    /// Number of matrices in the batch.
    pub fn batch(&self) -> usize {
        self.data.dim().0
    }

    /// Side length N of each square matrix.
    pub fn n(&self) -> usize {
        self.data.dim().1
    }

    /// Borrow the underlying `[batch, N, N]` array.
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Unwrap into the underlying array.
    pub fn into_inner(self) -> Array3<f32> {
        self.data
    }

    /// One matrix of the batch as an owned 2-D array.
    pub fn matrix(&self, idx: usize) -> Array2<f32> {
        self.data.index_axis(Axis(0), idx).to_owned()
    }

    /// Element-wise scale by `1 / tau`.
    pub fn div_scalar(mut self, tau: f32) -> Self {
        self.data.mapv_inplace(|v| v / tau);
        self
    }

    /// Element-wise exponential.
    pub fn exp(mut self) -> Self {
        self.data.mapv_inplace(f32::exp);
        self
    }

    /// Element-wise addition of a scalar.
    pub fn add_scalar(mut self, eps: f32) -> Self {
        self.data.mapv_inplace(|v| v + eps);
        self
    }

    /// Element-wise combination with another batch of the same shape.
    ///
    /// Used by the residual skip-connection: `self + weight * other`.
    pub fn add_scaled(mut self, other: &BatchMatrix, weight: f32) -> Self {
        self.data.zip_mut_with(&other.data, |a, &b| *a += weight * b);
        self
    }

    /// Per-lane `log(sum(exp(v)))` with the max-subtraction trick, broadcast
    /// back over the reduced axis so it can be subtracted from `self`.
    ///
    /// NaN or infinite inputs propagate NaN; keeping inputs finite is the
    /// caller's responsibility.
    pub fn log_sum_exp(&self, axis: NormAxis) -> Array3<f32> {
        let ax = axis.lane_axis();
        let lse: Array2<f32> = self.data.map_axis(ax, |lane| {
            let max = lane.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
            max + lane.fold(0.0, |acc, &v| acc + (v - max).exp()).ln()
        });
        lse.insert_axis(ax)
    }

    /// Subtract a broadcastable `[batch, N, 1]` or `[batch, 1, N]` array.
    pub fn sub_broadcast(mut self, rhs: &Array3<f32>) -> Self {
        self.data = &self.data - rhs;
        self
    }

    /// Sum along the given axis, one value per lane.
    pub fn sum_axis(&self, axis: NormAxis) -> Array2<f32> {
        self.data.sum_axis(axis.lane_axis())
    }

    /// True if any entry is NaN.
    pub fn has_nan(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }
}
