//! Hard-assignment decoding and output diagnostics
//!
//! The solver trades hard failures for silent numerical ones: a misconfigured
//! run produces NaN or degenerate matrices instead of an error. These helpers
//! are the caller-side checks the solver's failure semantics assume, plus the
//! row arg-max decoder that turns a soft permutation into a discrete one.

use ndarray::{Array1, Array2, Axis};

use crate::tensor::{BatchMatrix, NormAxis};

/// Decode each matrix to a discrete assignment by taking the arg-max of
/// every row. For an output close to a permutation matrix this recovers the
/// permutation; for a degenerate output the result may repeat indices.
pub fn hard_assignment(x: &BatchMatrix) -> Vec<Vec<usize>> {
    x.view()
        .axis_iter(Axis(0))
        .map(|m| {
            m.axis_iter(Axis(0))
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, &v)| {
                            if v > bv {
                                (i, v)
                            } else {
                                (bi, bv)
                            }
                        })
                        .0
                })
                .collect()
        })
        .collect()
}

/// Expand a permutation (given as the column index of each row's one) into
/// its one-hot matrix.
pub fn permutation_matrix(perm: &[usize]) -> Array2<f32> {
    let n = perm.len();
    let mut m = Array2::zeros((n, n));
    for (row, &col) in perm.iter().enumerate() {
        m[[row, col]] = 1.0;
    }
    m
}

/// True if every entry is non-negative and every row and column sum lies
/// within `tol` of one.
pub fn is_doubly_stochastic(x: &BatchMatrix, tol: f32) -> bool {
    if x.view().iter().any(|&v| v < 0.0) {
        return false;
    }
    x.sum_axis(NormAxis::Rows)
        .iter()
        .chain(x.sum_axis(NormAxis::Columns).iter())
        .all(|&s| (s - 1.0).abs() <= tol)
}

/// True if the output shows numerical degradation (any NaN entry).
///
/// Callers should run this after [`crate::layers::anneal`] when operating
/// near the sharp end of the temperature schedule.
pub fn has_degraded(x: &BatchMatrix) -> bool {
    x.has_nan()
}

/// Average row entropy of each matrix in the batch, in nats.
///
/// Rows are renormalized to sum to one before the entropy is taken, so the
/// epsilon floor's additive bias does not distort the measure. Lower values
/// mean sharper (more permutation-like) rows; a hard permutation scores 0.
pub fn mean_row_entropy(x: &BatchMatrix) -> Array1<f32> {
    x.view()
        .axis_iter(Axis(0))
        .map(|m| {
            let n = m.nrows() as f32;
            m.axis_iter(Axis(0))
                .map(|row| {
                    let total: f32 = row.sum();
                    -row.iter()
                        .map(|&v| {
                            let p = v / total;
                            if p > 0.0 {
                                p * p.ln()
                            } else {
                                0.0
                            }
                        })
                        .sum::<f32>()
                })
                .sum::<f32>()
                / n
        })
        .collect()
}
