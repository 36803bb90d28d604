//! Numerically stable log-space normalization
//!
//! The building block of Sinkhorn balancing. Inputs are interpreted as
//! log-scores; normalizing along an axis means shifting each lane so that
//! exponentiating it sums to one. Working directly on `exp(x)` divides by a
//! sum that can overflow, vanish, or cancel catastrophically when entries
//! span many orders of magnitude; subtracting the per-lane log-sum-exp
//! (itself stabilized by max subtraction) gives the same result for any
//! finite input.

use crate::tensor::{BatchMatrix, NormAxis};

/// Shift each row (or column) of every matrix in the batch by its
/// log-sum-exp, so that `exp` of the result sums to one along that axis.
///
/// Defined for any finite input; NaN or infinite entries propagate NaN
/// through the whole lane. That instability mode is inherent to the
/// algorithm and deliberately not masked here. Callers must keep inputs
/// finite.
pub fn normalize_axis(x: BatchMatrix, axis: NormAxis) -> BatchMatrix {
    let lse = x.log_sum_exp(axis);
    x.sub_broadcast(&lse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn exp_sums(x: &BatchMatrix, axis: NormAxis) -> Vec<f32> {
        x.clone()
            .exp()
            .sum_axis(axis)
            .iter()
            .copied()
            .collect()
    }

    #[test]
    fn test_row_normalization_sums_to_one() {
        let x = BatchMatrix::from_matrices(&[
            array![[1.0_f32, 2.0, 3.0], [0.0, 0.0, 0.0], [-5.0, 10.0, 2.5]],
        ])
        .unwrap();
        let normed = normalize_axis(x, NormAxis::Rows);
        for sum in exp_sums(&normed, NormAxis::Rows) {
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_column_normalization_sums_to_one() {
        let x = BatchMatrix::from_matrices(&[array![[3.0_f32, -1.0], [0.5, 8.0]]]).unwrap();
        let normed = normalize_axis(x, NormAxis::Columns);
        for sum in exp_sums(&normed, NormAxis::Columns) {
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_stable_under_large_magnitudes() {
        // exp(800) overflows f32; the max-subtraction keeps this finite.
        let x = BatchMatrix::from_matrices(&[array![[800.0_f32, 799.0], [-800.0, -801.0]]])
            .unwrap();
        let normed = normalize_axis(x, NormAxis::Rows);
        assert!(!normed.has_nan());
        for sum in exp_sums(&normed, NormAxis::Rows) {
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_nan_propagates() {
        let x = BatchMatrix::from_matrices(&[array![[f32::NAN, 0.0], [0.0, 0.0]]]).unwrap();
        let normed = normalize_axis(x, NormAxis::Rows);
        assert!(normed.has_nan());
    }

    proptest! {
        #[test]
        fn prop_row_sums_one_for_finite_inputs(
            values in prop::collection::vec(-50.0f32..50.0, 9)
        ) {
            let m = ndarray::Array2::from_shape_vec((3, 3), values).unwrap();
            let x = BatchMatrix::from_matrices(&[m]).unwrap();
            let normed = normalize_axis(x, NormAxis::Rows);
            for sum in exp_sums(&normed, NormAxis::Rows) {
                prop_assert!((sum - 1.0).abs() < 1e-4);
            }
        }
    }
}
