//! Discrete sortedness rewards
//!
//! Reward signals over decoded sequences, shape `[batch, seq_len]`, used as
//! policy-gradient feedback for the sorting task. All comparisons are
//! strict, so the maximum reward of 1.0 is reached only by a strictly
//! ascending sequence. Sequences shorter than two elements are trivially
//! sorted and score 1.0.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;

/// Length of the strictly ascending prefix, normalized by `seq_len - 1`.
///
/// Counts elements correctly sorted from the beginning and stops at the
/// first inversion. Very sparse: random sequences rarely score above zero.
pub fn prefix_sorted_reward(solutions: &Array2<f32>) -> Array1<f32> {
    per_sequence(solutions, |seq| {
        let m = seq.len();
        let mut correct = 0usize;
        for i in 1..m {
            if seq[i - 1] < seq[i] {
                correct += 1;
            } else {
                break;
            }
        }
        correct as f32 / (m - 1) as f32
    })
}

/// Number of ascending adjacent pairs anywhere in the sequence, normalized
/// by `seq_len - 1`.
///
/// Dense but gameable: interleaved sequences like `[0 2 4 6 8 1 3 5 7 9]`
/// score highly.
pub fn sorted_pairs_reward(solutions: &Array2<f32>) -> Array1<f32> {
    per_sequence(solutions, |seq| {
        let m = seq.len();
        let pairs = (1..m).filter(|&i| seq[i - 1] < seq[i]).count();
        pairs as f32 / (m - 1) as f32
    })
}

/// Length of the longest strictly ascending substring, normalized by
/// `seq_len`.
///
/// Exploration gets tricky near the optimum: fixing one misplaced element
/// can require moving it through the whole run.
pub fn longest_run_reward(solutions: &Array2<f32>) -> Array1<f32> {
    per_sequence(solutions, |seq| {
        let m = seq.len();
        let mut longest = 1usize;
        let mut current = 1usize;
        for i in 1..m {
            if seq[i - 1] < seq[i] {
                current += 1;
            } else {
                current = 1;
            }
            longest = longest.max(current);
        }
        longest as f32 / m as f32
    })
}

/// Kendall-Tau correlation of each sequence against the ascending target.
///
/// Tau-a over all pairs: `(concordant - discordant) / (m * (m - 1) / 2)`.
/// Permutations carry no ties, so this matches the tau-b the original
/// pipeline computed. Ranges over [-1, 1]; computed in parallel across the
/// batch.
pub fn kendall_tau_reward(solutions: &Array2<f32>) -> Array1<f32> {
    let batch = solutions.nrows();
    let taus: Vec<f32> = (0..batch)
        .into_par_iter()
        .map(|i| kendall_tau(solutions.row(i)))
        .collect();
    Array1::from(taus)
}

/// The neural-combinatorial-optimization training reward: negated
/// Kendall-Tau, or negated longest-run when `use_kendall_tau` is false.
///
/// Negated because the training loop minimizes; the range is `[-1, -1/m]`
/// for the longest-run variant and `[-1, 1]` for Kendall-Tau.
pub fn nco_reward(solutions: &Array2<f32>, use_kendall_tau: bool) -> Array1<f32> {
    let reward = if use_kendall_tau {
        kendall_tau_reward(solutions)
    } else {
        longest_run_reward(solutions)
    };
    -reward
}

fn kendall_tau(seq: ArrayView1<'_, f32>) -> f32 {
    let m = seq.len();
    if m < 2 {
        return 1.0;
    }
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..m {
        for j in (i + 1)..m {
            if seq[i] < seq[j] {
                concordant += 1;
            } else if seq[i] > seq[j] {
                discordant += 1;
            }
        }
    }
    let pairs = (m * (m - 1) / 2) as f32;
    (concordant - discordant) as f32 / pairs
}

fn per_sequence<F>(solutions: &Array2<f32>, score: F) -> Array1<f32>
where
    F: Fn(ArrayView1<'_, f32>) -> f32,
{
    solutions
        .axis_iter(Axis(0))
        .map(|seq| if seq.len() < 2 { 1.0 } else { score(seq) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn batch() -> Array2<f32> {
        array![
            [1.0, 2.0, 3.0, 4.0, 5.0], // sorted
            [5.0, 4.0, 3.0, 2.0, 1.0], // reversed
            [1.0, 2.0, 5.0, 3.0, 4.0], // partially sorted
        ]
    }

    #[test]
    fn test_prefix_sorted() {
        let r = prefix_sorted_reward(&batch());
        assert!((r[0] - 1.0).abs() < 1e-6);
        assert!((r[1] - 0.0).abs() < 1e-6);
        assert!((r[2] - 0.5).abs() < 1e-6); // [1 2 5] prefix, 2 of 4 pairs
    }

    #[test]
    fn test_sorted_pairs() {
        let r = sorted_pairs_reward(&batch());
        assert!((r[0] - 1.0).abs() < 1e-6);
        assert!((r[1] - 0.0).abs() < 1e-6);
        assert!((r[2] - 0.75).abs() < 1e-6); // all pairs ascend except 5>3
    }

    #[test]
    fn test_longest_run() {
        let r = longest_run_reward(&batch());
        assert!((r[0] - 1.0).abs() < 1e-6);
        assert!((r[1] - 0.2).abs() < 1e-6); // runs of length 1
        assert!((r[2] - 0.6).abs() < 1e-6); // [1 2 5]
    }

    #[test]
    fn test_kendall_tau() {
        let r = kendall_tau_reward(&batch());
        assert!((r[0] - 1.0).abs() < 1e-6);
        assert!((r[1] + 1.0).abs() < 1e-6);
        // [1 2 5 3 4]: 8 concordant, 2 discordant of 10 pairs
        assert!((r[2] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_nco_reward_is_negated() {
        let kt = kendall_tau_reward(&batch());
        let nco = nco_reward(&batch(), true);
        for (a, b) in kt.iter().zip(nco.iter()) {
            assert!((a + b).abs() < 1e-6);
        }
        let run = longest_run_reward(&batch());
        let nco = nco_reward(&batch(), false);
        for (a, b) in run.iter().zip(nco.iter()) {
            assert!((a + b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_short_sequences_trivially_sorted() {
        let single = array![[3.0_f32]];
        assert!((prefix_sorted_reward(&single)[0] - 1.0).abs() < 1e-6);
        assert!((longest_run_reward(&single)[0] - 1.0).abs() < 1e-6);
        assert!((kendall_tau_reward(&single)[0] - 1.0).abs() < 1e-6);
    }
}
