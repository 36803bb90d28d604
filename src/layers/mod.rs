//! Soft-permutation layers
//!
//! Log-stabilized normalization, Sinkhorn balancing with deterministic
//! annealing, and hard-assignment decoding with output diagnostics.

mod decode;
mod log_norm;
mod sinkhorn;

pub use decode::{
    hard_assignment, has_degraded, is_doubly_stochastic, mean_row_entropy, permutation_matrix,
};
pub use log_norm::normalize_axis;
pub use sinkhorn::{anneal, sinkhorn, AnnealingConfig, SinkhornConfig, SkipConnection};
