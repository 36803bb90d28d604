//! # Perm-ML: soft permutations for neural sequence sorting
//!
//! This library supports research on neural combinatorial optimization for
//! sorting: it generates synthetic permutation datasets, computes discrete
//! reward signals measuring sortedness, and implements a soft-permutation
//! layer (Sinkhorn balancing with deterministic annealing) that lets a
//! network learn to output permutation matrices.
//!
//! ## Features
//!
//! - **Soft permutation layer**: log-stabilized Sinkhorn iteration and a
//!   temperature-annealing outer loop converging toward hard permutations
//! - **Rewards**: longest-sorted-run, sorted-pair counts, Kendall-Tau
//! - **Datasets**: cached plain-text permutation datasets and graph
//!   featurization for GCN-style models
//! - **Diagnostics**: doubly-stochastic checks, NaN detection, row entropy

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Batched square-matrix abstraction used by the solver
pub mod tensor;

/// Soft-permutation layers: log normalization, Sinkhorn, annealing, decoding
pub mod layers;

/// Discrete sortedness rewards
pub mod reward;

/// Dataset generation, caching and loading
pub mod data;

/// Utility functions and helpers
pub mod utils;

// Re-export commonly used types
pub use layers::{AnnealingConfig, SinkhornConfig, SkipConnection};
pub use tensor::{BatchMatrix, NormAxis};

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum PermMLError {
    /// Invalid hyperparameter configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tensor shape mismatch
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// Malformed dataset content
    #[error("Data error: {0}")]
    DataError(String),

    /// IO or serialization error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for the library
pub type Result<T> = std::result::Result<T, PermMLError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        data::{DatasetConfig, SortingDataset},
        layers::{
            anneal, hard_assignment, sinkhorn, AnnealingConfig, SinkhornConfig, SkipConnection,
        },
        tensor::{BatchMatrix, NormAxis},
        PermMLError, Result,
    };
}
