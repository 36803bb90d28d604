//! Synthetic permutation datasets
//!
//! Generation, on-disk caching, and loading of the sorting task's training
//! data, plus the graph featurization used by GCN-style consumers.

mod sorting;

pub use sorting::{create_dataset, DatasetConfig, PermutationGraph, SortingDataset};
