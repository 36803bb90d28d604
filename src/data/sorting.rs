//! Sorting-task dataset generation and loading
//!
//! Datasets are plain text: one permutation of `low..=high` per line,
//! whitespace-separated integers, newline-terminated. Files are cached on
//! disk and keyed by their generation parameters, so repeated runs with the
//! same configuration reuse the existing files.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::utils::progress::ProgressBar;
use crate::{PermMLError, Result};

/// Configuration for dataset generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Number of training samples
    pub train_size: usize,
    /// Number of test samples
    pub test_size: usize,
    /// Directory the dataset files are written to
    pub data_dir: PathBuf,
    /// Training epoch the file is generated for (part of the file name)
    pub epoch: usize,
    /// Smallest value in each permutation
    pub low: i64,
    /// Largest value in each permutation (inclusive)
    pub high: i64,
    /// Skip generating the test split
    pub train_only: bool,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
    /// Verbose logging
    pub verbose: bool,
}

impl DatasetConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.high < self.low {
            return Err(PermMLError::InvalidConfig(format!(
                "high ({}) must be at least low ({})",
                self.high, self.low
            )));
        }
        if self.train_size == 0 {
            return Err(PermMLError::InvalidConfig(
                "train_size must be positive".to_string(),
            ));
        }
        if !self.train_only && self.test_size == 0 {
            return Err(PermMLError::InvalidConfig(
                "test_size must be positive unless train_only is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of elements in each permutation.
    pub fn sequence_len(&self) -> usize {
        (self.high - self.low + 1) as usize
    }

    fn train_path(&self) -> PathBuf {
        self.data_dir.join(format!(
            "epoch-{}-sorting-size-{}-low-{}-high-{}-train.txt",
            self.epoch, self.train_size, self.low, self.high
        ))
    }

    fn test_path(&self) -> PathBuf {
        self.data_dir.join(format!(
            "sorting-size-{}-low-{}-high-{}-test.txt",
            self.test_size, self.low, self.high
        ))
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            train_size: 10_000,
            test_size: 1_000,
            data_dir: PathBuf::from("data/sorting"),
            epoch: 0,
            low: 1,
            high: 10,
            train_only: false,
            seed: Some(42),
            verbose: true,
        }
    }
}

/// Generate the sorting dataset files, returning the train path and, unless
/// `train_only` is set, the test path.
///
/// Files already present under `data_dir` for the same parameters are reused
/// without regeneration.
pub fn create_dataset(cfg: &DatasetConfig) -> Result<(PathBuf, Option<PathBuf>)> {
    cfg.validate()?;

    let train_path = cfg.train_path();
    let test_path = cfg.test_path();
    fs::create_dir_all(&cfg.data_dir)?;

    if train_path.exists() && (cfg.train_only || test_path.exists()) {
        if cfg.verbose {
            println!("Reusing cached dataset at {}", train_path.display());
        }
        let test = (!cfg.train_only).then(|| test_path);
        return Ok((train_path, test));
    }

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if cfg.verbose {
        println!(
            "Creating training data set for {}...",
            train_path.display()
        );
    }
    write_split(&train_path, cfg.train_size, cfg, &mut rng)?;

    if cfg.train_only {
        return Ok((train_path, None));
    }

    if cfg.verbose {
        println!("Creating test data set for {}...", test_path.display());
    }
    write_split(&test_path, cfg.test_size, cfg, &mut rng)?;

    Ok((train_path, Some(test_path)))
}

fn write_split(
    path: &Path,
    samples: usize,
    cfg: &DatasetConfig,
    rng: &mut StdRng,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut progress = cfg.verbose.then(|| ProgressBar::new(samples));
    let mut values: Vec<i64> = (cfg.low..=cfg.high).collect();

    for _ in 0..samples {
        values.shuffle(rng);
        let line = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line)?;
        if let Some(bar) = progress.as_mut() {
            bar.inc();
        }
    }
    writer.flush()?;
    Ok(())
}

/// A sorting dataset loaded into memory.
pub struct SortingDataset {
    samples: Vec<Array1<f32>>,
}

impl SortingDataset {
    /// Load a dataset file, one whitespace-separated permutation per line.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut samples = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let values = line
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<i64>().map(|v| v as f32).map_err(|_| {
                        PermMLError::DataError(format!(
                            "line {}: invalid integer {:?}",
                            line_no + 1,
                            tok
                        ))
                    })
                })
                .collect::<Result<Vec<f32>>>()?;
            samples.push(Array1::from(values));
        }

        Ok(SortingDataset { samples })
    }

    /// Get number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get a sample.
    pub fn get(&self, idx: usize) -> Option<&Array1<f32>> {
        self.samples.get(idx)
    }

    /// Stack the given samples into a `[batch, seq_len]` array.
    pub fn to_batch(&self, indices: &[usize]) -> Result<Array2<f32>> {
        let first = indices
            .first()
            .and_then(|&i| self.samples.get(i))
            .ok_or_else(|| PermMLError::DataError("empty batch".to_string()))?;
        let seq_len = first.len();
        let mut batch = Array2::zeros((indices.len(), seq_len));

        for (row, &idx) in indices.iter().enumerate() {
            let sample = self.samples.get(idx).ok_or_else(|| {
                PermMLError::DataError(format!("sample index {} out of range", idx))
            })?;
            if sample.len() != seq_len {
                return Err(PermMLError::DataError(format!(
                    "sample {} has length {}, expected {}",
                    idx,
                    sample.len(),
                    seq_len
                )));
            }
            batch.row_mut(row).assign(sample);
        }
        Ok(batch)
    }

    /// Graph featurization of one sample for GCN-style models.
    ///
    /// Fails if `idx` is out of range or the sample's values are not a
    /// contiguous run (see [`PermutationGraph::from_permutation`]).
    pub fn to_graph(&self, idx: usize) -> Result<PermutationGraph> {
        let sample = self.get(idx).ok_or_else(|| {
            PermMLError::DataError(format!("sample index {} out of range", idx))
        })?;
        PermutationGraph::from_permutation(sample)
    }
}

/// A permutation viewed as a graph: node features plus a normalized
/// adjacency matrix linking each position to the position of its value.
#[derive(Clone, Debug)]
pub struct PermutationGraph {
    /// Node features, shape `[n, 1]`
    pub features: Array2<f32>,
    /// Row-normalized adjacency, shape `[n, n]`
    pub adjacency: Array2<f32>,
}

impl PermutationGraph {
    /// Build the graph for one permutation.
    ///
    /// The adjacency starts from the identity, adds an edge from position
    /// `i` to the rank of its value, is scaled by `1 / (n - 1)`, and is then
    /// row-normalized.
    ///
    /// The rank encoding assumes the values form a contiguous run (a
    /// permutation of `low..=high`); a sample with gaps such as `1 5 9`
    /// parses fine but has no valid rank edges and is rejected.
    pub fn from_permutation(perm: &Array1<f32>) -> Result<Self> {
        let n = perm.len();
        let features = perm
            .view()
            .insert_axis(ndarray::Axis(1))
            .to_owned();

        let smallest = perm.fold(f32::INFINITY, |acc, &v| acc.min(v));
        let mut adjacency = Array2::eye(n);
        for i in 0..n {
            let rank = (perm[i] - smallest) as usize;
            if rank >= n {
                return Err(PermMLError::DataError(format!(
                    "value {} has rank {} in a sequence of length {}; \
                     values must form a contiguous run",
                    perm[i], rank, n
                )));
            }
            adjacency[[i, rank]] = 1.0;
        }
        if n > 1 {
            adjacency.mapv_inplace(|v| v / (n - 1) as f32);
        }
        for mut row in adjacency.rows_mut() {
            let sum = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|v| v / sum);
            }
        }

        Ok(PermutationGraph {
            features,
            adjacency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::fs;
    use tempfile::tempdir;

    fn quiet_config(dir: &Path) -> DatasetConfig {
        DatasetConfig {
            train_size: 20,
            test_size: 10,
            data_dir: dir.to_path_buf(),
            low: 1,
            high: 5,
            seed: Some(7),
            verbose: false,
            ..DatasetConfig::default()
        }
    }

    #[test]
    fn test_config_validation() {
        let dir = tempdir().unwrap();
        let mut cfg = quiet_config(dir.path());
        assert!(cfg.validate().is_ok());

        cfg.high = 0;
        assert!(cfg.validate().is_err());

        cfg.high = 5;
        cfg.train_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_create_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let cfg = quiet_config(dir.path());
        let (train, test) = create_dataset(&cfg).unwrap();
        assert!(train.exists());
        assert!(test.as_ref().unwrap().exists());

        let dataset = SortingDataset::load(&train).unwrap();
        assert_eq!(dataset.len(), cfg.train_size);
        for i in 0..dataset.len() {
            let sample = dataset.get(i).unwrap();
            assert_eq!(sample.len(), cfg.sequence_len());
            let mut values: Vec<i64> = sample.iter().map(|&v| v as i64).collect();
            values.sort_unstable();
            assert_eq!(values, vec![1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn test_cached_files_reused() {
        let dir = tempdir().unwrap();
        let cfg = quiet_config(dir.path());
        let (train, _) = create_dataset(&cfg).unwrap();
        let before = fs::read_to_string(&train).unwrap();

        let (train_again, _) = create_dataset(&cfg).unwrap();
        assert_eq!(train, train_again);
        assert_eq!(before, fs::read_to_string(&train_again).unwrap());
    }

    #[test]
    fn test_train_only_skips_test_split() {
        let dir = tempdir().unwrap();
        let cfg = DatasetConfig {
            train_only: true,
            ..quiet_config(dir.path())
        };
        let (_, test) = create_dataset(&cfg).unwrap();
        assert!(test.is_none());
    }

    #[test]
    fn test_seed_reproducibility() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        let (train_a, _) = create_dataset(&quiet_config(dir_a.path())).unwrap();
        let (train_b, _) = create_dataset(&quiet_config(dir_b.path())).unwrap();
        assert_eq!(
            fs::read_to_string(train_a).unwrap(),
            fs::read_to_string(train_b).unwrap()
        );
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "1 2 x 4\n").unwrap();
        assert!(SortingDataset::load(&path).is_err());
    }

    #[test]
    fn test_to_batch() {
        let dir = tempdir().unwrap();
        let cfg = quiet_config(dir.path());
        let (train, _) = create_dataset(&cfg).unwrap();
        let dataset = SortingDataset::load(&train).unwrap();

        let batch = dataset.to_batch(&[0, 1, 2]).unwrap();
        assert_eq!(batch.dim(), (3, cfg.sequence_len()));
        assert!(dataset.to_batch(&[]).is_err());
        assert!(dataset.to_batch(&[dataset.len()]).is_err());
    }

    #[test]
    fn test_graph_featurization() {
        let perm = array![24.0_f32, 23.0, 21.0, 22.0, 20.0];
        let graph = PermutationGraph::from_permutation(&perm).unwrap();
        assert_eq!(graph.features.dim(), (5, 1));
        assert_eq!(graph.adjacency.dim(), (5, 5));

        // Position 0 holds the largest value (rank 4): identity edge plus
        // the rank edge, each 0.5 after row normalization.
        assert!((graph.adjacency[[0, 0]] - 0.5).abs() < 1e-6);
        assert!((graph.adjacency[[0, 4]] - 0.5).abs() < 1e-6);

        // Rows are normalized.
        for row in graph.adjacency.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }

        // A sorted permutation's rank edges coincide with the identity.
        let sorted = PermutationGraph::from_permutation(&array![20.0_f32, 21.0, 22.0]).unwrap();
        assert_eq!(sorted.adjacency, Array2::<f32>::eye(3));
    }

    #[test]
    fn test_graph_rejects_non_contiguous_values() {
        // Parses as valid integers but the values are not a contiguous run,
        // so the rank encoding has no valid edges.
        let dir = tempdir().unwrap();
        let path = dir.path().join("gapped.txt");
        fs::write(&path, "1 5 9\n").unwrap();
        let dataset = SortingDataset::load(&path).unwrap();

        assert!(matches!(
            dataset.to_graph(0),
            Err(PermMLError::DataError(_))
        ));
        assert!(matches!(
            dataset.to_graph(1),
            Err(PermMLError::DataError(_))
        ));
    }
}
