//! Configuration for the clustering engine and the batch runner.

use crate::io::DateRange;
use crate::lsh::{BandHash, Lsh};
use crate::minhash::{DEFAULT_NGRAM_SIZE, DEFAULT_NUM_PERMUTATIONS, DEFAULT_SEED};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use simgroup_core::{Result, SimgroupError};

/// Default number of LSH bands.
pub const DEFAULT_NUM_BANDS: usize = 20;

/// Default target similarity.
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Signature and banding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Signature length (`dim`).
    pub num_permutations: usize,
    /// Number of bands (`length`); must divide `num_permutations`.
    pub num_bands: usize,
    /// Intended S-curve midpoint. Informational only.
    pub threshold: f64,
    /// Seed of the permutation family.
    pub seed: u64,
    /// Tokens per shingle.
    pub ngram_size: usize,
    /// Bucket-key hash.
    pub band_hash: BandHash,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            num_permutations: DEFAULT_NUM_PERMUTATIONS,
            num_bands: DEFAULT_NUM_BANDS,
            threshold: DEFAULT_THRESHOLD,
            seed: DEFAULT_SEED,
            ngram_size: DEFAULT_NGRAM_SIZE,
            band_hash: BandHash::default(),
        }
    }
}

impl ClusterConfig {
    /// Check every parameter; the first violation is returned.
    pub fn validate(&self) -> Result<()> {
        if self.ngram_size == 0 {
            return Err(SimgroupError::Config("ngram size must be > 0".to_string()));
        }
        Lsh::new(self.num_permutations, self.num_bands, self.threshold).map(|_| ())
    }

    /// Rows per band.
    #[must_use]
    pub fn rows_per_band(&self) -> usize {
        self.num_permutations.checked_div(self.num_bands).unwrap_or(0)
    }
}

/// Batch run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// First day to process.
    pub from_date: Option<NaiveDate>,
    /// Day after the last one to process.
    pub to_date: Option<NaiveDate>,
    /// Documents per sink update.
    pub batch_size: usize,
    /// Group lookups in flight against the store.
    pub workers: usize,
    /// Log progress every this many documents.
    pub report_interval: usize,
    /// Delete clustering state before the run.
    pub reset_state: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            from_date: None,
            to_date: None,
            batch_size: 1000,
            workers: 8,
            report_interval: 1000,
            reset_state: true,
        }
    }
}

impl RunConfig {
    /// Check sizes and the date range.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SimgroupError::Config("batch size must be > 0".to_string()));
        }
        if self.workers == 0 {
            return Err(SimgroupError::Config("workers must be > 0".to_string()));
        }
        if self.report_interval == 0 {
            return Err(SimgroupError::Config(
                "report interval must be > 0".to_string(),
            ));
        }
        match (self.from_date, self.to_date) {
            (None, None) => Ok(()),
            (Some(from), Some(to)) if from < to => Ok(()),
            (Some(from), Some(to)) => Err(SimgroupError::Config(format!(
                "date range is empty or inverted: {from} .. {to}"
            ))),
            _ => Err(SimgroupError::Config(
                "from and to dates must be given together".to_string(),
            )),
        }
    }

    /// Scan windows of the run: one per day, or a single unbounded window
    /// when no dates are set.
    #[must_use]
    pub fn windows(&self) -> Vec<Option<DateRange>> {
        match (self.from_date, self.to_date) {
            (Some(from), Some(to)) => from
                .iter_days()
                .take_while(|day| *day < to)
                .map(|day| Some(DateRange::day(day)))
                .collect(),
            _ => vec![None],
        }
    }
}
