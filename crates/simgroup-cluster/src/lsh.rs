//! Locality-Sensitive Hashing (LSH) banding over MinHash signatures.
//!
//! A signature of `dim` values is cut into `num_bands` contiguous bands of
//! `rows_per_band` values each. Every band is hashed to a bucket key; two
//! documents sharing any bucket key are duplicate candidates.
//!
//! For true similarity `s`, `b` bands and `r` rows the chance of sharing at
//! least one bucket is `1 - (1 - s^r)^b`, an S-curve whose midpoint sits
//! near `(1/b)^(1/r)`. The configured threshold names the intended midpoint
//! and is never used as a runtime filter.

use crate::minhash::MinHashSignature;
use serde::{Deserialize, Serialize};
use simgroup_core::hashing::{Blake3Hasher, HashFunction, XxHash3};
use simgroup_core::{Result, SimgroupError};

/// Hash function used to turn a band into a bucket key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandHash {
    /// 128-bit xxh3.
    #[default]
    Xxh3,
    /// Truncated blake3.
    Blake3,
}

impl BandHash {
    fn hasher(self) -> &'static dyn HashFunction {
        match self {
            Self::Xxh3 => &XxHash3,
            Self::Blake3 => &Blake3Hasher,
        }
    }
}

/// Banding scheme producing one bucket key per band.
#[derive(Debug, Clone)]
pub struct Lsh {
    num_bands: usize,
    rows_per_band: usize,
    threshold: f64,
    band_hash: BandHash,
}

impl Lsh {
    /// Create a banding scheme for signatures of length `dim`.
    ///
    /// # Errors
    /// Returns a configuration error if `num_bands` is zero, does not divide
    /// `dim` evenly, or `threshold` is outside `[0, 1]`.
    pub fn new(dim: usize, num_bands: usize, threshold: f64) -> Result<Self> {
        if num_bands == 0 || dim == 0 {
            return Err(SimgroupError::Config(format!(
                "signature dimension ({dim}) and band count ({num_bands}) must be positive"
            )));
        }
        if dim % num_bands != 0 {
            return Err(SimgroupError::Config(format!(
                "signature dimension {dim} is not divisible by band count {num_bands}"
            )));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SimgroupError::Config(format!(
                "threshold must be between 0.0 and 1.0, got {threshold}"
            )));
        }

        Ok(Self {
            num_bands,
            rows_per_band: dim / num_bands,
            threshold,
            band_hash: BandHash::default(),
        })
    }

    /// Create a banding scheme whose S-curve midpoint is closest to `threshold`.
    ///
    /// # Errors
    /// Returns a configuration error for a zero `dim` or out-of-range threshold.
    pub fn with_threshold(dim: usize, threshold: f64) -> Result<Self> {
        let (num_bands, _) = Self::optimize_params(dim, threshold);
        Self::new(dim, num_bands, threshold)
    }

    /// Select the bucket-key hash function.
    #[must_use]
    pub fn with_band_hash(mut self, band_hash: BandHash) -> Self {
        self.band_hash = band_hash;
        self
    }

    /// Find `(num_bands, rows_per_band)` with `b * r == n` whose estimated
    /// threshold `(1/b)^(1/r)` best matches `t`.
    fn optimize_params(n: usize, t: f64) -> (usize, usize) {
        let mut best = (1, n.max(1));
        let mut best_diff = f64::MAX;

        for b in 1..=n {
            if n % b == 0 {
                let r = n / b;
                let estimated_t = (1.0 / b as f64).powf(1.0 / r as f64);
                let diff = (estimated_t - t).abs();
                if diff < best_diff {
                    best = (b, r);
                    best_diff = diff;
                }
            }
        }

        best
    }

    /// Get the number of bands.
    #[must_use]
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Get the number of rows per band.
    #[must_use]
    pub fn rows_per_band(&self) -> usize {
        self.rows_per_band
    }

    /// Signature length this scheme expects.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.num_bands * self.rows_per_band
    }

    /// Configured target similarity.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity at which the candidate probability crosses roughly one half.
    #[must_use]
    pub fn estimated_threshold(&self) -> f64 {
        (1.0 / self.num_bands as f64).powf(1.0 / self.rows_per_band as f64)
    }

    /// Probability that two documents with Jaccard similarity `similarity`
    /// share at least one bucket key.
    #[must_use]
    pub fn candidate_probability(&self, similarity: f64) -> f64 {
        let band_match = similarity.powi(self.rows_per_band as i32);
        1.0 - (1.0 - band_match).powi(self.num_bands as i32)
    }

    /// Hash a signature into one bucket key per band, in band order.
    ///
    /// Each key covers the band index as well as its values, so equal value
    /// tuples in different band positions never collide.
    ///
    /// # Errors
    /// Returns invalid input if the signature length differs from [`Lsh::dim`].
    pub fn hash(&self, signature: &MinHashSignature) -> Result<Vec<String>> {
        if signature.len() != self.dim() {
            return Err(SimgroupError::InvalidInput(format!(
                "signature has {} values, banding expects {}",
                signature.len(),
                self.dim()
            )));
        }

        let hasher = self.band_hash.hasher();
        let keys = signature
            .values
            .chunks_exact(self.rows_per_band)
            .enumerate()
            .map(|(band, rows)| hasher.hash_hex(&band_bytes(band, rows)))
            .collect();

        Ok(keys)
    }
}

fn band_bytes(band: usize, rows: &[u64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 * (rows.len() + 1));
    bytes.extend_from_slice(&(band as u64).to_le_bytes());
    for value in rows {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
