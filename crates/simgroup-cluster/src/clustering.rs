//! Online grouping of a document stream.
//!
//! Each document is hashed into bucket keys and resolved against two
//! relations in a [`KvStore`]:
//!
//! - `hash2doc`: bucket key → first document seen in that bucket
//! - `doc2sim`: document → group it joined
//!
//! A document reads every bucket key once whatever the corpus size, then
//! claims the buckets that had no owner. Bucket owners are never replaced and
//! groups are never merged: the first owned bucket, in band order, decides
//! the group. When concurrent documents race for a bucket, the store picks
//! one owner and the others join it as if they had read it.
//!
//! ## Usage
//!
//! ```rust
//! use simgroup_cluster::clustering::{MinHashLsh, StreamClustering};
//! use simgroup_core::MemoryStore;
//!
//! # async fn example() -> simgroup_core::Result<()> {
//! let hasher = MinHashLsh::new(100, 20, 0.9)?;
//! let engine = StreamClustering::new(hasher, MemoryStore::new());
//!
//! let first = engine.find_group("a", &["x", "y"]).await?;
//! let second = engine.find_group("b", &["x", "y"]).await?;
//! assert_eq!(first, "a");
//! assert_eq!(second, "a");
//! # Ok(())
//! # }
//! ```

use crate::config::ClusterConfig;
use crate::lsh::{BandHash, Lsh};
use crate::minhash::{MinHashSignature, MinHasher};
use simgroup_core::{KvStore, Result, SimgroupError};
use tracing::{debug, trace};

/// Namespace of the bucket-ownership relation.
pub const HASH2DOC: &str = "hash2doc";

/// Namespace of the document-to-group relation.
pub const DOC2SIM: &str = "doc2sim";

/// Turns a token sequence into bucket keys.
pub trait Hashing: Send + Sync {
    /// Bucket keys for `tokens`, in a stable order.
    fn hash(&self, tokens: &[&str]) -> Result<Vec<String>>;
}

/// MinHash signatures cut into LSH bands.
#[derive(Debug, Clone)]
pub struct MinHashLsh {
    hasher: MinHasher,
    lsh: Lsh,
}

impl MinHashLsh {
    /// Create a hasher with `dim` permutations split into `num_bands` bands.
    ///
    /// # Errors
    /// Returns a configuration error if `dim` is not divisible by `num_bands`.
    pub fn new(dim: usize, num_bands: usize, threshold: f64) -> Result<Self> {
        let lsh = Lsh::new(dim, num_bands, threshold)?;
        Ok(Self::from_parts(MinHasher::new(dim), lsh))
    }

    /// Build from a validated configuration.
    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        config.validate()?;
        let hasher = MinHasher::with_seed(config.num_permutations, config.seed)
            .with_ngram_size(config.ngram_size);
        let lsh = Lsh::new(config.num_permutations, config.num_bands, config.threshold)?
            .with_band_hash(config.band_hash);
        Ok(Self::from_parts(hasher, lsh))
    }

    /// Combine an existing signer and banding scheme.
    ///
    /// The banding dimension is authoritative; a signer of another length
    /// makes every [`Hashing::hash`] call fail.
    #[must_use]
    pub fn from_parts(hasher: MinHasher, lsh: Lsh) -> Self {
        Self { hasher, lsh }
    }

    /// Use a different bucket-key hash.
    #[must_use]
    pub fn with_band_hash(mut self, band_hash: BandHash) -> Self {
        self.lsh = self.lsh.with_band_hash(band_hash);
        self
    }

    /// Signature of `tokens`.
    #[must_use]
    pub fn sign<S: AsRef<str>>(&self, tokens: &[S]) -> MinHashSignature {
        self.hasher.sign(tokens)
    }

    /// Bucket keys of an already computed signature.
    ///
    /// # Errors
    /// Fails if the signature length does not match the banding.
    pub fn band_keys(&self, signature: &MinHashSignature) -> Result<Vec<String>> {
        self.lsh.hash(signature)
    }

    /// The signer.
    #[must_use]
    pub fn minhasher(&self) -> &MinHasher {
        &self.hasher
    }

    /// The banding scheme.
    #[must_use]
    pub fn lsh(&self) -> &Lsh {
        &self.lsh
    }
}

impl Hashing for MinHashLsh {
    fn hash(&self, tokens: &[&str]) -> Result<Vec<String>> {
        self.band_keys(&self.sign(tokens))
    }
}

/// Online clustering engine over an injected store.
pub struct StreamClustering<H, S> {
    hasher: H,
    store: S,
}

impl<H: Hashing, S: KvStore> StreamClustering<H, S> {
    /// Create an engine. The store is used as is; call [`reset`](Self::reset)
    /// to start a fresh run.
    pub fn new(hasher: H, store: S) -> Self {
        Self { hasher, store }
    }

    /// The hashing strategy.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Clear both clustering relations.
    pub async fn reset(&self) -> Result<()> {
        self.store.delete(HASH2DOC).await?;
        self.store.delete(DOC2SIM).await?;
        Ok(())
    }

    /// Find the group of a document from its tokens.
    ///
    /// Returns `doc_id` itself when the document starts a new group, or the
    /// id of an earlier document otherwise. Mutates shared state: call it
    /// once per document id.
    ///
    /// # Errors
    /// Store failures are returned as is. An empty `doc_id` is invalid input.
    pub async fn find_group<T: AsRef<str>>(&self, doc_id: &str, tokens: &[T]) -> Result<String> {
        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        let keys = self.hasher.hash(&tokens)?;
        self.find_group_by_keys(doc_id, &keys).await
    }

    /// Resolve a group from precomputed bucket keys.
    ///
    /// Lets callers sign documents in parallel and keep only store round
    /// trips on the async path.
    pub async fn find_group_by_keys(&self, doc_id: &str, keys: &[String]) -> Result<String> {
        if doc_id.is_empty() {
            return Err(SimgroupError::InvalidInput(
                "document id must not be empty".to_string(),
            ));
        }

        // Every owner is read before this document claims anything, so a
        // follower's doc2sim entry exists before its buckets become visible.
        let mut owners = Vec::with_capacity(keys.len());
        for key in keys {
            owners.push(self.store.get(HASH2DOC, key).await?);
        }

        let mut group_id = match owners.iter().flatten().find(|owner| owner.as_str() != doc_id) {
            Some(owner) => Some(self.join(doc_id, owner).await?),
            None => None,
        };

        for (key, owner) in keys.iter().zip(&owners) {
            if owner.is_some() || self.store.put_if_absent(HASH2DOC, key, doc_id).await? {
                continue;
            }
            // Lost the bucket to a concurrent writer: its owner still counts.
            if group_id.is_none() {
                if let Some(owner) = self.store.get(HASH2DOC, key).await? {
                    if owner != doc_id {
                        debug!(doc_id = %doc_id, owner = %owner, "Lost bucket claim");
                        group_id = Some(self.join(doc_id, &owner).await?);
                    }
                }
            }
        }

        let group_id = group_id.unwrap_or_else(|| doc_id.to_string());
        trace!(doc_id = %doc_id, group_id = %group_id, "Resolved group");
        Ok(group_id)
    }

    /// Group of a document whose bucket is owned by `owner`.
    ///
    /// Adopts the owner's recorded group when it has one. Otherwise the owner
    /// is the group and the membership is recorded.
    async fn join(&self, doc_id: &str, owner: &str) -> Result<String> {
        if let Some(owner_group) = self.store.get(DOC2SIM, owner).await? {
            return Ok(owner_group);
        }
        self.store.put(DOC2SIM, doc_id, owner).await?;
        Ok(owner.to_string())
    }
}
