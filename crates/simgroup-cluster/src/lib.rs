//! # simgroup-cluster
//!
//! Online near-duplicate grouping of text streams.
//!
//! Documents are normalized into tokens, signed with MinHash, cut into LSH
//! bands and resolved against a shared key-value store. Each document gets a
//! group id in a fixed number of store lookups, independent of corpus size.
//!
//! ## Pipeline
//!
//! - [`tokenizer`]: rule-based tokens with char spans and optional labels
//! - [`sentence`]: sentence splitting on boundary tokens
//! - [`preprocess`]: text → sentences, the token stream fed to hashing
//! - [`minhash`]: token set → fixed-length signature
//! - [`lsh`]: signature → one bucket key per band
//! - [`clustering`]: bucket keys → group id over a [`KvStore`]
//! - [`io`] and [`runner`]: batch runs over a document index
//!
//! ## Example
//!
//! ```rust
//! use simgroup_cluster::{MinHashLsh, Preprocessor, SimplePreprocessor, StreamClustering};
//! use simgroup_core::MemoryStore;
//!
//! # async fn example() -> simgroup_core::Result<()> {
//! let pre = SimplePreprocessor::new();
//! let engine = StreamClustering::new(MinHashLsh::new(100, 20, 0.9)?, MemoryStore::new());
//!
//! let tokens = pre.hashing_tokens("U.S. GDP grew 3.5% in 2020.");
//! assert_eq!(engine.find_group("doc-1", &tokens).await?, "doc-1");
//! assert_eq!(engine.find_group("doc-2", &tokens).await?, "doc-1");
//! # Ok(())
//! # }
//! ```

pub mod clustering;
pub mod config;
pub mod io;
pub mod lsh;
pub mod minhash;
pub mod preprocess;
pub mod runner;
pub mod sentence;
pub mod tokenizer;

#[cfg(test)]
mod test_util;

pub use clustering::{Hashing, MinHashLsh, StreamClustering, DOC2SIM, HASH2DOC};
pub use config::{ClusterConfig, RunConfig};
pub use io::{
    DateRange, Document, DocumentSink, DocumentSource, FieldNames, GroupAnnotation, IoError,
    JsonlIndex, UpdateReport,
};
pub use lsh::{BandHash, Lsh};
pub use minhash::{MinHashSignature, MinHasher};
pub use preprocess::{Preprocessor, SimplePreprocessor};
pub use runner::{ClusterError, GroupingRunner, RunStats};
pub use sentence::{Sentence, SentenceSplitter};
pub use tokenizer::{LabelMap, Token, Tokenizer};

pub use simgroup_core::KvStore;
