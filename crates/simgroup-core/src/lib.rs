//! # simgroup-core
//!
//! Core infrastructure for simgroup.
//!
//! Provides shared abstractions for:
//! - Key-value storage backends for clustering state (in-memory, Redis)
//! - Hashing (xxhash, blake3) used by signatures and band keys
//! - The common error type

pub mod error;
pub mod hashing;
pub mod storage;

pub use error::{Result, SimgroupError};
pub use hashing::{Blake3Hasher, HashFunction, XxHash3};
#[cfg(feature = "redis")]
pub use storage::RedisStore;
pub use storage::{KvStore, MemoryStore};
