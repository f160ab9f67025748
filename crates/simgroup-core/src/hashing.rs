//! Hashing functions.
//!
//! Two families live here: seeded 64-bit hashes that drive MinHash
//! permutations, and wide [`HashFunction`]s that turn a signature band into
//! a bucket key.

/// Trait for hash functions that produce bucket keys.
pub trait HashFunction: Send + Sync {
    /// Hash data and return raw bytes.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Hash data and return hex string.
    fn hash_hex(&self, data: &[u8]) -> String {
        hex::encode(self.hash(data))
    }

    /// Short name, used in logs and config dumps.
    fn name(&self) -> &'static str;
}

/// XXHash3 (128-bit) - extremely fast, the default band hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct XxHash3;

impl XxHash3 {
    /// Create a new XXHash3 hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HashFunction for XxHash3 {
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        xxhash_rust::xxh3::xxh3_128(data).to_le_bytes().to_vec()
    }

    fn name(&self) -> &'static str {
        "xxh3-128"
    }
}

/// Blake3 hasher - cryptographically secure, still fast.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    /// Create a new Blake3 hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HashFunction for Blake3Hasher {
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        // 16 bytes is plenty for a bucket key and keeps Redis fields short.
        blake3::hash(data).as_bytes()[..16].to_vec()
    }

    fn name(&self) -> &'static str {
        "blake3"
    }
}

/// Hash with seed for MinHash-style algorithms.
#[inline]
pub fn hash_with_seed(data: &[u8], seed: u64) -> u64 {
    xxhash_rust::xxh3::xxh3_64_with_seed(data, seed)
}

/// Unseeded 64-bit hash of a token or shingle.
#[inline]
pub fn hash_token(token: &str) -> u64 {
    xxhash_rust::xxh3::xxh3_64(token.as_bytes())
}
