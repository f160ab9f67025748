//! MinHash signature generation for document similarity.
//!
//! MinHash is a locality-sensitive hashing technique that approximates
//! the Jaccard similarity between token sets: for each of `dim` independent
//! hash functions two sets agree on the minimum with probability equal to
//! their Jaccard similarity.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use simgroup_core::hashing::{hash_token, hash_with_seed};
use std::collections::HashSet;

/// Default signature length.
pub const DEFAULT_NUM_PERMUTATIONS: usize = 100;

/// Default seed for the permutation family.
pub const DEFAULT_SEED: u64 = 42;

/// Default shingle size: single tokens.
pub const DEFAULT_NGRAM_SIZE: usize = 1;

/// MinHash signature - a compact representation of a document's shingle set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinHashSignature {
    /// The minimum hash values for each permutation.
    pub values: Vec<u64>,
}

impl MinHashSignature {
    /// Create a new signature with the given values.
    #[must_use]
    pub fn new(values: Vec<u64>) -> Self {
        Self { values }
    }

    /// Get the number of permutations in this signature.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the signature is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True for the all-`u64::MAX` signature of an empty token set.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.values.iter().all(|&v| v == u64::MAX)
    }
}

/// MinHash signature generator.
///
/// Uses multiple hash functions (simulated via seeds) to generate
/// compact signatures that preserve Jaccard similarity. Seeds come from a
/// fixed-seed RNG, so the same `(num_permutations, seed)` always yields
/// the same family of functions.
#[derive(Debug, Clone)]
pub struct MinHasher {
    num_permutations: usize,
    seeds: Vec<u64>,
    ngram_size: usize,
}

impl MinHasher {
    /// Create a new MinHasher with the specified number of permutations.
    #[must_use]
    pub fn new(num_permutations: usize) -> Self {
        Self::with_seed(num_permutations, DEFAULT_SEED)
    }

    /// Create a new MinHasher with a specific random seed.
    #[must_use]
    pub fn with_seed(num_permutations: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let seeds: Vec<u64> = (0..num_permutations).map(|_| rng.gen()).collect();

        Self {
            num_permutations,
            seeds,
            ngram_size: DEFAULT_NGRAM_SIZE,
        }
    }

    /// Set the n-gram size for shingling (clamped to at least 1).
    #[must_use]
    pub fn with_ngram_size(mut self, ngram_size: usize) -> Self {
        self.ngram_size = ngram_size.max(1);
        self
    }

    /// Get the number of permutations.
    #[must_use]
    pub fn num_permutations(&self) -> usize {
        self.num_permutations
    }

    /// Get the n-gram size.
    #[must_use]
    pub fn ngram_size(&self) -> usize {
        self.ngram_size
    }

    /// Sign a token sequence.
    ///
    /// Tokens are reduced to a set of shingle hashes first, so repeats and
    /// (for unigrams) order do not change the signature.
    #[must_use]
    pub fn sign<S: AsRef<str>>(&self, tokens: &[S]) -> MinHashSignature {
        self.signature(&self.shingles(tokens))
    }

    /// Generate a MinHash signature from a set of shingle hashes.
    ///
    /// Each shingle hash is hashed with each seed, and the minimum
    /// hash value is kept for each permutation.
    #[must_use]
    pub fn signature(&self, shingles: &HashSet<u64>) -> MinHashSignature {
        let mut min_hashes = vec![u64::MAX; self.num_permutations];

        for &shingle in shingles {
            let bytes = shingle.to_le_bytes();
            for (slot, &seed) in min_hashes.iter_mut().zip(&self.seeds) {
                *slot = (*slot).min(hash_with_seed(&bytes, seed));
            }
        }

        MinHashSignature::new(min_hashes)
    }

    /// Hash a token sequence into its set of n-gram shingles.
    #[must_use]
    pub fn shingles<S: AsRef<str>>(&self, tokens: &[S]) -> HashSet<u64> {
        if tokens.is_empty() {
            return HashSet::new();
        }

        if self.ngram_size == 1 {
            return tokens.iter().map(|t| hash_token(t.as_ref())).collect();
        }

        if tokens.len() < self.ngram_size {
            // Fewer tokens than ngram_size: the whole sequence is one shingle.
            let mut shingles = HashSet::new();
            shingles.insert(hash_token(&join(tokens)));
            return shingles;
        }

        tokens
            .windows(self.ngram_size)
            .map(|window| hash_token(&join(window)))
            .collect()
    }

    /// Estimate Jaccard similarity from two MinHash signatures.
    ///
    /// The similarity is approximated by the fraction of hash values
    /// that match between the two signatures. Signatures of different
    /// lengths are not comparable and score 0.0.
    #[must_use]
    pub fn similarity(sig1: &MinHashSignature, sig2: &MinHashSignature) -> f64 {
        if sig1.values.len() != sig2.values.len() || sig1.values.is_empty() {
            return 0.0;
        }

        let matches = sig1
            .values
            .iter()
            .zip(sig2.values.iter())
            .filter(|(a, b)| a == b)
            .count();

        matches as f64 / sig1.values.len() as f64
    }
}

impl Default for MinHasher {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_PERMUTATIONS)
    }
}

fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_minhash_identical_token_sets() {
        let hasher = MinHasher::new(128);
        let sig1 = hasher.sign(&words("the quick brown fox jumps over the lazy dog"));
        let sig2 = hasher.sign(&words("the quick brown fox jumps over the lazy dog"));

        assert_eq!(sig1, sig2);
        assert!((MinHasher::similarity(&sig1, &sig2) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_of_mismatched_lengths_is_zero() {
        let tokens = words("the quick brown fox");
        let short = MinHasher::new(64).sign(&tokens);
        let long = MinHasher::new(128).sign(&tokens);

        assert_eq!(MinHasher::similarity(&short, &long), 0.0);
        assert_eq!(MinHasher::similarity(&long, &short), 0.0);
    }

    #[test]
    fn test_minhash_ignores_order_and_repeats_for_unigrams() {
        let hasher = MinHasher::new(64);
        let sig1 = hasher.sign(&["x", "y", "z"]);
        let sig2 = hasher.sign(&["z", "x", "y", "x"]);
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_minhash_disjoint_sets() {
        let hasher = MinHasher::new(128);
        let sig1 = hasher.sign(&words("alpha beta gamma delta epsilon zeta eta theta"));
        let sig2 = hasher.sign(&words("one two three four five six seven eight"));

        let similarity = MinHasher::similarity(&sig1, &sig2);
        assert!(
            similarity < 0.1,
            "Disjoint sets should rarely agree, got {similarity}"
        );
    }

    #[test]
    fn test_minhash_empty_tokens_gives_sentinel() {
        let hasher = MinHasher::new(128);
        let sig = hasher.sign::<&str>(&[]);

        assert_eq!(sig.len(), 128);
        assert!(sig.is_sentinel());
    }

    #[test]
    fn test_minhash_signature_length() {
        for num_perms in [4, 64, 100, 256] {
            let hasher = MinHasher::new(num_perms);
            assert_eq!(hasher.sign(&["some", "tokens"]).len(), num_perms);
        }
    }

    #[test]
    fn test_minhash_reproducibility() {
        let tokens = words("Reproducibility test document");
        let sig1 = MinHasher::with_seed(128, 12345).sign(&tokens);
        let sig2 = MinHasher::with_seed(128, 12345).sign(&tokens);
        let sig3 = MinHasher::with_seed(128, 54321).sign(&tokens);

        assert_eq!(sig1, sig2, "Same seed should produce same signature");
        assert_ne!(sig1, sig3);
    }

    #[test]
    fn test_shingles_ngram() {
        let hasher = MinHasher::new(16).with_ngram_size(3);
        let shingles = hasher.shingles(&words("one two three four five"));
        // "one two three", "two three four", "three four five"
        assert_eq!(shingles.len(), 3);
    }

    #[test]
    fn test_shingles_short_sequence() {
        let hasher = MinHasher::new(16).with_ngram_size(5);
        assert_eq!(hasher.shingles(&words("one two three")).len(), 1);
    }

    #[test]
    fn test_ngram_size_zero_is_clamped() {
        assert_eq!(MinHasher::new(8).with_ngram_size(0).ngram_size(), 1);
    }

    #[test]
    fn test_jaccard_approximation() {
        let hasher = MinHasher::new(256);

        let tokens1: Vec<String> = (0..40).map(|i| format!("w{i}")).collect();
        let tokens2: Vec<String> = (20..60).map(|i| format!("w{i}")).collect();
        // |A ∩ B| = 20, |A ∪ B| = 60
        let exact_jaccard = 20.0 / 60.0;

        let similarity = MinHasher::similarity(&hasher.sign(&tokens1), &hasher.sign(&tokens2));
        let diff = (exact_jaccard - similarity).abs();
        assert!(
            diff < 0.15,
            "MinHash should approximate Jaccard. Exact: {exact_jaccard}, MinHash: {similarity}"
        );
    }
}
