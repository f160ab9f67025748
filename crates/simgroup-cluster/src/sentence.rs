//! Sentence splitting over token sequences.

use crate::tokenizer::Token;

/// Ordered tokens of one sentence, boundary tokens excluded.
pub type Sentence = Vec<Token>;

/// Token contents that close a sentence.
pub const SENTENCE_BOUNDARIES: [&str; 3] = ["\n", "\\n", "."];

/// Returns true if `content` is a sentence boundary marker.
#[must_use]
pub fn is_boundary(content: &str) -> bool {
    SENTENCE_BOUNDARIES.contains(&content)
}

/// Splits token sequences into sentences on boundary tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSplitter;

impl SentenceSplitter {
    /// Create a splitter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Split one token sequence. Boundary tokens are dropped and empty
    /// sentences are never produced.
    #[must_use]
    pub fn split(&self, tokens: Vec<Token>) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut current = Vec::new();

        for token in tokens {
            if is_boundary(&token.content) {
                if !current.is_empty() {
                    sentences.push(std::mem::take(&mut current));
                }
            } else {
                current.push(token);
            }
        }

        if !current.is_empty() {
            sentences.push(current);
        }

        sentences
    }

    /// Split several token sequences independently, keeping their order.
    #[must_use]
    pub fn split_texts(&self, token_lists: Vec<Vec<Token>>) -> Vec<Vec<Sentence>> {
        token_lists
            .into_iter()
            .map(|tokens| self.split(tokens))
            .collect()
    }
}
