//! Text preprocessing: raw text → sentences of tokens.
//!
//! [`Preprocessor`] is the seam the grouping pipeline depends on;
//! [`SimplePreprocessor`] is the rule-based tokenizer plus sentence splitter.

use crate::sentence::{Sentence, SentenceSplitter};
use crate::tokenizer::{LabelMap, Tokenizer};

/// Turns texts into their normalized sentence form.
pub trait Preprocessor: Send + Sync {
    /// Process texts in order, one sentence list per text.
    ///
    /// `index_to_labels[i]`, when present, supplies per-character labels for
    /// `texts[i]`.
    fn process(&self, texts: &[&str], index_to_labels: Option<&[LabelMap]>) -> Vec<Vec<Sentence>>;

    /// Process a single document.
    fn process_document(&self, text: &str) -> Vec<Sentence> {
        self.process(&[text], None).pop().unwrap_or_default()
    }

    /// Flattened token contents of a document, in original order.
    ///
    /// This is the stream handed to signature hashing.
    fn hashing_tokens(&self, text: &str) -> Vec<String> {
        self.process_document(text)
            .into_iter()
            .flatten()
            .map(|token| token.content)
            .collect()
    }
}

/// Tokenizer followed by sentence splitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePreprocessor {
    tokenizer: Tokenizer,
    splitter: SentenceSplitter,
}

impl SimplePreprocessor {
    /// Create a preprocessor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preprocessor for SimplePreprocessor {
    fn process(&self, texts: &[&str], index_to_labels: Option<&[LabelMap]>) -> Vec<Vec<Sentence>> {
        let token_lists = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let labels = index_to_labels.and_then(|all| all.get(i));
                self.tokenizer.tokenize(text, labels)
            })
            .collect();

        self.splitter.split_texts(token_lists)
    }
}
