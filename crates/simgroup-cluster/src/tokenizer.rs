//! Rule-based tokenizer for news-style text.
//!
//! Splits raw text into words, numbers and standalone symbols in a single
//! left-to-right pass. Decimal and thousands separators stay inside numbers
//! ("3.5", "1,000"), abbreviation dots stay attached ("U.S"), and the
//! serialized newline escape `\` + `n` is kept as one two-character token.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-character labels supplied by the caller, keyed by char index.
pub type LabelMap = HashMap<usize, String>;

/// Characters that end the pending token and are otherwise dropped.
const SPLIT_CHARS: [char; 4] = [' ', '\n', '\t', '\\'];

/// Entries emitted as tokens of their own.
const SPECIAL_TOKENS: [&str; 36] = [
    ".", ",", ";", ":", "\"", "'", "?", "“", "”", "!", "-", "—", "...", "\t", "(", ")", "[", "]",
    "‘", "’", "+", "\n", "\\n", "*", "@", ">", "<", "~", "%", "$", "£", "=", "/", "®", "am", "pm",
];

/// A token with its char offsets in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token text.
    pub content: String,
    /// Char offset (inclusive) in the source text.
    pub start: usize,
    /// Char offset (exclusive) in the source text.
    pub end: usize,
    /// Label attached to the token's last character, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Token {
    /// Half-open `(start, end)` char span.
    #[must_use]
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

fn is_special(s: &str) -> bool {
    SPECIAL_TOKENS.contains(&s)
}

fn is_special_char(c: char) -> bool {
    let mut buf = [0u8; 4];
    is_special(c.encode_utf8(&mut buf))
}

/// Digits with optional `.`/`,` separators, at least one digit.
fn is_number(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

/// Stateless tokenizer; see the module docs for the rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl Tokenizer {
    /// Create a tokenizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Tokenize `text`, attaching labels from `index_to_label` when given.
    ///
    /// Never fails: empty or whitespace-only text yields no tokens.
    #[must_use]
    pub fn tokenize(&self, text: &str, index_to_label: Option<&LabelMap>) -> Vec<Token> {
        let chars: Vec<char> = text.chars().collect();
        let mut scan = Scan {
            tokens: Vec::new(),
            labels: index_to_label,
        };
        let mut tmp = String::new();

        for (idx, &ch) in chars.iter().enumerate() {
            strip_spaces(&mut tmp);
            let next = chars.get(idx + 1).copied();

            if is_special_char(ch) {
                let next_is_digit = next.is_some_and(|n| n.is_ascii_digit());
                let next_is_alpha = next.is_some_and(char::is_alphabetic);

                if (ch == '.' || ch == ',') && is_number(&tmp) && next_is_digit {
                    tmp.push(ch);
                } else if ch == '.' && next_is_alpha {
                    tmp.push(ch);
                } else {
                    scan.flush(&mut tmp, idx);
                    scan.push(ch.to_string(), idx, idx + 1, Some(idx));
                }
            } else if is_special(&tmp) {
                if tmp == "." && ch.is_alphabetic() {
                    tmp.push(ch);
                } else {
                    scan.flush(&mut tmp, idx);
                    tmp.push(ch);
                }
            } else if SPLIT_CHARS.contains(&ch) {
                scan.flush(&mut tmp, idx);
                if ch == '\\' {
                    tmp.push(ch);
                }
            } else {
                tmp.push(ch);
            }
        }

        strip_spaces(&mut tmp);
        scan.flush(&mut tmp, chars.len());
        scan.tokens
    }
}

fn strip_spaces(tmp: &mut String) {
    let trimmed = tmp.trim_matches(' ');
    if trimmed.len() != tmp.len() {
        *tmp = trimmed.to_string();
    }
}

struct Scan<'a> {
    tokens: Vec<Token>,
    labels: Option<&'a LabelMap>,
}

impl Scan<'_> {
    fn push(&mut self, content: String, start: usize, end: usize, label_at: Option<usize>) {
        let label = label_at.and_then(|i| self.labels.and_then(|m| m.get(&i)).cloned());
        self.tokens.push(Token {
            content,
            start,
            end,
            label,
        });
    }

    /// Emit the pending buffer as a token ending at `end`.
    fn flush(&mut self, tmp: &mut String, end: usize) {
        if tmp.is_empty() {
            return;
        }
        let content = std::mem::take(tmp);
        let start = end - content.chars().count();
        self.push(content, start, end, end.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(text: &str) -> Vec<String> {
        Tokenizer::new()
            .tokenize(text, None)
            .into_iter()
            .map(|t| t.content)
            .collect()
    }

    #[test]
    fn test_empty_text() {
        assert!(Tokenizer::new().tokenize("", None).is_empty());
        assert!(Tokenizer::new().tokenize("   ", None).is_empty());
    }

    #[test]
    fn test_abbreviation_decimal_and_percent() {
        assert_eq!(
            contents("U.S. GDP grew 3.5% in 2020."),
            vec!["U.S", ".", "GDP", "grew", "3.5", "%", "in", "2020", "."]
        );
    }

    #[test]
    fn test_spans_are_char_offsets() {
        let tokens = Tokenizer::new().tokenize("U.S. GDP grew 3.5% in 2020.", None);
        let spans: Vec<_> = tokens.iter().map(Token::span).collect();
        assert_eq!(
            spans,
            vec![
                (0, 3),
                (3, 4),
                (5, 8),
                (9, 13),
                (14, 17),
                (17, 18),
                (19, 21),
                (22, 26),
                (26, 27)
            ]
        );
    }

    #[test]
    fn test_spans_with_multibyte_chars() {
        let tokens = Tokenizer::new().tokenize("café “ok”", None);
        assert_eq!(tokens[0].content, "café");
        assert_eq!(tokens[0].span(), (0, 4));
        assert_eq!(tokens[1].content, "“");
        assert_eq!(tokens[1].span(), (5, 6));
        assert_eq!(tokens[2].content, "ok");
        assert_eq!(tokens[3].content, "”");
        assert_eq!(tokens[3].span(), (8, 9));
    }

    #[test]
    fn test_thousands_separator_stays_in_number() {
        assert_eq!(contents("paid $1,000 today"), vec!["paid", "$", "1,000", "today"]);
    }

    #[test]
    fn test_comma_after_word_is_a_token() {
        assert_eq!(contents("Hello, world"), vec!["Hello", ",", "world"]);
    }

    #[test]
    fn test_consecutive_split_chars_produce_no_empty_tokens() {
        assert_eq!(contents("a    b"), vec!["a", "b"]);
    }

    #[test]
    fn test_newline_and_tab_are_tokens() {
        assert_eq!(contents("one\ntwo\tthree"), vec!["one", "\n", "two", "\t", "three"]);
    }

    #[test]
    fn test_escaped_newline_is_one_token() {
        let tokens = Tokenizer::new().tokenize("first\\nsecond", None);
        let texts: Vec<_> = tokens.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(texts, vec!["first", "\\n", "second"]);
        assert_eq!(tokens[1].span(), (5, 7));
    }

    #[test]
    fn test_escaped_newline_before_space() {
        assert_eq!(contents("end\\n next"), vec!["end", "\\n", "next"]);
    }

    #[test]
    fn test_lone_backslash_is_kept() {
        assert_eq!(contents("a \\ b"), vec!["a", "\\", "b"]);
    }

    #[test]
    fn test_leading_dot_before_word() {
        assert_eq!(contents("use .net now"), vec!["use", ".net", "now"]);
    }

    #[test]
    fn test_am_pm_prefix_is_split() {
        // "am"/"pm" are standalone tokens, so a word starting with them is cut.
        assert_eq!(contents("at 9 am"), vec!["at", "9", "am"]);
        assert_eq!(contents("amazing"), vec!["am", "azing"]);
    }

    #[test]
    fn test_labels_follow_token_end() {
        let labels: LabelMap = [(2, "B-LOC".to_string()), (3, "O".to_string())]
            .into_iter()
            .collect();
        let tokens = Tokenizer::new().tokenize("U.S. x", Some(&labels));

        assert_eq!(tokens[0].content, "U.S");
        assert_eq!(tokens[0].label.as_deref(), Some("B-LOC"));
        assert_eq!(tokens[1].content, ".");
        assert_eq!(tokens[1].label.as_deref(), Some("O"));
        assert_eq!(tokens[2].label, None);
    }

    #[test]
    fn test_tokens_have_no_surrounding_spaces() {
        for token in Tokenizer::new().tokenize("  lead \\n  trail  ", None) {
            assert_eq!(token.content, token.content.trim_matches(' '));
            assert!(!token.content.is_empty());
        }
    }

    #[test]
    fn test_concatenation_matches_text_without_whitespace() {
        let text = "Stocks fell 2.4% on Monday, analysts said. (Reuters)";
        let joined: String = contents(text).concat();
        let expected: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(joined, expected);
    }
}
