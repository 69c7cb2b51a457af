//! Character-window features shared by tagger training and inference.

use serde::{Deserialize, Serialize};

/// A single character position with its derived class flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharToken {
    pub ch: char,
    pub is_digit: bool,
    pub is_alpha: bool,
    pub is_space: bool,
}

impl CharToken {
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            is_digit: ch.is_numeric(),
            is_alpha: ch.is_alphabetic(),
            is_space: ch.is_whitespace(),
        }
    }
}

/// What sits next to the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbour {
    /// Position -1 does not exist.
    BeginOfSentence,
    /// Position +1 does not exist.
    EndOfSentence,
    Token(CharToken),
}

/// Fixed-shape feature record for one position.
///
/// Training and inference both go through [`CharFeatures::attributes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharFeatures {
    pub current: CharToken,
    pub prev: Neighbour,
    pub next: Neighbour,
}

impl CharFeatures {
    /// Render the record into the sparse attribute names the CRF weights are
    /// keyed on. False flags produce no attribute.
    pub fn attributes(&self) -> Vec<String> {
        let mut attrs = Vec::with_capacity(12);
        attrs.push("bias".to_string());
        push_token(&mut attrs, "", &self.current);
        match self.prev {
            Neighbour::Token(tok) => push_token(&mut attrs, "-1:", &tok),
            _ => attrs.push("BOS".to_string()),
        }
        match self.next {
            Neighbour::Token(tok) => push_token(&mut attrs, "+1:", &tok),
            _ => attrs.push("EOS".to_string()),
        }
        attrs
    }
}

fn push_token(attrs: &mut Vec<String>, prefix: &str, tok: &CharToken) {
    attrs.push(format!("{prefix}ch={}", tok.ch));
    if tok.is_digit {
        attrs.push(format!("{prefix}is_digit"));
    }
    if tok.is_alpha {
        attrs.push(format!("{prefix}is_alpha"));
    }
    if tok.is_space {
        attrs.push(format!("{prefix}is_space"));
    }
}

/// Features for position `i` of `sentence`.
///
/// # Panics
/// Panics if `i` is out of bounds.
pub fn extract(sentence: &[char], i: usize) -> CharFeatures {
    let prev = if i == 0 {
        Neighbour::BeginOfSentence
    } else {
        Neighbour::Token(CharToken::new(sentence[i - 1]))
    };
    let next = match sentence.get(i + 1) {
        Some(&ch) => Neighbour::Token(CharToken::new(ch)),
        None => Neighbour::EndOfSentence,
    };
    CharFeatures {
        current: CharToken::new(sentence[i]),
        prev,
        next,
    }
}

/// Features for every position of `sentence`.
pub fn sentence_features(sentence: &[char]) -> Vec<CharFeatures> {
    (0..sentence.len()).map(|i| extract(sentence, i)).collect()
}
