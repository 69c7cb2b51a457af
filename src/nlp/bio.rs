//! BIO label alphabet and span decoding.

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Person-entity label alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "B-PER")]
    Begin,
    #[serde(rename = "I-PER")]
    Inside,
    #[serde(rename = "O")]
    Outside,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Begin, Label::Inside, Label::Outside];
    pub const COUNT: usize = 3;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Begin => "B-PER",
            Self::Inside => "I-PER",
            Self::Outside => "O",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Begin => 0,
            Self::Inside => 1,
            Self::Outside => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B-PER" => Ok(Self::Begin),
            "I-PER" => Ok(Self::Inside),
            "O" => Ok(Self::Outside),
            other => Err(format!("unknown label `{other}`")),
        }
    }
}

/// A decoded entity run, in character offsets `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Rewrite every Inside that does not continue an entity into a Begin.
///
/// After this pass no Inside follows an Outside or opens a sequence.
pub fn repair_labels(labels: &mut [Label]) {
    let mut prev = Label::Outside;
    for label in labels.iter_mut() {
        if *label == Label::Inside && prev == Label::Outside {
            *label = Label::Begin;
        }
        prev = *label;
    }
}

/// Decode maximal `B I*` runs into spans, left to right.
///
/// An Inside with no open span starts a new one. `chars` and `labels` are
/// zipped, so a length mismatch truncates to the shorter of the two.
pub fn decode_spans(chars: &[char], labels: &[Label]) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let len = chars.len().min(labels.len());
    for (idx, label) in labels.iter().take(len).enumerate() {
        match (label, open) {
            (Label::Begin, Some(start)) => {
                spans.push(span(chars, start, idx));
                open = Some(idx);
            }
            (Label::Begin, None) | (Label::Inside, None) => open = Some(idx),
            (Label::Inside, Some(_)) => {}
            (Label::Outside, Some(start)) => {
                spans.push(span(chars, start, idx));
                open = None;
            }
            (Label::Outside, None) => {}
        }
    }
    if let Some(start) = open {
        spans.push(span(chars, start, len));
    }
    spans
}

fn span(chars: &[char], start: usize, end: usize) -> EntitySpan {
    EntitySpan {
        start,
        end,
        text: chars[start..end].iter().collect(),
    }
}

/// Order-preserving dedup on surface strings.
pub fn dedup_ordered<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
