//! Person-name recognition backed by the trained CRF.

use std::path::Path;

use crate::{
    error::Result,
    nlp::{
        bio::{self, EntitySpan},
        crf::CrfModel,
    },
};

/// Characters the tagger splits its input on before tagging.
pub const TAGGER_DELIMITERS: &[char] = &['。', '！', '？', '?', '!'];

/// Trait for NER implementations.
pub trait Ner: Send + Sync {
    /// Spans found in one delimiter-free sentence.
    fn spans(&self, sentence: &str) -> Vec<EntitySpan>;

    /// Distinct entity surfaces in `text`, in order of first appearance.
    ///
    /// Never fails: an empty or untaggable input yields an empty list.
    fn entities(&self, text: &str) -> Vec<String> {
        let surfaces = text
            .split(TAGGER_DELIMITERS)
            .filter(|piece| !piece.is_empty())
            .flat_map(|piece| self.spans(piece))
            .map(|span| span.text);
        bio::dedup_ordered(surfaces)
    }
}

/// CRF-backed tagger.
#[derive(Debug, Clone)]
pub struct CrfTagger {
    model: CrfModel,
}

impl CrfTagger {
    pub fn new(model: CrfModel) -> Self {
        Self { model }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(CrfModel::load(path)?))
    }

    pub fn model(&self) -> &CrfModel {
        &self.model
    }
}

impl Ner for CrfTagger {
    fn spans(&self, sentence: &str) -> Vec<EntitySpan> {
        let chars: Vec<char> = sentence.chars().collect();
        let labels = self.model.tag(&chars);
        bio::decode_spans(&chars, &labels)
    }
}
