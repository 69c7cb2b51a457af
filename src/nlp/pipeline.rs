//! Sentence → entities → typed triples.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::nlp::{
    ner::Ner,
    normalize::NameDictionary,
    relclf::{self, RelationModel, Verdict, NO_RELATION},
    rules::{PairSpan, RelationRules},
};

/// Default confidence needed to accept a statistical relation.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Which decision path produced a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Rule,
    Statistical,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Statistical => "statistical",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `entity1` appears before `entity2` in the entity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationTriple {
    pub entity1: String,
    pub entity2: String,
    pub relation: String,
    pub provenance: Provenance,
}

/// Every unordered pair once, in list order, no self-pairs.
pub fn candidate_pairs(entities: &[String]) -> impl Iterator<Item = (&str, &str)> + '_ {
    entities.iter().enumerate().flat_map(move |(i, a)| {
        entities[i + 1..]
            .iter()
            .map(move |b| (a.as_str(), b.as_str()))
    })
}

/// Rule-first, model-second pair classifier.
pub struct RelationExtractor<'m> {
    rules: &'m RelationRules,
    model: &'m dyn RelationModel,
    threshold: f64,
}

impl<'m> RelationExtractor<'m> {
    pub fn new(rules: &'m RelationRules, model: &'m dyn RelationModel, threshold: f64) -> Self {
        Self {
            rules,
            model,
            threshold,
        }
    }

    /// Triples for one sentence given its normalized entity list.
    pub fn relations(&self, text: &str, entities: &[String]) -> Vec<RelationTriple> {
        if entities.len() < 2 {
            return Vec::new();
        }
        candidate_pairs(entities)
            .filter_map(|(e1, e2)| self.classify_pair(text, e1, e2))
            .collect()
    }

    fn classify_pair(&self, text: &str, e1: &str, e2: &str) -> Option<RelationTriple> {
        let Some(span) = PairSpan::locate(text, e1, e2) else {
            debug!(e1, e2, "entity not found in text; skipping pair");
            return None;
        };
        if span.crosses_boundary(text) {
            debug!(e1, e2, "pair crosses a sentence boundary; skipping");
            return None;
        }

        if let Some(relation) = self.rules.classify(text, e1, e2) {
            debug!(e1, e2, relation, "[rule]");
            return Some(triple(e1, e2, relation, Provenance::Rule));
        }

        let marked = relclf::mark_sentence(text, e1, e2);
        match self.model.judge(&marked) {
            Verdict::Calibrated { label, probability } => {
                debug!(e1, e2, %label, probability, "[statistical]");
                (label != NO_RELATION && probability >= self.threshold)
                    .then(|| triple(e1, e2, &label, Provenance::Statistical))
            }
            Verdict::LabelOnly(label) => {
                debug!(e1, e2, %label, "[statistical:no-proba]");
                (label != NO_RELATION).then(|| triple(e1, e2, &label, Provenance::Statistical))
            }
        }
    }
}

fn triple(e1: &str, e2: &str, relation: &str, provenance: Provenance) -> RelationTriple {
    RelationTriple {
        entity1: e1.to_string(),
        entity2: e2.to_string(),
        relation: relation.to_string(),
        provenance,
    }
}

/// Everything extraction needs, loaded once and only read afterwards.
pub struct Pipeline {
    ner: Box<dyn Ner>,
    dictionary: NameDictionary,
    rules: RelationRules,
    model: Box<dyn RelationModel>,
    threshold: f64,
}

/// Result for one input string.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub entities: Vec<String>,
    pub triples: Vec<RelationTriple>,
}

impl Pipeline {
    pub fn new(
        ner: Box<dyn Ner>,
        dictionary: NameDictionary,
        rules: RelationRules,
        model: Box<dyn RelationModel>,
        threshold: f64,
    ) -> Self {
        Self {
            ner,
            dictionary,
            rules,
            model,
            threshold,
        }
    }

    /// Tagger output repaired against the dictionary.
    pub fn entities(&self, text: &str) -> Vec<String> {
        let raw = self.ner.entities(text);
        self.dictionary.normalize(text, &raw)
    }

    pub fn extract(&self, text: &str) -> Extraction {
        let entities = self.entities(text);
        let extractor = RelationExtractor::new(&self.rules, self.model.as_ref(), self.threshold);
        let triples = extractor.relations(text, &entities);
        Extraction { entities, triples }
    }
}
