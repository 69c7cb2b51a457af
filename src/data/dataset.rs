//! Relation-classifier training rows: curated positives plus mined negatives.

use std::{collections::HashMap, fs, path::Path};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::{
    error::{ExtractError, Result},
    nlp::{
        ner::Ner,
        normalize::NameDictionary,
        pipeline::candidate_pairs,
        relclf::{self, LabeledText, NO_RELATION},
    },
};

/// A known relation between two entities of a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositiveSample {
    pub entity1: String,
    pub entity2: String,
    pub relation: String,
}

/// One training row before marking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRow {
    pub sentence: String,
    pub entity1: String,
    pub entity2: String,
    pub label: String,
}

impl RelationRow {
    pub fn to_labeled(&self) -> LabeledText {
        LabeledText {
            text: relclf::mark_sentence(&self.sentence, &self.entity1, &self.entity2),
            label: self.label.clone(),
        }
    }
}

/// Positives keyed by sentence, in first-seen order, without duplicates.
pub type PositivesBySentence = IndexMap<String, Vec<PositiveSample>>;

/// Read `sentence<TAB>entity1<TAB>entity2<TAB>relation` lines; lines with
/// any other column count are skipped.
pub fn read_positives(path: &Path) -> Result<PositivesBySentence> {
    let text = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    let mut grouped = PositivesBySentence::new();
    let mut skipped = 0usize;
    for line in text.lines() {
        let parts: Vec<&str> = line.split('\t').collect();
        let [sentence, e1, e2, relation] = parts.as_slice() else {
            skipped += 1;
            continue;
        };
        let sample = PositiveSample {
            entity1: e1.to_string(),
            entity2: e2.to_string(),
            relation: relation.to_string(),
        };
        let bucket = grouped.entry(sentence.to_string()).or_default();
        if !bucket.contains(&sample) {
            bucket.push(sample);
        }
    }
    if skipped > 0 {
        warn!(skipped, path = %path.display(), "skipped malformed positive lines");
    }
    info!(sentences = grouped.len(), "grouped positive samples");
    Ok(grouped)
}

/// Positives for each sentence, followed by up to as many (at least one)
/// co-occurring entity pairs that are not known positives in either order,
/// labelled [`NO_RELATION`].
pub fn build_relation_rows(
    positives: &PositivesBySentence,
    ner: &dyn Ner,
    dictionary: &NameDictionary,
) -> Vec<RelationRow> {
    let mut rows = Vec::new();
    for (sentence, samples) in positives {
        for sample in samples {
            rows.push(RelationRow {
                sentence: sentence.clone(),
                entity1: sample.entity1.clone(),
                entity2: sample.entity2.clone(),
                label: sample.relation.clone(),
            });
        }
        let entities = dictionary.normalize(sentence, &ner.entities(sentence));
        let is_positive = |a: &str, b: &str| {
            samples.iter().any(|s| {
                (s.entity1 == a && s.entity2 == b) || (s.entity1 == b && s.entity2 == a)
            })
        };
        let cap = samples.len().max(1);
        let negatives = candidate_pairs(&entities)
            .filter(|(a, b)| !is_positive(*a, *b))
            .take(cap)
            .map(|(a, b)| RelationRow {
                sentence: sentence.clone(),
                entity1: a.to_string(),
                entity2: b.to_string(),
                label: NO_RELATION.to_string(),
            });
        rows.extend(negatives);
    }
    rows
}

/// Row count per label, most frequent first.
pub fn label_distribution(rows: &[RelationRow]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.label.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, n)| (label.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Persist `marked_sentence<TAB>label` lines for reproducibility.
pub fn write_dataset(path: &Path, rows: &[LabeledText]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!("{}\t{}\n", row.text, row.label));
    }
    fs::write(path, out).map_err(|e| ExtractError::io(path, e))?;
    info!(path = %path.display(), rows = rows.len(), "wrote relation dataset");
    Ok(())
}
