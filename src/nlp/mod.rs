//! Entity tagging and relation inference.

pub mod bio;
pub mod crf;
pub mod eval;
pub mod features;
pub mod ner;
pub mod normalize;
pub mod pipeline;
pub mod relclf;
pub mod rules;
pub mod vectorizer;

use tracing::info;

use crate::{
    config::Settings,
    error::Result,
    nlp::{
        ner::CrfTagger, normalize::NameDictionary, pipeline::Pipeline,
        relclf::LogisticRelationModel, rules::RelationRules,
    },
};

/// Keyword table from `RULES_FILE` when set, otherwise the built-in one.
pub fn load_rules(settings: &Settings) -> Result<RelationRules> {
    match &settings.rules_file {
        Some(path) => RelationRules::load(path),
        None => Ok(RelationRules::default()),
    }
}

/// Load every artifact extraction needs. Any missing model aborts here,
/// before the first sentence is read.
pub fn load_pipeline(settings: &Settings, threshold: f64) -> Result<Pipeline> {
    let tagger = CrfTagger::load(&settings.tagger_model)?;
    let model = LogisticRelationModel::load(&settings.relation_model)?;
    let dictionary = NameDictionary::load_or_empty(&settings.name_dict)?;
    let rules = load_rules(settings)?;
    info!(
        threshold,
        keywords = rules.len(),
        names = dictionary.len(),
        "extraction pipeline ready"
    );
    Ok(Pipeline::new(
        Box::new(tagger),
        dictionary,
        rules,
        Box::new(model),
        threshold,
    ))
}
