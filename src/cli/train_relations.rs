//! CLI entry-point for relation classifier training.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::dataset,
    nlp::{
        ner::CrfTagger,
        normalize::NameDictionary,
        relclf::{LabeledText, RelationTrainer},
    },
};

/// Args for the `train-relations` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Positive samples, `sentence<TAB>entity1<TAB>entity2<TAB>relation`
    /// [default: $DATA_DIR/relation_train_samples_formatted.txt].
    #[arg(long)]
    pub positives: Option<PathBuf>,
    /// L2 strength [default: RELATION_ALPHA].
    #[arg(long)]
    pub alpha: Option<f64>,
    /// Iteration cap [default: RELATION_MAX_ITERATIONS].
    #[arg(long)]
    pub max_iterations: Option<u64>,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let positives_path = args
        .positives
        .unwrap_or_else(|| settings.join_data("relation_train_samples_formatted.txt"));
    let positives = dataset::read_positives(&positives_path)
        .with_context(|| format!("reading positives from {}", positives_path.display()))?;

    let tagger = CrfTagger::load(&settings.tagger_model)
        .context("negative mining needs a trained tagger; run train-tagger first")?;
    let dictionary = NameDictionary::load_or_empty(&settings.name_dict)?;

    let rows = dataset::build_relation_rows(&positives, &tagger, &dictionary);
    info!(
        rows = rows.len(),
        labels = ?dataset::label_distribution(&rows).into_iter().take(10).collect::<Vec<_>>(),
        "built relation rows"
    );
    let labeled: Vec<LabeledText> = rows.iter().map(|r| r.to_labeled()).collect();
    dataset::write_dataset(&settings.join_data("relation_train_dataset.tsv"), &labeled)?;

    let mut config = settings.relation_config();
    config.alpha = args.alpha.unwrap_or(config.alpha);
    config.max_iterations = args.max_iterations.unwrap_or(config.max_iterations);
    let trained = RelationTrainer::new(config).fit(&labeled)?;
    if let Some(report) = &trained.validation {
        info!("validation report\n{report}");
    }
    trained.model.save(&settings.relation_model)?;
    Ok(())
}
