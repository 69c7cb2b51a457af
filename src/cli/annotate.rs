//! CLI entry-point for BIO dataset construction.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::corpus,
    nlp::normalize::NameDictionary,
};

/// Args for the `annotate` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Folder of cleaned chapter `.txt` files [default: $DATA_DIR/reddream_chapters_clean].
    #[arg(long)]
    pub chapters: Option<PathBuf>,
    /// Fraction of sentences to annotate.
    #[arg(long, default_value_t = 0.3)]
    pub sample_ratio: f64,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let dictionary = NameDictionary::load(&settings.name_dict)
        .context("annotation needs the name dictionary")?;
    let chapters_dir = args
        .chapters
        .unwrap_or_else(|| settings.join_data("reddream_chapters_clean"));
    let chapters = corpus::load_chapters(&chapters_dir)?;
    let full_text = chapters
        .iter()
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let sentences = corpus::split_sentences(&full_text);
    info!(sentences = sentences.len(), "split corpus");

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let sampled = corpus::sample_sentences(&sentences, args.sample_ratio, &mut rng);
    let annotated: Vec<_> = sampled
        .iter()
        .map(|s| corpus::annotate_sentence(s, dictionary.names()))
        .filter(corpus::has_entity)
        .collect();
    info!(
        sampled = sampled.len(),
        with_entities = annotated.len(),
        top_heads = ?corpus::entity_head_counts(&annotated, 10),
        "annotation finished"
    );

    corpus::write_bio(&settings.join_data("annotated_data.txt"), &annotated)?;
    let (train, dev, test) = corpus::split_dataset(annotated, settings.seed);
    corpus::write_bio(&settings.join_data("train.txt"), &train)?;
    corpus::write_bio(&settings.join_data("dev.txt"), &dev)?;
    corpus::write_bio(&settings.join_data("test.txt"), &test)?;
    Ok(())
}
