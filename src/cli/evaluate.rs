//! CLI entry-point for scoring a persisted tagger.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{cli::train_tagger, config::Settings, data::corpus, nlp::crf::CrfModel};

/// Args for the `evaluate` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// BIO file to score [default: $DATA_DIR/test.txt].
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let model = CrfModel::load(&settings.tagger_model)?;
    let input = args.input.unwrap_or_else(|| settings.join_data("test.txt"));
    let data = corpus::read_bio(&input)?;
    println!("{}", train_tagger::score(&model, &data));
    Ok(())
}
