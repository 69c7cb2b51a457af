//! Command-line interface wiring for reddream-extract.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod annotate;
pub mod evaluate;
pub mod extract;
pub mod tag;
pub mod train_relations;
pub mod train_tagger;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Character and relation extraction for a classical novel", long_about = None)]
pub struct Cli {
    /// Log per-pair decisions and training progress.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Default tracing directive when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Dispatch the selected sub-command.
    pub fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Annotate(args) => annotate::run(args, settings),
            Commands::TrainTagger(args) => train_tagger::run(args, settings),
            Commands::Evaluate(args) => evaluate::run(args, settings),
            Commands::TrainRelations(args) => train_relations::run(args, settings),
            Commands::Tag(args) => tag::run(args, settings),
            Commands::Extract(args) => extract::run(args, settings),
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build BIO-labelled train/dev/test files from chapters and the name dictionary.
    Annotate(annotate::Args),
    /// Fit the CRF tagger and report held-out scores.
    TrainTagger(train_tagger::Args),
    /// Score a persisted tagger against a BIO file.
    Evaluate(evaluate::Args),
    /// Build the relation dataset and fit the relation classifier.
    TrainRelations(train_relations::Args),
    /// Print normalized person entities found in a text.
    Tag(tag::Args),
    /// Extract relation triples from a text or from every chapter.
    Extract(extract::Args),
}
