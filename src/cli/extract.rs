//! CLI entry-point for relation extraction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    config::{self, Settings},
    data::corpus::{self, MIN_SENTENCE_CHARS},
    nlp::{
        self,
        pipeline::{Pipeline, Provenance},
    },
};

/// Args for the `extract` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Extract from this text only and print the triples.
    #[arg(long, conflicts_with = "chapters")]
    pub text: Option<String>,
    /// Folder of chapter `.txt` files [default: $DATA_DIR/reddream_chapters].
    #[arg(long)]
    pub chapters: Option<PathBuf>,
    /// Minimum probability for statistical relations [default: PROBA_THRESHOLD].
    #[arg(long)]
    pub threshold: Option<f64>,
    /// CSV destination [default: $OUTPUTS_DIR/all_relations.csv].
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// One output row.
#[derive(Debug, Clone, Serialize)]
pub struct TripleRecord<'a> {
    pub chapter: &'a str,
    pub sentence: &'a str,
    pub entity1: &'a str,
    pub entity2: &'a str,
    pub relation: &'a str,
    pub provenance: Provenance,
}

/// Totals for one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub lines: usize,
    pub lines_with_triples: usize,
    pub triples: usize,
}

impl ExtractStats {
    pub fn pass_rate(&self) -> f64 {
        self.lines_with_triples as f64 / self.lines.max(1) as f64
    }
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let threshold =
        config::validate_threshold(args.threshold.unwrap_or(settings.proba_threshold))?;
    let pipeline = nlp::load_pipeline(&settings, threshold).context("loading extraction models")?;

    if let Some(text) = args.text {
        let extraction = pipeline.extract(&text);
        info!(entities = ?extraction.entities, "normalized entities");
        for t in &extraction.triples {
            println!("({}, {}, {}, {})", t.entity1, t.entity2, t.relation, t.provenance);
        }
        return Ok(());
    }

    let chapters_dir = args
        .chapters
        .unwrap_or_else(|| settings.join_data("reddream_chapters"));
    let output = args
        .output
        .unwrap_or_else(|| settings.join_output("all_relations.csv"));
    let stats = extract_chapters(&pipeline, &chapters_dir, &output)?;
    info!(
        lines = stats.lines,
        kept = stats.lines_with_triples,
        triples = stats.triples,
        pass_rate = %format!("{:.2}%", stats.pass_rate() * 100.0),
        path = %output.display(),
        "extraction finished"
    );
    Ok(())
}

/// Run the pipeline over every line of every chapter and append rows to a
/// CSV at `output`.
pub fn extract_chapters(pipeline: &Pipeline, chapters_dir: &Path, output: &Path) -> Result<ExtractStats> {
    let chapters = corpus::load_chapters(chapters_dir)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("creating {}", output.display()))?;
    let mut stats = ExtractStats::default();
    let total = chapters.len();

    for (idx, (chapter, text)) in chapters.iter().enumerate() {
        for (line_no, raw) in text.lines().enumerate() {
            stats.lines += 1;
            let line = raw.trim();
            if line.chars().count() < MIN_SENTENCE_CHARS {
                continue;
            }
            let extraction = pipeline.extract(line);
            if !extraction.triples.is_empty() {
                stats.lines_with_triples += 1;
            }
            for t in &extraction.triples {
                stats.triples += 1;
                writer.serialize(TripleRecord {
                    chapter,
                    sentence: line,
                    entity1: &t.entity1,
                    entity2: &t.entity2,
                    relation: &t.relation,
                    provenance: t.provenance,
                })?;
            }
            if (line_no + 1) % 100 == 0 {
                info!(%chapter, lines = line_no + 1, "progress");
            }
        }
        info!(%chapter, done = idx + 1, total, "chapter finished");
    }
    writer.flush()?;
    Ok(stats)
}
