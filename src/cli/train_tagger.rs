//! CLI entry-point for CRF training.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::corpus::{self, BioSentence},
    nlp::{
        bio::Label,
        crf::{CrfModel, CrfTrainer},
        eval::{self, Report},
    },
};

/// Args for the `train-tagger` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// L1 penalty [default: CRF_C1].
    #[arg(long)]
    pub c1: Option<f64>,
    /// L2 penalty [default: CRF_C2].
    #[arg(long)]
    pub c2: Option<f64>,
    /// Iteration cap [default: CRF_MAX_ITERATIONS].
    #[arg(long)]
    pub max_iterations: Option<usize>,
    /// Folder holding train.txt, dev.txt and test.txt [default: $DATA_DIR].
    #[arg(long)]
    pub dataset_dir: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let mut params = settings.crf_params();
    params.c1 = args.c1.unwrap_or(params.c1);
    params.c2 = args.c2.unwrap_or(params.c2);
    params.max_iterations = args.max_iterations.unwrap_or(params.max_iterations);

    let dir = args.dataset_dir.unwrap_or_else(|| settings.data_dir.clone());
    let train = corpus::read_bio(&dir.join("train.txt")).context("loading training split")?;
    let dev = corpus::read_bio(&dir.join("dev.txt")).context("loading dev split")?;
    let test = corpus::read_bio(&dir.join("test.txt")).context("loading test split")?;
    info!(
        train = train.len(),
        dev = dev.len(),
        test = test.len(),
        "loaded bio splits"
    );

    let sentences: Vec<_> = train.iter().map(corpus::unzip_sentence).collect();
    let model = CrfTrainer::new(params)?.train(&sentences)?;

    let dev_report = score(&model, &dev);
    info!(micro_f1 = dev_report.micro.f1, "dev evaluation");
    let report = score(&model, &test);
    println!("{report}");

    let report_path = settings.join_output("model_evaluation_report.txt");
    let body = format!(
        "CRF evaluation report ({})\nc1={} c2={} max_iterations={}\n{}\n{report}\n",
        Utc::now().to_rfc3339(),
        params.c1,
        params.c2,
        params.max_iterations,
        "=".repeat(50),
    );
    fs::write(&report_path, body)
        .with_context(|| format!("writing {}", report_path.display()))?;
    info!(path = %report_path.display(), "wrote evaluation report");

    model.save(&settings.tagger_model)?;
    Ok(())
}

/// Tag every sentence of `data` and compare against its gold labels.
pub fn score(model: &CrfModel, data: &[BioSentence]) -> Report<Label> {
    let (gold, predicted): (Vec<Vec<Label>>, Vec<Vec<Label>>) = data
        .iter()
        .map(|sentence| {
            let (chars, labels) = corpus::unzip_sentence(sentence);
            (labels, model.tag(&chars))
        })
        .unzip();
    eval::score_sequences(&gold, &predicted, &Label::ALL)
}
