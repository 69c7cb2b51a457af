//! Runtime configuration utilities for reddream-extract.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::{
    error::ExtractError,
    nlp::{
        crf::CrfParams,
        pipeline::DEFAULT_THRESHOLD,
        relclf::RelationTrainerConfig,
        vectorizer::VectorizerConfig,
    },
};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder for datasets, chapters and the name dictionary.
    pub data_dir: PathBuf,
    /// Root folder for extraction output and reports.
    pub outputs_dir: PathBuf,
    /// Folder holding persisted model artifacts.
    pub models_dir: PathBuf,
    /// CRFsuite model; its label alphabet sits beside it as `<file>.labels.json`.
    pub tagger_model: PathBuf,
    pub relation_model: PathBuf,
    /// Canonical person-name dictionary (txt/tsv, or csv with a `name` column).
    pub name_dict: PathBuf,
    /// Optional keyword table replacing the built-in one.
    pub rules_file: Option<PathBuf>,
    pub proba_threshold: f64,
    pub crf_c1: f64,
    pub crf_c2: f64,
    pub crf_max_iterations: usize,
    pub relation_alpha: f64,
    pub relation_max_iterations: u64,
    /// Vocabulary cap for the relation vectorizer. Training materializes a
    /// dense `rows x max_features` f64 matrix, so memory grows as
    /// `8 * rows * max_features` bytes: 10 000 rows at the default cap need
    /// about 800 MB. Lower `RELATION_MAX_FEATURES` for larger datasets.
    pub relation_max_features: usize,
    pub seed: u64,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let models_dir = env::var("MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models"));
        let tagger_model = env::var("TAGGER_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| models_dir.join("crf_ner_model.crfsuite"));
        let relation_model = env::var("RELATION_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| models_dir.join("relation_classifier.json"));
        let name_dict = env::var("NAME_DICT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("name_dict.txt"));
        let rules_file = env::var("RULES_FILE").ok().map(PathBuf::from);

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;
        std::fs::create_dir_all(&models_dir).context("creating models dir")?;

        let settings = Self {
            data_dir,
            outputs_dir,
            models_dir,
            tagger_model,
            relation_model,
            name_dict,
            rules_file,
            proba_threshold: env_or("PROBA_THRESHOLD", DEFAULT_THRESHOLD),
            crf_c1: env_or("CRF_C1", 0.1),
            crf_c2: env_or("CRF_C2", 0.1),
            crf_max_iterations: env_or("CRF_MAX_ITERATIONS", 100),
            relation_alpha: env_or("RELATION_ALPHA", 1.0),
            relation_max_iterations: env_or("RELATION_MAX_ITERATIONS", 500),
            relation_max_features: env_or("RELATION_MAX_FEATURES", 10_000),
            seed: env_or("SEED", 42),
        };
        validate_threshold(settings.proba_threshold)?;
        Ok(settings)
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }

    pub fn crf_params(&self) -> CrfParams {
        CrfParams {
            c1: self.crf_c1,
            c2: self.crf_c2,
            max_iterations: self.crf_max_iterations,
            ..CrfParams::default()
        }
    }

    pub fn relation_config(&self) -> RelationTrainerConfig {
        RelationTrainerConfig {
            vectorizer: VectorizerConfig {
                max_features: self.relation_max_features,
                ..VectorizerConfig::default()
            },
            alpha: self.relation_alpha,
            max_iterations: self.relation_max_iterations,
            seed: self.seed,
            ..RelationTrainerConfig::default()
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// unset or unparsable. A rejected value is logged.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "unparsable setting; using default");
            default
        }
    }
}

/// Thresholds are probabilities.
pub fn validate_threshold(threshold: f64) -> Result<f64, ExtractError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ExtractError::Config(format!(
            "probability threshold must lie in [0, 1], got {threshold}"
        )))
    }
}
