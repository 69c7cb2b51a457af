//! Error taxonomy shared by the extraction and training paths.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by library code.
///
/// Only load-time problems (missing or corrupt artifacts, bad datasets,
/// invalid settings) are represented here. Per-sentence and per-pair
/// problems are skipped where they occur and never become errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{kind} artifact not found at {}", path.display())]
    ArtifactMissing { kind: &'static str, path: PathBuf },

    #[error("{kind} artifact at {} is corrupt: {reason}", path.display())]
    ArtifactCorrupt {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("i/o failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset {} line {line}: {reason}", path.display())]
    Dataset {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("training failed: {0}")]
    Training(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
