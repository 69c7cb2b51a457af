//! Linear-chain CRF over the BIO person alphabet, trained and decoded with
//! CRFsuite's L-BFGS implementation from the `crfs` crate.
//!
//! A persisted tagger is two files: the CRFsuite model itself and a JSON
//! sidecar (`<model>.labels.json`) holding the label alphabet and the
//! hyperparameters the model was trained with.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use crfs::{
    train::{Lbfgs, Trainer},
    Attribute, Model,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    data::artifact,
    error::{ExtractError, Result},
    nlp::{
        bio::{self, Label},
        features,
    },
};

const ARTIFACT_KIND: &str = "sequence tagger";
const LABELS_KIND: &str = "tagger label alphabet";

/// Training hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct CrfParams {
    /// L1 coefficient.
    pub c1: f64,
    /// L2 coefficient.
    pub c2: f64,
    pub max_iterations: usize,
    /// L-BFGS convergence threshold.
    pub epsilon: f64,
}

impl Default for CrfParams {
    fn default() -> Self {
        Self {
            c1: 0.1,
            c2: 0.1,
            max_iterations: 100,
            epsilon: 1e-5,
        }
    }
}

impl CrfParams {
    fn lbfgs(&self) -> io::Result<Trainer<Lbfgs>> {
        if !(self.c1.is_finite() && self.c2.is_finite() && self.epsilon.is_finite()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "penalties and epsilon must be finite",
            ));
        }
        Trainer::lbfgs()
            .with_c1(self.c1)?
            .with_c2(self.c2)?
            .with_max_iterations(self.max_iterations)?
            .with_epsilon(self.epsilon)
    }
}

/// Sidecar written next to the CRFsuite model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggerMeta {
    pub labels: Vec<Label>,
    pub c1: f64,
    pub c2: f64,
    pub max_iterations: usize,
    pub trained_at: String,
}

/// Where the label alphabet of the model at `model_path` lives.
pub fn labels_path(model_path: &Path) -> PathBuf {
    let mut name = model_path.as_os_str().to_owned();
    name.push(".labels.json");
    PathBuf::from(name)
}

/// Immutable trained tagger.
///
/// Holds the serialized CRFsuite model; a [`crfs::Tagger`] borrows from it
/// for the duration of each [`CrfModel::tag`] call.
#[derive(Clone)]
pub struct CrfModel {
    bytes: Vec<u8>,
    meta: TaggerMeta,
    attributes: u32,
}

impl fmt::Debug for CrfModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrfModel")
            .field("bytes", &self.bytes.len())
            .field("attributes", &self.attributes)
            .field("meta", &self.meta)
            .finish()
    }
}

impl CrfModel {
    /// Validate serialized model bytes against their label alphabet.
    pub fn from_bytes(bytes: Vec<u8>, meta: TaggerMeta) -> std::result::Result<Self, String> {
        if meta.labels != Label::ALL {
            return Err(format!(
                "label alphabet {:?} does not match {:?}",
                meta.labels,
                Label::ALL
            ));
        }
        let attributes = {
            let model = Model::new(&bytes).map_err(|e| e.to_string())?;
            for id in 0..model.num_labels() {
                let name = model
                    .to_label(id)
                    .ok_or_else(|| format!("label id {id} has no name"))?;
                name.parse::<Label>()?;
            }
            model.tagger().map_err(|e| e.to_string())?;
            model.num_attrs()
        };
        Ok(Self {
            bytes,
            meta,
            attributes,
        })
    }

    /// Load a persisted tagger; a missing or malformed file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = artifact::read_bytes(ARTIFACT_KIND, path)?;
        let meta: TaggerMeta = artifact::read_json(LABELS_KIND, &labels_path(path))?;
        let model = Self::from_bytes(bytes, meta).map_err(|reason| ExtractError::ArtifactCorrupt {
            kind: ARTIFACT_KIND,
            path: path.to_path_buf(),
            reason,
        })?;
        info!(path = %path.display(), attributes = model.attributes, "loaded tagger");
        Ok(model)
    }

    /// Persist the model and its label alphabet, each replaced atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        artifact::write_bytes_atomic(ARTIFACT_KIND, path, &self.bytes)?;
        artifact::write_json_atomic(LABELS_KIND, &labels_path(path), &self.meta)
    }

    pub fn meta(&self) -> &TaggerMeta {
        &self.meta
    }

    /// Attributes that kept at least one non-zero weight.
    pub fn attribute_count(&self) -> usize {
        self.attributes as usize
    }

    /// Most likely label sequence for `sentence`, repaired to valid BIO.
    ///
    /// Never fails: a decoding error is logged and the sentence is treated
    /// as entity-free.
    pub fn tag(&self, sentence: &[char]) -> Vec<Label> {
        if sentence.is_empty() {
            return Vec::new();
        }
        match self.try_tag(sentence) {
            Ok(labels) => labels,
            Err(err) => {
                warn!(%err, len = sentence.len(), "tagging failed; treating sentence as entity-free");
                vec![Label::Outside; sentence.len()]
            }
        }
    }

    fn try_tag(&self, sentence: &[char]) -> io::Result<Vec<Label>> {
        let model = Model::new(&self.bytes)?;
        let tagger = model.tagger()?;
        let names = tagger.tag(&encode(sentence))?;
        let mut labels: Vec<Label> = names
            .iter()
            .map(|name| name.parse().unwrap_or(Label::Outside))
            .collect();
        bio::repair_labels(&mut labels);
        Ok(labels)
    }
}

/// One attribute list per character, unit-valued.
pub fn encode(sentence: &[char]) -> Vec<Vec<Attribute>> {
    features::sentence_features(sentence)
        .iter()
        .map(|f| f.attributes().into_iter().map(Attribute::from).collect())
        .collect()
}

/// Fits a [`CrfModel`] from labelled sentences.
#[derive(Debug, Clone, Default)]
pub struct CrfTrainer {
    params: CrfParams,
}

impl CrfTrainer {
    pub fn new(params: CrfParams) -> Result<Self> {
        params
            .lbfgs()
            .map_err(|e| ExtractError::Config(format!("crf parameters: {e}")))?;
        Ok(Self { params })
    }

    pub fn params(&self) -> CrfParams {
        self.params
    }

    /// Train on `sentences`. Pairs whose lengths disagree, and empty
    /// sentences, are skipped.
    pub fn train(&self, sentences: &[(Vec<char>, Vec<Label>)]) -> Result<CrfModel> {
        let mut trainer = self
            .params
            .lbfgs()
            .map_err(|e| ExtractError::Config(format!("crf parameters: {e}")))?;

        let mut used = 0usize;
        for (chars, labels) in sentences {
            if chars.is_empty() || chars.len() != labels.len() {
                debug!(chars = chars.len(), labels = labels.len(), "skipping unusable sentence");
                continue;
            }
            let yseq: Vec<&str> = labels.iter().map(Label::as_str).collect();
            trainer
                .append(&encode(chars), &yseq)
                .map_err(|e| ExtractError::Training(e.to_string()))?;
            used += 1;
        }
        if used == 0 {
            return Err(ExtractError::Training(
                "no usable training sentences".to_string(),
            ));
        }
        info!(
            sentences = used,
            c1 = self.params.c1,
            c2 = self.params.c2,
            max_iterations = self.params.max_iterations,
            "training crf"
        );

        let scratch = tempfile::NamedTempFile::new()
            .map_err(|e| ExtractError::io(std::env::temp_dir(), e))?;
        trainer
            .train(scratch.path())
            .map_err(|e| ExtractError::Training(e.to_string()))?;
        let bytes = std::fs::read(scratch.path()).map_err(|e| ExtractError::io(scratch.path(), e))?;

        let meta = TaggerMeta {
            labels: Label::ALL.to_vec(),
            c1: self.params.c1,
            c2: self.params.c2,
            max_iterations: self.params.max_iterations,
            trained_at: chrono::Utc::now().to_rfc3339(),
        };
        let model = CrfModel::from_bytes(bytes, meta).map_err(ExtractError::Training)?;
        info!(attributes = model.attributes, "trained crf");
        Ok(model)
    }
}
