//! Statistical relation classification over entity-marked sentences.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use linfa::{dataset::DatasetBase, prelude::Fit};
use linfa_logistic::MultiLogisticRegression;
use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    data::artifact,
    error::{ExtractError, Result},
    nlp::{
        eval::{self, Report},
        vectorizer::{TfidfVectorizer, VectorizerConfig},
    },
};

/// Reserved label for pairs with no relation.
pub const NO_RELATION: &str = "无关系";

pub const E1_MARKER: &str = "[E1]";
pub const E2_MARKER: &str = "[E2]";

const ARTIFACT_KIND: &str = "relation classifier";

/// Replace every occurrence of the two entities with placeholders.
/// `e1` is substituted first.
pub fn mark_sentence(sentence: &str, e1: &str, e2: &str) -> String {
    let marked = if e1.is_empty() {
        sentence.to_string()
    } else {
        sentence.replace(e1, E1_MARKER)
    };
    if e2.is_empty() {
        marked
    } else {
        marked.replace(e2, E2_MARKER)
    }
}

/// What a relation model can say about one marked sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Best label together with its probability.
    Calibrated { label: String, probability: f64 },
    /// Best label from a model without a probability interface.
    LabelOnly(String),
}

impl Verdict {
    pub fn label(&self) -> &str {
        match self {
            Self::Calibrated { label, .. } | Self::LabelOnly(label) => label,
        }
    }
}

/// Trait for relation classifiers.
pub trait RelationModel: Send + Sync {
    fn judge(&self, marked: &str) -> Verdict;
}

/// A marked sentence with its gold relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledText {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationArtifact {
    pub labels: Vec<String>,
    pub vectorizer: TfidfVectorizer,
    /// One row per vocabulary entry, one column per label.
    pub weights: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

/// Multinomial logistic model over TF-IDF character n-grams.
#[derive(Debug, Clone)]
pub struct LogisticRelationModel {
    labels: Vec<String>,
    vectorizer: TfidfVectorizer,
    weights: Array2<f64>,
    intercept: Array1<f64>,
}

impl LogisticRelationModel {
    pub fn from_artifact(artifact: RelationArtifact) -> std::result::Result<Self, String> {
        let RelationArtifact {
            labels,
            mut vectorizer,
            weights,
            intercept,
        } = artifact;
        vectorizer.validate()?;
        let n_classes = labels.len();
        if n_classes < 2 {
            return Err(format!("need at least two labels, found {n_classes}"));
        }
        if intercept.len() != n_classes {
            return Err(format!(
                "{} intercepts for {n_classes} labels",
                intercept.len()
            ));
        }
        if weights.len() != vectorizer.len() {
            return Err(format!(
                "{} weight rows for {} features",
                weights.len(),
                vectorizer.len()
            ));
        }
        if let Some(bad) = weights.iter().position(|row| row.len() != n_classes) {
            return Err(format!("weight row {bad} does not have {n_classes} columns"));
        }
        let flat: Vec<f64> = weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((vectorizer.len(), n_classes), flat)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            labels,
            vectorizer,
            weights,
            intercept: Array1::from(intercept),
        })
    }

    pub fn to_artifact(&self) -> RelationArtifact {
        RelationArtifact {
            labels: self.labels.clone(),
            vectorizer: self.vectorizer.clone(),
            weights: self.weights.outer_iter().map(|row| row.to_vec()).collect(),
            intercept: self.intercept.to_vec(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let artifact: RelationArtifact = artifact::read_json(ARTIFACT_KIND, path)?;
        let model = Self::from_artifact(artifact).map_err(|reason| ExtractError::ArtifactCorrupt {
            kind: ARTIFACT_KIND,
            path: path.to_path_buf(),
            reason,
        })?;
        info!(
            path = %path.display(),
            labels = model.labels.len(),
            features = model.vectorizer.len(),
            "loaded relation classifier"
        );
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        artifact::write_json_atomic(ARTIFACT_KIND, path, &self.to_artifact())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Softmax distribution over [`Self::labels`].
    pub fn probabilities(&self, marked: &str) -> Vec<f64> {
        let mut logits = self.intercept.clone();
        for (feature, value) in self.vectorizer.transform(marked) {
            logits.scaled_add(value, &self.weights.row(feature));
        }
        let max = logits.fold(f64::NEG_INFINITY, |m, v| m.max(*v));
        let exp = logits.mapv(|v| (v - max).exp());
        let total = exp.sum();
        exp.iter().map(|v| v / total).collect()
    }

    pub fn predict(&self, marked: &str) -> &str {
        let probs = self.probabilities(marked);
        &self.labels[best_index(&probs)]
    }
}

impl RelationModel for LogisticRelationModel {
    fn judge(&self, marked: &str) -> Verdict {
        let probs = self.probabilities(marked);
        let best = best_index(&probs);
        Verdict::Calibrated {
            label: self.labels[best].clone(),
            probability: probs[best],
        }
    }
}

fn best_index(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = idx;
        }
    }
    best
}

/// Settings for [`RelationTrainer`].
#[derive(Debug, Clone, Copy)]
pub struct RelationTrainerConfig {
    pub vectorizer: VectorizerConfig,
    /// L2 strength passed to the logistic regression.
    pub alpha: f64,
    pub max_iterations: u64,
    /// Fraction of rows held out for the validation report.
    pub holdout: f64,
    /// Replicate minority-class rows up to the majority count.
    pub balance: bool,
    pub seed: u64,
}

impl Default for RelationTrainerConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig::default(),
            alpha: 1.0,
            max_iterations: 500,
            holdout: 0.15,
            balance: true,
            seed: 42,
        }
    }
}

pub struct TrainedRelations {
    pub model: LogisticRelationModel,
    /// Present when the holdout split contained more than one label.
    pub validation: Option<Report<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationTrainer {
    config: RelationTrainerConfig,
}

impl RelationTrainer {
    pub fn new(config: RelationTrainerConfig) -> Self {
        Self { config }
    }

    pub fn fit(&self, rows: &[LabeledText]) -> Result<TrainedRelations> {
        let row_labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        let (train_idx, val_idx) =
            stratified_split(&row_labels, self.config.holdout, self.config.seed);
        let train: Vec<&LabeledText> = train_idx.iter().map(|&i| &rows[i]).collect();
        let held: Vec<&LabeledText> = val_idx.iter().map(|&i| &rows[i]).collect();

        let labels: Vec<String> = train
            .iter()
            .map(|r| r.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if labels.len() < 2 {
            return Err(ExtractError::Training(format!(
                "need at least two relation labels in the training split, found {}",
                labels.len()
            )));
        }

        let texts: Vec<&str> = train.iter().map(|r| r.text.as_str()).collect();
        let vectorizer = TfidfVectorizer::fit(self.config.vectorizer, &texts);
        if vectorizer.is_empty() {
            return Err(ExtractError::Training(
                "vectorizer vocabulary is empty".to_string(),
            ));
        }

        let balanced: Vec<&LabeledText> = if self.config.balance {
            let factors = replication_factors(train.iter().map(|r| r.label.as_str()));
            train
                .iter()
                .flat_map(|r| {
                    let copies = factors.get(r.label.as_str()).copied().unwrap_or(1);
                    std::iter::repeat(*r).take(copies)
                })
                .collect()
        } else {
            train.clone()
        };
        // The logistic loss sums over rows; keep the per-row penalty fixed.
        let alpha = self.config.alpha * balanced.len() as f64 / train.len() as f64;

        let texts: Vec<&str> = balanced.iter().map(|r| r.text.as_str()).collect();
        let x = vectorizer.transform_dense(&texts);
        let y: Array1<usize> = balanced
            .iter()
            .map(|r| labels.binary_search(&r.label).unwrap_or_default())
            .collect();
        info!(
            rows = train.len(),
            balanced = balanced.len(),
            holdout = held.len(),
            features = vectorizer.len(),
            labels = labels.len(),
            "training relation classifier"
        );

        let dataset = DatasetBase::new(x, y);
        let fitted = MultiLogisticRegression::default()
            .alpha(alpha)
            .max_iterations(self.config.max_iterations)
            .fit(&dataset)
            .map_err(|e| ExtractError::Training(e.to_string()))?;

        let n_features = vectorizer.len();
        let params = fitted.params();
        let weights = if params.dim() == (n_features, labels.len()) {
            params.to_owned()
        } else if params.dim() == (labels.len(), n_features) {
            params.t().to_owned()
        } else {
            return Err(ExtractError::Training(format!(
                "unexpected parameter shape {:?}",
                params.dim()
            )));
        };
        let model = LogisticRelationModel {
            labels,
            vectorizer,
            weights,
            intercept: fitted.intercept().to_owned(),
        };

        let validation = validate(&model, &held);
        Ok(TrainedRelations { model, validation })
    }
}

/// Split row indices into `(train, holdout)` after a seeded shuffle.
///
/// When every label has at least two rows, each label contributes
/// `ceil(count * holdout)` rows to the holdout while keeping at least one in
/// training. Otherwise the first `ceil(n * holdout)` shuffled rows are held
/// out. A holdout that would swallow everything is skipped.
pub fn stratified_split(labels: &[&str], holdout: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    if holdout <= 0.0 || labels.is_empty() {
        return (order, Vec::new());
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_default() += 1;
    }
    if counts.values().all(|&n| n >= 2) {
        let mut quota: BTreeMap<&str, usize> = counts
            .iter()
            .map(|(label, &n)| (*label, ((n as f64 * holdout).ceil() as usize).min(n - 1)))
            .collect();
        let (held, train): (Vec<usize>, Vec<usize>) = order.into_iter().partition(|&i| {
            match quota.get_mut(labels[i]) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        });
        return (train, held);
    }

    let n_val = (labels.len() as f64 * holdout).ceil() as usize;
    if n_val == 0 || n_val >= labels.len() {
        return (order, Vec::new());
    }
    let train = order.split_off(n_val);
    (train, order)
}

/// Copies per row that bring every class close to the majority count,
/// i.e. inverse class frequency rounded to a whole number of rows.
pub fn replication_factors<'a, I>(labels: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.to_string()).or_default() += 1;
    }
    let majority = counts.values().copied().max().unwrap_or(1);
    counts
        .into_iter()
        .map(|(label, n)| {
            let factor = (majority as f64 / n as f64).round() as usize;
            (label, factor.max(1))
        })
        .collect()
}

fn validate(model: &LogisticRelationModel, held: &[&LabeledText]) -> Option<Report<String>> {
    let gold: Vec<String> = held.iter().map(|r| r.label.clone()).collect();
    let distinct: BTreeSet<&String> = gold.iter().collect();
    if distinct.len() < 2 {
        if !held.is_empty() {
            warn!("holdout holds a single label; skipping validation report");
        }
        return None;
    }
    let predicted: Vec<String> = held
        .iter()
        .map(|r| model.predict(&r.text).to_string())
        .collect();
    let mut labels: Vec<String> = model.labels().to_vec();
    for label in distinct {
        if !labels.contains(label) {
            labels.push(label.clone());
        }
    }
    Some(eval::score_pairs(gold.iter().zip(predicted.iter()), &labels))
}
