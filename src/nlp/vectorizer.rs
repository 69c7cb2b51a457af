//! Character n-gram TF-IDF vectorizer.

use std::collections::HashMap;

use indexmap::IndexMap;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Vectorizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub min_n: usize,
    pub max_n: usize,
    /// N-grams seen in fewer documents are dropped.
    pub min_df: usize,
    /// Keep only this many n-grams, by corpus frequency. This is also the
    /// width of the dense training matrix.
    pub max_features: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            min_n: 2,
            max_n: 4,
            min_df: 2,
            max_features: 10_000,
        }
    }
}

/// Fitted vocabulary with inverse document frequencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TfidfVectorizer {
    pub fn fit<S: AsRef<str>>(config: VectorizerConfig, documents: &[S]) -> Self {
        let mut df: IndexMap<String, usize> = IndexMap::new();
        let mut total: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let counts = ngram_counts(&config, doc.as_ref());
            for (gram, count) in counts {
                *total.entry(gram.clone()).or_default() += count;
                *df.entry(gram).or_default() += 1;
            }
        }
        let mut kept: Vec<(String, usize)> = df
            .into_iter()
            .filter(|(_, d)| *d >= config.min_df)
            .collect();
        if kept.len() > config.max_features {
            kept.sort_by(|a, b| total[&b.0].cmp(&total[&a.0]).then_with(|| a.0.cmp(&b.0)));
            kept.truncate(config.max_features);
        }
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        let n_docs = documents.len() as f64;
        let idf = kept
            .iter()
            .map(|(_, d)| ((1.0 + n_docs) / (1.0 + *d as f64)).ln() + 1.0)
            .collect();
        let vocabulary: Vec<String> = kept.into_iter().map(|(gram, _)| gram).collect();
        let mut fitted = Self {
            config,
            vocabulary,
            idf,
            index: HashMap::new(),
        };
        fitted.rebuild_index();
        fitted
    }

    /// Restore the lookup table after deserialization. Returns an error
    /// description if the stored vocabulary and idf disagree.
    pub fn validate(&mut self) -> Result<(), String> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "{} vocabulary entries but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        self.rebuild_index();
        if self.index.len() != self.vocabulary.len() {
            return Err("duplicate vocabulary entries".to_string());
        }
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, g)| (g.clone(), i))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Sparse L2-normalised row: `(feature, weight)` sorted by feature.
    pub fn transform(&self, document: &str) -> Vec<(usize, f64)> {
        let mut row: Vec<(usize, f64)> = ngram_counts(&self.config, document)
            .into_iter()
            .filter_map(|(gram, count)| {
                let idx = *self.index.get(&gram)?;
                let tf = 1.0 + (count as f64).ln();
                Some((idx, tf * self.idf[idx]))
            })
            .collect();
        row.sort_by_key(|(idx, _)| *idx);
        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }
        row
    }

    /// Dense matrix for a batch of documents.
    ///
    /// Allocates `documents.len() * self.len()` f64s up front; callers bound
    /// the width through [`VectorizerConfig::max_features`].
    pub fn transform_dense<S: AsRef<str>>(&self, documents: &[S]) -> Array2<f64> {
        debug!(
            rows = documents.len(),
            columns = self.len(),
            bytes = documents.len() * self.len() * std::mem::size_of::<f64>(),
            "allocating dense feature matrix"
        );
        let mut out = Array2::<f64>::zeros((documents.len(), self.len()));
        for (r, doc) in documents.iter().enumerate() {
            for (c, v) in self.transform(doc.as_ref()) {
                out[[r, c]] = v;
            }
        }
        out
    }
}

fn preprocess(document: &str) -> Vec<char> {
    let mut chars = Vec::with_capacity(document.len());
    let mut last_space = false;
    for ch in document.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !last_space {
                chars.push(' ');
            }
            last_space = true;
        } else {
            chars.push(ch);
            last_space = false;
        }
    }
    chars
}

fn ngram_counts(config: &VectorizerConfig, document: &str) -> HashMap<String, usize> {
    let chars = preprocess(document);
    let mut counts = HashMap::new();
    for n in config.min_n..=config.max_n {
        if n == 0 || n > chars.len() {
            continue;
        }
        for window in chars.windows(n) {
            *counts.entry(window.iter().collect::<String>()).or_default() += 1;
        }
    }
    counts
}
