//! Canonical-name dictionary and longest-containing-match repair.

use std::{
    collections::HashSet,
    fs,
    io::ErrorKind,
    path::Path,
};

use tracing::{info, warn};

use crate::{
    error::{ExtractError, Result},
    nlp::bio,
};

/// Known person names, longest first.
#[derive(Debug, Clone, Default)]
pub struct NameDictionary {
    names: Vec<String>,
    lookup: HashSet<String>,
}

impl NameDictionary {
    /// Build from names in file order. Duplicates and blanks are dropped and
    /// the remainder sorted by character count, longest first; the sort is
    /// stable so equal lengths keep file order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cleaned = names
            .into_iter()
            .map(|n| {
                let n: String = n.into();
                n.trim().to_string()
            })
            .filter(|n| !n.is_empty());
        let mut names = bio::dedup_ordered(cleaned);
        names.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
        let lookup = names.iter().cloned().collect();
        Self { names, lookup }
    }

    /// Load a dictionary file. `.csv` files are read by their `name` column;
    /// anything else is one name per line, optionally followed by
    /// whitespace-separated columns such as a frequency.
    pub fn load(path: &Path) -> Result<Self> {
        let dictionary = if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            Self::new(read_csv_names(path)?)
        } else {
            let text = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
            Self::new(
                text.lines()
                    .map(|line| line.split_whitespace().next().unwrap_or_default().to_string()),
            )
        };
        info!(path = %path.display(), names = dictionary.len(), "loaded name dictionary");
        Ok(dictionary)
    }

    /// Like [`NameDictionary::load`] but an absent file yields an empty
    /// dictionary, which turns normalization into order-preserving dedup.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(ExtractError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "name dictionary missing; normalization disabled");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Longest dictionary name containing `fragment`.
    pub fn longest_containing(&self, fragment: &str) -> Option<&str> {
        if fragment.is_empty() {
            return None;
        }
        self.names
            .iter()
            .find(|name| name.contains(fragment))
            .map(String::as_str)
    }

    /// Repair raw tagger spans against the dictionary.
    ///
    /// A span that is itself a known name and appears verbatim in `sentence`
    /// is kept. Otherwise it is replaced by the longest known name containing
    /// it, whether or not that name appears in the sentence; with no such
    /// name the span is kept as-is. Output is deduplicated in input order.
    pub fn normalize(&self, sentence: &str, entities: &[String]) -> Vec<String> {
        if self.is_empty() {
            return bio::dedup_ordered(entities.iter().cloned());
        }
        let repaired = entities.iter().map(|entity| {
            if self.contains(entity) && sentence.contains(entity.as_str()) {
                entity.clone()
            } else {
                self.longest_containing(entity)
                    .map(str::to_string)
                    .unwrap_or_else(|| entity.clone())
            }
        });
        bio::dedup_ordered(repaired)
    }
}

fn read_csv_names(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim() == "name")
        .ok_or_else(|| ExtractError::Dataset {
            path: path.to_path_buf(),
            line: 1,
            reason: "missing `name` column".to_string(),
        })?;
    let mut names = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if let Some(name) = record.get(column) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn csv_error(path: &Path, err: csv::Error) -> ExtractError {
    let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
    if let csv::ErrorKind::Io(io) = err.kind() {
        if io.kind() == ErrorKind::NotFound {
            return ExtractError::io(path, std::io::Error::from(ErrorKind::NotFound));
        }
    }
    ExtractError::Dataset {
        path: path.to_path_buf(),
        line,
        reason: err.to_string(),
    }
}
