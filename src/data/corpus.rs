//! Chapter loading, sentence splitting and BIO datasets for the tagger.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    error::{ExtractError, Result},
    nlp::bio::Label,
};

/// One character-labelled sentence.
pub type BioSentence = Vec<(char, Label)>;

/// Sentences at or below this many characters are dropped.
pub const MIN_SENTENCE_CHARS: usize = 5;

/// `*.txt` files directly under `dir`, sorted by file name, with contents.
pub fn load_chapters(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(%err, "skipping unreadable chapter entry");
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    if paths.is_empty() && !dir.is_dir() {
        return Err(ExtractError::io(
            dir,
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }
    paths.sort();
    let mut chapters = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|e| ExtractError::io(&path, e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        chapters.push((name, text));
    }
    info!(dir = %dir.display(), chapters = chapters.len(), "loaded chapters");
    Ok(chapters)
}

/// Split running text on full stops, exclamation and question marks and
/// line breaks; keep trimmed pieces longer than [`MIN_SENTENCE_CHARS`].
pub fn split_sentences(text: &str) -> Vec<String> {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[。！？!?\r\n]").expect("valid regex"));
    PATTERN
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}

/// Greedy longest-first BIO labelling. `names` must already be ordered
/// longest first; an occurrence is only labelled if none of its characters
/// were claimed by an earlier (longer) name.
pub fn annotate_sentence(sentence: &str, names: &[String]) -> BioSentence {
    let chars: Vec<char> = sentence.chars().collect();
    let mut labels = vec![Label::Outside; chars.len()];
    for name in names {
        let needle: Vec<char> = name.chars().collect();
        if needle.is_empty() || needle.len() > chars.len() {
            continue;
        }
        for start in 0..=chars.len() - needle.len() {
            let end = start + needle.len();
            if chars[start..end] != needle[..] {
                continue;
            }
            if labels[start..end].iter().all(|l| *l == Label::Outside) {
                labels[start] = Label::Begin;
                for label in &mut labels[start + 1..end] {
                    *label = Label::Inside;
                }
            }
        }
    }
    chars.into_iter().zip(labels).collect()
}

pub fn has_entity(sentence: &BioSentence) -> bool {
    sentence.iter().any(|(_, l)| *l != Label::Outside)
}

/// Most frequent first characters of annotated entities.
pub fn entity_head_counts(data: &[BioSentence], top: usize) -> Vec<(char, usize)> {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for (ch, _) in data.iter().flatten().filter(|(_, l)| *l == Label::Begin) {
        *counts.entry(*ch).or_default() += 1;
    }
    let mut ranked: Vec<(char, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(top);
    ranked
}

/// Random subset of `ratio` of the sentences (at least one).
pub fn sample_sentences(sentences: &[String], ratio: f64, rng: &mut StdRng) -> Vec<String> {
    if sentences.is_empty() {
        return Vec::new();
    }
    let k = ((sentences.len() as f64 * ratio) as usize).clamp(1, sentences.len());
    sentences.choose_multiple(rng, k).cloned().collect()
}

/// Shuffle and cut into 70 / 15 / 15 train, dev, test.
pub fn split_dataset(
    mut data: Vec<BioSentence>,
    seed: u64,
) -> (Vec<BioSentence>, Vec<BioSentence>, Vec<BioSentence>) {
    data.shuffle(&mut StdRng::seed_from_u64(seed));
    let total = data.len();
    let train_end = (total as f64 * 0.7) as usize;
    let dev_end = train_end + (total as f64 * 0.15) as usize;
    let test = data.split_off(dev_end);
    let dev = data.split_off(train_end);
    (data, dev, test)
}

/// Write `char<TAB>label` lines with a blank line after each sentence.
pub fn write_bio(path: &Path, data: &[BioSentence]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }
    let mut out = String::new();
    for sentence in data {
        for (ch, label) in sentence {
            out.push(*ch);
            out.push('\t');
            out.push_str(label.as_str());
            out.push('\n');
        }
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| ExtractError::io(path, e))?;
    info!(path = %path.display(), sentences = data.len(), "wrote bio file");
    Ok(())
}

/// Read a BIO file. Lines without a tab are skipped; an unknown label is a
/// dataset error.
pub fn read_bio(path: &Path) -> Result<Vec<BioSentence>> {
    let text = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    let mut sentences = Vec::new();
    let mut current = Vec::new();
    for (idx, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if !current.is_empty() {
                sentences.push(std::mem::take(&mut current));
            }
            continue;
        }
        let Some((token, label)) = line.rsplit_once('\t') else {
            continue;
        };
        let mut chars = token.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            continue;
        };
        let label = label.parse::<Label>().map_err(|reason| ExtractError::Dataset {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
        current.push((ch, label));
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    info!(path = %path.display(), sentences = sentences.len(), "read bio file");
    Ok(sentences)
}

/// Separate characters from labels.
pub fn unzip_sentence(sentence: &BioSentence) -> (Vec<char>, Vec<Label>) {
    sentence.iter().copied().unzip()
}
