//! Per-label precision / recall / F1 with a micro average.
//!
//! Counts are tag-level: every mismatching position is one false positive
//! for the predicted label and one false negative for the gold label.

use std::{collections::HashMap, fmt, hash::Hash};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prf {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Prf {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelScore<L> {
    pub label: L,
    pub score: Prf,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report<L> {
    pub labels: Vec<LabelScore<L>>,
    pub micro: Prf,
}

#[derive(Default)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_: usize,
    support: usize,
}

/// Score aligned `(gold, predicted)` pairs over `labels`.
pub fn score_pairs<'a, L, I>(pairs: I, labels: &[L]) -> Report<L>
where
    L: Eq + Hash + Clone + 'a,
    I: IntoIterator<Item = (&'a L, &'a L)>,
{
    let mut counts: HashMap<&L, Counts> = HashMap::new();
    for (gold, pred) in pairs {
        counts.entry(gold).or_default().support += 1;
        if gold == pred {
            counts.entry(gold).or_default().tp += 1;
        } else {
            counts.entry(pred).or_default().fp += 1;
            counts.entry(gold).or_default().fn_ += 1;
        }
    }
    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    let rows = labels
        .iter()
        .map(|label| {
            let c = counts.get(label);
            let (ltp, lfp, lfn, support) =
                c.map(|c| (c.tp, c.fp, c.fn_, c.support)).unwrap_or_default();
            tp += ltp;
            fp += lfp;
            fn_ += lfn;
            LabelScore {
                label: label.clone(),
                score: Prf::from_counts(ltp, lfp, lfn),
                support,
            }
        })
        .collect();
    Report {
        labels: rows,
        micro: Prf::from_counts(tp, fp, fn_),
    }
}

/// Score label sequences position by position. Sequences are zipped, so a
/// shorter prediction only scores its overlap.
pub fn score_sequences<L>(gold: &[Vec<L>], predicted: &[Vec<L>], labels: &[L]) -> Report<L>
where
    L: Eq + Hash + Clone,
{
    let pairs = gold
        .iter()
        .zip(predicted)
        .flat_map(|(g, p)| g.iter().zip(p.iter()));
    score_pairs(pairs, labels)
}

impl<L: fmt::Display> fmt::Display for Report<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.labels {
            writeln!(
                f,
                "{:>6}  P={:.4}  R={:.4}  F1={:.4}  support={}",
                row.label.to_string(),
                row.score.precision,
                row.score.recall,
                row.score.f1,
                row.support
            )?;
        }
        writeln!(f, "{}", "-".repeat(48))?;
        write!(
            f,
            "micro avg  P={:.4}  R={:.4}  F1={:.4}",
            self.micro.precision, self.micro.recall, self.micro.f1
        )
    }
}
