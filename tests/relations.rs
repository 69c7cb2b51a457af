use std::{
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};

use proptest::prelude::*;
use reddream_extract::{
    nlp::{
        bio::EntitySpan,
        ner::Ner,
        normalize::NameDictionary,
        pipeline::{candidate_pairs, Pipeline, Provenance, RelationExtractor, RelationTriple},
        relclf::{mark_sentence, RelationModel, Verdict, NO_RELATION},
        rules::{PairSpan, RelationRules},
    },
    ExtractError,
};
use tempfile::tempdir;

/// Finds a fixed set of names by substring search.
struct ListNer(Vec<&'static str>);

impl Ner for ListNer {
    fn spans(&self, sentence: &str) -> Vec<EntitySpan> {
        let mut found: Vec<(usize, &str)> = self
            .0
            .iter()
            .filter_map(|name| sentence.find(name).map(|pos| (pos, *name)))
            .collect();
        found.sort();
        found
            .into_iter()
            .map(|(pos, name)| {
                let start = sentence[..pos].chars().count();
                EntitySpan {
                    start,
                    end: start + name.chars().count(),
                    text: name.to_string(),
                }
            })
            .collect()
    }
}

/// Returns the same verdict for every input and counts calls.
struct FixedModel {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl FixedModel {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    fn calibrated(label: &str, probability: f64) -> Self {
        Self::new(Verdict::Calibrated {
            label: label.to_string(),
            probability,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RelationModel for FixedModel {
    fn judge(&self, _marked: &str) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn triple(e1: &str, e2: &str, relation: &str, provenance: Provenance) -> RelationTriple {
    RelationTriple {
        entity1: e1.to_string(),
        entity2: e2.to_string(),
        relation: relation.to_string(),
        provenance,
    }
}

#[test]
fn pairs_never_cross_sentence_terminals() {
    let rules = RelationRules::default();
    let model = FixedModel::new(Verdict::LabelOnly("朋友".to_string()));
    let extractor = RelationExtractor::new(&rules, &model, 0.6);
    let text = "贾政是贾宝玉的父亲。王熙凤是贾琏的妻。";
    let triples = extractor.relations(text, &strings(&["贾政", "贾宝玉", "王熙凤", "贾琏"]));
    assert_eq!(
        triples,
        vec![
            triple("贾政", "贾宝玉", "父亲", Provenance::Rule),
            triple("王熙凤", "贾琏", "妻", Provenance::Rule),
        ]
    );
    assert_eq!(model.calls(), 0);
}

#[test]
fn pipeline_extracts_rule_triple_end_to_end() {
    let pipeline = Pipeline::new(
        Box::new(ListNer(vec!["贾政", "贾宝玉"])),
        NameDictionary::new(["贾政", "贾宝玉"]),
        RelationRules::default(),
        Box::new(FixedModel::calibrated(NO_RELATION, 0.9)),
        0.6,
    );
    let extraction = pipeline.extract("贾政是贾宝玉的父亲。");
    assert_eq!(extraction.entities, ["贾政", "贾宝玉"]);
    assert_eq!(
        extraction.triples,
        vec![triple("贾政", "贾宝玉", "父亲", Provenance::Rule)]
    );
}

#[test]
fn pipeline_repairs_fragments_before_pairing() {
    let pipeline = Pipeline::new(
        Box::new(ListNer(vec!["熙凤", "贾琏"])),
        NameDictionary::new(["王熙凤", "贾琏"]),
        RelationRules::default(),
        Box::new(FixedModel::calibrated(NO_RELATION, 0.9)),
        0.6,
    );
    let extraction = pipeline.extract("熙凤是贾琏的妻");
    assert_eq!(extraction.entities, ["王熙凤", "贾琏"]);
    // The repaired name is not in the text, so the pair is skipped.
    assert!(extraction.triples.is_empty());
}

#[test]
fn rules_take_precedence_over_the_model() {
    let rules = RelationRules::default();
    let model = FixedModel::calibrated("母亲", 0.99);
    let extractor = RelationExtractor::new(&rules, &model, 0.6);
    let triples = extractor.relations("贾政是贾宝玉的父亲", &strings(&["贾政", "贾宝玉"]));
    assert_eq!(triples[0].relation, "父亲");
    assert_eq!(triples[0].provenance, Provenance::Rule);
    assert_eq!(model.calls(), 0);
}

#[test]
fn text_between_entities_is_searched_before_the_clause() {
    let rules = RelationRules::new(vec![
        ("妻".to_string(), "妻".to_string()),
        ("父亲".to_string(), "父亲".to_string()),
    ]);
    assert_eq!(rules.classify("贾政父亲宝玉妻子", "贾政", "宝玉"), Some("父亲"));
    assert_eq!(rules.classify("宝玉见贾政的妻和父亲", "宝玉", "贾政"), Some("妻"));
}

#[test]
fn threshold_is_inclusive() {
    let rules = RelationRules::default();
    let entities = strings(&["宝玉", "黛玉"]);
    let text = "宝玉见了黛玉";

    let at = FixedModel::calibrated("朋友", 0.6);
    let triples = RelationExtractor::new(&rules, &at, 0.6).relations(text, &entities);
    assert_eq!(
        triples,
        vec![triple("宝玉", "黛玉", "朋友", Provenance::Statistical)]
    );

    let below = FixedModel::calibrated("朋友", 0.59);
    assert!(RelationExtractor::new(&rules, &below, 0.6)
        .relations(text, &entities)
        .is_empty());
}

#[test]
fn no_relation_is_never_emitted() {
    let rules = RelationRules::default();
    let entities = strings(&["宝玉", "黛玉"]);
    let calibrated = FixedModel::calibrated(NO_RELATION, 0.99);
    assert!(RelationExtractor::new(&rules, &calibrated, 0.0)
        .relations("宝玉见了黛玉", &entities)
        .is_empty());
    let label_only = FixedModel::new(Verdict::LabelOnly(NO_RELATION.to_string()));
    assert!(RelationExtractor::new(&rules, &label_only, 0.0)
        .relations("宝玉见了黛玉", &entities)
        .is_empty());
}

#[test]
fn label_only_models_skip_the_threshold() {
    let rules = RelationRules::default();
    let model = FixedModel::new(Verdict::LabelOnly("朋友".to_string()));
    let triples = RelationExtractor::new(&rules, &model, 1.0)
        .relations("宝玉见了黛玉", &strings(&["宝玉", "黛玉"]));
    assert_eq!(
        triples,
        vec![triple("宝玉", "黛玉", "朋友", Provenance::Statistical)]
    );
}

#[test]
fn short_entity_lists_consult_nothing() {
    let rules = RelationRules::default();
    let model = FixedModel::calibrated("朋友", 0.99);
    let extractor = RelationExtractor::new(&rules, &model, 0.6);
    assert!(extractor.relations("宝玉来了", &strings(&["宝玉"])).is_empty());
    assert!(extractor.relations("", &[]).is_empty());
    assert_eq!(model.calls(), 0);
}

#[test]
fn absent_entities_are_skipped() {
    let rules = RelationRules::default();
    let model = FixedModel::calibrated("朋友", 0.99);
    let triples = RelationExtractor::new(&rules, &model, 0.6)
        .relations("宝玉见了黛玉", &strings(&["宝玉", "袭人"]));
    assert!(triples.is_empty());
    assert_eq!(model.calls(), 0);
}

#[test]
fn marking_replaces_every_occurrence() {
    assert_eq!(
        mark_sentence("宝玉说宝玉和黛玉", "宝玉", "黛玉"),
        "[E1]说[E1]和[E2]"
    );
}

#[test]
fn pair_span_orders_by_position() {
    let text = "黛玉笑宝玉；宝玉哭";
    let span = PairSpan::locate(text, "宝玉", "黛玉").unwrap();
    assert_eq!(span.lo, 0);
    assert_eq!(span.between(text), "笑");
    assert!(!span.crosses_boundary(text));
    assert_eq!(span.segment(text), "黛玉笑宝玉");
    assert!(PairSpan::locate(text, "宝玉", "袭人").is_none());
}

#[test]
fn semicolons_close_clauses() {
    let text = "宝玉笑；黛玉哭";
    let span = PairSpan::locate(text, "宝玉", "黛玉").unwrap();
    assert!(span.crosses_boundary(text));
}

#[test]
fn rules_file_replaces_the_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rules.tsv");
    fs::write(&path, "# custom\n表哥\t表兄\n\n父亲\t父亲\n").unwrap();
    let rules = RelationRules::load(&path).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules.first_match("他是宝玉的表哥"), Some("表兄"));

    fs::write(&path, "表哥 表兄\n").unwrap();
    assert!(matches!(
        RelationRules::load(&path),
        Err(ExtractError::Dataset { line: 1, .. })
    ));
}

proptest! {
    #[test]
    fn candidate_pairs_are_unordered_combinations(n in 0usize..12) {
        let entities: Vec<String> = (0..n).map(|i| format!("e{i}")).collect();
        let pairs: Vec<(&str, &str)> = candidate_pairs(&entities).collect();
        prop_assert_eq!(pairs.len(), n * n.saturating_sub(1) / 2);
        for (a, b) in &pairs {
            prop_assert_ne!(a, b);
            let ia = entities.iter().position(|e| e == a).unwrap();
            let ib = entities.iter().position(|e| e == b).unwrap();
            prop_assert!(ia < ib);
        }
    }
}
