use std::fs;

use reddream_extract::{
    nlp::{
        bio::Label,
        crf::{labels_path, CrfModel, CrfParams, CrfTrainer},
    },
    ExtractError,
};
use tempfile::tempdir;

fn training_set() -> Vec<(Vec<char>, Vec<Label>)> {
    use Label::*;
    let rows = [
        ("贾政说话了", vec![Begin, Inside, Outside, Outside, Outside]),
        ("宝玉笑了", vec![Begin, Inside, Outside, Outside]),
        ("他见贾政", vec![Outside, Outside, Begin, Inside]),
        ("我说宝玉好", vec![Outside, Outside, Begin, Inside, Outside]),
        ("天下雨了", vec![Outside, Outside, Outside, Outside]),
    ];
    rows.iter()
        .map(|(s, l)| (s.chars().collect(), l.clone()))
        .collect()
}

fn trained() -> CrfModel {
    CrfTrainer::new(CrfParams {
        c1: 0.0,
        c2: 0.01,
        max_iterations: 100,
        epsilon: 1e-7,
    })
    .unwrap()
    .train(&training_set())
    .unwrap()
}

#[test]
fn trained_model_recovers_training_labels() {
    let model = trained();
    for (chars, gold) in &training_set() {
        assert_eq!(&model.tag(chars), gold, "sentence {:?}", chars);
    }
    assert_eq!(model.meta().labels, Label::ALL);
    assert!(model.attribute_count() > 0);
}

#[test]
fn tag_output_is_well_formed() {
    let model = trained();
    let labels = model.tag(&"甲乙宝玉丙丁贾政".chars().collect::<Vec<_>>());
    assert_eq!(labels.len(), 8);
    assert_ne!(labels[0], Label::Inside);
    for pair in labels.windows(2) {
        assert!(!(pair[0] == Label::Outside && pair[1] == Label::Inside));
    }
    assert!(model.tag(&[]).is_empty());
}

#[test]
fn negative_or_non_finite_penalty_is_rejected() {
    for c1 in [-1.0, f64::NAN] {
        let err = CrfTrainer::new(CrfParams {
            c1,
            ..CrfParams::default()
        })
        .unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }
    assert!(CrfTrainer::new(CrfParams {
        max_iterations: 0,
        ..CrfParams::default()
    })
    .is_err());
}

#[test]
fn empty_training_set_is_an_error() {
    let err = CrfTrainer::default().train(&[]).unwrap_err();
    assert!(matches!(err, ExtractError::Training(_)));

    let mismatched = vec![("宝玉".chars().collect(), vec![Label::Begin])];
    let err = CrfTrainer::default().train(&mismatched).unwrap_err();
    assert!(matches!(err, ExtractError::Training(_)));
}

#[test]
fn saved_model_tags_identically_after_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("models").join("tagger.crfsuite");
    let model = trained();
    model.save(&path).unwrap();
    assert!(labels_path(&path).exists());
    assert!(!dir.path().join("models").join("tagger.crfsuite.tmp").exists());

    let reloaded = CrfModel::load(&path).unwrap();
    assert_eq!(reloaded.meta(), model.meta());
    for sentence in ["贾政见宝玉", "天下雨了", "宝玉"] {
        let chars: Vec<char> = sentence.chars().collect();
        assert_eq!(model.tag(&chars), reloaded.tag(&chars));
    }
}

#[test]
fn missing_and_corrupt_artifacts_are_distinguished() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        CrfModel::load(&dir.path().join("absent.crfsuite")),
        Err(ExtractError::ArtifactMissing { .. })
    ));

    let path = dir.path().join("tagger.crfsuite");
    trained().save(&path).unwrap();

    let labels = labels_path(&path);
    let sidecar = fs::read_to_string(&labels).unwrap();
    fs::remove_file(&labels).unwrap();
    assert!(matches!(
        CrfModel::load(&path),
        Err(ExtractError::ArtifactMissing { .. })
    ));

    fs::write(&labels, sidecar.replace("B-PER", "B-LOC")).unwrap();
    assert!(matches!(
        CrfModel::load(&path),
        Err(ExtractError::ArtifactCorrupt { .. })
    ));

    fs::write(&labels, &sidecar).unwrap();
    fs::write(&path, b"not a crfsuite model").unwrap();
    assert!(matches!(
        CrfModel::load(&path),
        Err(ExtractError::ArtifactCorrupt { .. })
    ));
}
