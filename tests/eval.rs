use reddream_extract::nlp::{
    bio::Label,
    eval::{score_pairs, score_sequences},
};

#[test]
fn sequence_scores_count_tag_mismatches() {
    use Label::*;
    let gold = vec![vec![Begin, Inside, Outside, Outside]];
    let pred = vec![vec![Begin, Outside, Outside, Begin]];
    let report = score_sequences(&gold, &pred, &Label::ALL);

    let begin = &report.labels[0];
    assert_eq!(begin.support, 1);
    assert!((begin.score.precision - 0.5).abs() < 1e-12);
    assert!((begin.score.recall - 1.0).abs() < 1e-12);

    let inside = &report.labels[1];
    assert_eq!(inside.support, 1);
    assert_eq!(inside.score.recall, 0.0);
    assert_eq!(inside.score.f1, 0.0);

    // Two of four positions agree.
    assert!((report.micro.f1 - 0.5).abs() < 1e-12);
}

#[test]
fn unseen_labels_score_zero() {
    let gold = ["a".to_string(), "a".to_string()];
    let pred = ["a".to_string(), "a".to_string()];
    let labels = ["a".to_string(), "b".to_string()];
    let report = score_pairs(gold.iter().zip(pred.iter()), &labels);
    assert_eq!(report.labels[0].score.f1, 1.0);
    assert_eq!(report.labels[1].support, 0);
    assert_eq!(report.labels[1].score.precision, 0.0);
}

#[test]
fn report_renders_one_line_per_label_and_micro_average() {
    use Label::*;
    let report = score_sequences(&[vec![Begin, Outside]], &[vec![Begin, Outside]], &Label::ALL);
    let text = report.to_string();
    assert_eq!(text.lines().count(), 5);
    assert!(text.contains("B-PER"));
    assert!(text.lines().last().unwrap().starts_with("micro avg"));
}
