use std::fs;

use rand::{rngs::StdRng, SeedableRng};
use reddream_extract::{
    data::{
        corpus::{
            annotate_sentence, has_entity, load_chapters, read_bio, sample_sentences,
            split_dataset, split_sentences, write_bio, BioSentence,
        },
        dataset::{build_relation_rows, label_distribution, read_positives, write_dataset},
    },
    nlp::{
        bio::{EntitySpan, Label},
        ner::Ner,
        normalize::NameDictionary,
        relclf::{LabeledText, NO_RELATION},
    },
    ExtractError,
};
use tempfile::tempdir;

struct ListNer(Vec<&'static str>);

impl Ner for ListNer {
    fn spans(&self, sentence: &str) -> Vec<EntitySpan> {
        self.0
            .iter()
            .filter(|name| sentence.contains(*name))
            .map(|name| EntitySpan {
                start: 0,
                end: name.chars().count(),
                text: name.to_string(),
            })
            .collect()
    }
}

fn names(items: &[&str]) -> Vec<String> {
    NameDictionary::new(items.iter().copied()).names().to_vec()
}

#[test]
fn sentences_are_split_and_short_pieces_dropped() {
    let text = "宝玉笑道：好妹妹。嗯！\n黛玉听了便不言语？好";
    assert_eq!(split_sentences(text), ["宝玉笑道：好妹妹", "黛玉听了便不言语"]);
}

#[test]
fn longer_names_claim_characters_first() {
    let dict = names(&["宝玉", "贾宝玉"]);
    let labelled = annotate_sentence("贾宝玉见宝玉", &dict);
    let labels: Vec<Label> = labelled.iter().map(|(_, l)| *l).collect();
    use Label::*;
    assert_eq!(labels, [Begin, Inside, Inside, Outside, Begin, Inside]);
    assert!(has_entity(&labelled));
    assert!(!has_entity(&annotate_sentence("天下雨了", &dict)));
}

#[test]
fn bio_files_round_trip_and_reject_unknown_labels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("train.txt");
    let data: Vec<BioSentence> = vec![
        annotate_sentence("宝玉笑了", &names(&["宝玉"])),
        annotate_sentence("他走了", &names(&["宝玉"])),
    ];
    write_bio(&path, &data).unwrap();
    assert_eq!(read_bio(&path).unwrap(), data);

    fs::write(&path, "宝\tB-PER\n玉\tX-PER\n").unwrap();
    assert!(matches!(
        read_bio(&path),
        Err(ExtractError::Dataset { line: 2, .. })
    ));
}

#[test]
fn malformed_bio_lines_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dev.txt");
    fs::write(&path, "宝\tB-PER\nnot a pair\n玉\tI-PER\n\n\n笑\tO\n").unwrap();
    let data = read_bio(&path).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0], vec![('宝', Label::Begin), ('玉', Label::Inside)]);
}

#[test]
fn dataset_split_is_seeded_and_exhaustive() {
    let data: Vec<BioSentence> = (0..20)
        .map(|i| vec![(char::from(b'a' + i as u8), Label::Outside)])
        .collect();
    let (train, dev, test) = split_dataset(data.clone(), 7);
    assert_eq!((train.len(), dev.len(), test.len()), (14, 3, 3));
    let again = split_dataset(data, 7);
    assert_eq!(train, again.0);
}

#[test]
fn sampling_keeps_at_least_one_sentence() {
    let sentences: Vec<String> = (0..3).map(|i| format!("句子{i}")).collect();
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(sample_sentences(&sentences, 0.01, &mut rng).len(), 1);
    assert_eq!(sample_sentences(&sentences, 1.0, &mut rng).len(), 3);
    assert!(sample_sentences(&[], 0.5, &mut rng).is_empty());
}

#[test]
fn chapters_load_in_name_order() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("002.txt"), "第二回").unwrap();
    fs::write(dir.path().join("001.txt"), "第一回").unwrap();
    fs::write(dir.path().join("notes.md"), "skip").unwrap();
    let chapters = load_chapters(dir.path()).unwrap();
    let order: Vec<&str> = chapters.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(order, ["001.txt", "002.txt"]);
    assert!(load_chapters(&dir.path().join("missing")).is_err());
}

#[test]
fn negatives_are_capped_and_exclude_positives_in_either_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("positives.txt");
    fs::write(
        &path,
        "贾政是宝玉的父亲，黛玉袭人在旁\t宝玉\t贾政\t父亲\n\
         bad line\n\
         贾政是宝玉的父亲，黛玉袭人在旁\t宝玉\t贾政\t父亲\n",
    )
    .unwrap();
    let positives = read_positives(&path).unwrap();
    assert_eq!(positives.len(), 1);
    assert_eq!(positives[0].len(), 1);

    let ner = ListNer(vec!["贾政", "宝玉", "黛玉", "袭人"]);
    let rows = build_relation_rows(&positives, &ner, &NameDictionary::default());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].label, "父亲");
    assert_eq!(rows[1].label, NO_RELATION);
    assert_eq!((rows[1].entity1.as_str(), rows[1].entity2.as_str()), ("贾政", "黛玉"));

    let marked = rows[0].to_labeled();
    assert_eq!(marked.text, "[E2]是[E1]的父亲，黛玉袭人在旁");
    assert_eq!(
        label_distribution(&rows),
        [("无关系".to_string(), 1), ("父亲".to_string(), 1)]
    );
}

#[test]
fn relation_dataset_is_written_one_row_per_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("relation_train_dataset.tsv");
    let rows = [
        LabeledText {
            text: "[E2]是[E1]的父亲".to_string(),
            label: "父亲".to_string(),
        },
        LabeledText {
            text: "[E1]见[E2]".to_string(),
            label: NO_RELATION.to_string(),
        },
    ];
    write_dataset(&path, &rows).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[E2]是[E1]的父亲\t父亲\n[E1]见[E2]\t无关系\n"
    );
}
