//! Alignment engine against hand-built TextGrids

use tgsync_align::{
    annotate_record, annotate_record_segment, ElementId, Level, MediaSegment, Record, RecordTier,
    RecordTierKind, Source,
};
use tgsync_common::{IntervalTier, TextGrid, TextInterval, Tier};

/// Interval tier with consecutive intervals of the given (label, duration)
fn interval_tier(name: &str, start: f64, spans: &[(&str, f64)]) -> Tier {
    let mut t = start;
    let intervals = spans
        .iter()
        .map(|(label, duration)| {
            let interval = TextInterval::new(t, t + duration, *label).unwrap();
            t += duration;
            interval
        })
        .collect();
    Tier::Interval(IntervalTier::from_intervals(name, intervals).unwrap())
}

fn textgrid(tiers: Vec<Tier>) -> TextGrid {
    let mut tg = TextGrid::new(0.0, 0.1).unwrap();
    for tier in tiers {
        tg.add_tier(tier);
    }
    tg
}

fn ipa_record(groups: &[&str]) -> Record {
    Record::default().with_tier(RecordTier::new(
        RecordTierKind::Ipa,
        "IPA Target",
        groups.iter().map(|g| g.to_string()).collect(),
    ))
}

#[test]
fn test_duplicate_labels_bind_in_order() {
    let tg = textgrid(vec![interval_tier(
        "IPA Target: Word",
        0.0,
        &[("", 0.2), ("kæt", 0.4), ("dɑg", 0.4), ("", 0.1), ("kæt", 0.5)],
    )]);
    let record = ipa_record(&["kæt dɑg kæt"]);

    let alignment = annotate_record(&tg, &record);

    let first = alignment.get(&ElementId::word(0, 0, 0)).unwrap();
    let second = alignment.get(&ElementId::word(0, 0, 1)).unwrap();
    let third = alignment.get(&ElementId::word(0, 0, 2)).unwrap();
    assert_eq!(first.text, "kæt");
    assert!((first.xmin - 0.2).abs() < 1e-9);
    assert_eq!(second.text, "dɑg");
    assert_eq!(third.text, "kæt");
    assert!(third.xmin > first.xmin, "second 'kæt' must bind to the later interval");
    assert_eq!(
        alignment.entry(&ElementId::word(0, 0, 2)).unwrap().source,
        Source::Matched { index: 4 }
    );
}

#[test]
fn test_consecutive_duplicates_use_distinct_intervals() {
    let tg = textgrid(vec![interval_tier(
        "Orthography: Word",
        0.0,
        &[("no", 0.3), ("no", 0.3)],
    )]);
    let record = Record::default().with_tier(RecordTier::new(
        RecordTierKind::Orthography,
        "Orthography",
        vec!["no no".to_string()],
    ));

    let alignment = annotate_record(&tg, &record);
    let a = alignment.get(&ElementId::word(0, 0, 0)).unwrap();
    let b = alignment.get(&ElementId::word(0, 0, 1)).unwrap();
    assert!(b.xmin >= a.xmax);
}

#[test]
fn test_alignment_is_monotonic_and_deterministic() {
    let tg = textgrid(vec![
        interval_tier(
            "Orthography: Word",
            0.0,
            &[("the", 0.2), ("", 0.1), ("cat", 0.3), ("sat", 0.3), ("the", 0.1), ("cat", 0.2)],
        ),
        interval_tier(
            "Orthography: Group",
            0.0,
            &[("the cat", 0.6), ("sat", 0.3), ("the cat", 0.3)],
        ),
    ]);
    let record = Record::default().with_tier(RecordTier::new(
        RecordTierKind::Orthography,
        "Orthography",
        vec!["the cat".into(), "sat".into(), "the cat".into()],
    ));

    let first = annotate_record(&tg, &record);
    let second = annotate_record(&tg, &record);
    assert_eq!(first, second);

    for level in [Level::Group, Level::Word] {
        let starts: Vec<f64> = first.level(0, level).map(|(_, i)| i.xmin).collect();
        assert!(!starts.is_empty());
        assert!(starts.windows(2).all(|w| w[0] <= w[1]), "{:?} not monotonic", level);
    }
    assert_eq!(first.level(0, Level::Word).count(), 5);
    assert_eq!(first.level(0, Level::Group).count(), 3);
}

#[test]
fn test_full_tier_level() {
    let tg = textgrid(vec![interval_tier(
        "Orthography: Tier",
        0.0,
        &[("", 0.5), ("the cat sat", 1.0), ("", 0.5)],
    )]);
    let record = Record::default().with_tier(RecordTier::new(
        RecordTierKind::Orthography,
        "Orthography",
        vec!["the  cat".into(), "sat".into()],
    ));

    let alignment = annotate_record(&tg, &record);
    let tier = alignment.get(&ElementId::tier(0)).unwrap();
    assert_eq!((tier.xmin, tier.xmax), (0.5, 1.5));
}

#[test]
fn test_point_tier_treated_as_absent() {
    let mut tg = textgrid(vec![]);
    tg.add_point_tier("Orthography: Word")
        .unwrap()
        .add_point(0.05, "the")
        .unwrap();
    let record = Record::default().with_tier(RecordTier::new(
        RecordTierKind::Orthography,
        "Orthography",
        vec!["the".into()],
    ));

    assert!(annotate_record(&tg, &record).is_empty());
}

#[test]
fn test_phone_alignment_infers_composites() {
    // "ˈkæ.tɪ sæt": phones k æ t ɪ s æ t
    let tg = textgrid(vec![interval_tier(
        "IPA Target: Phone",
        1.0,
        &[
            ("ˈk", 0.1),
            ("æ", 0.1),
            ("t", 0.1),
            ("ɪ", 0.1),
            ("", 0.2),
            ("s", 0.1),
            ("æ", 0.1),
            ("t", 0.1),
        ],
    )]);
    let record = ipa_record(&["ˈkæ.tɪ sæt"]);

    let alignment = annotate_record(&tg, &record);

    let group = alignment.entry(&ElementId::group(0, 0)).unwrap();
    assert_eq!(group.source, Source::Inferred);
    assert_eq!(group.interval.xmin, 1.0);
    assert!((group.interval.xmax - 1.9).abs() < 1e-9);
    assert_eq!(group.interval.text, "ˈkæ.tɪ sæt");

    let second_word = alignment.get(&ElementId::word(0, 0, 1)).unwrap();
    assert_eq!(second_word.text, "sæt");
    assert!((second_word.xmin - 1.6).abs() < 1e-9);

    let syllable = alignment.get(&ElementId::syllable(0, 0, 1)).unwrap();
    assert_eq!(syllable.text, "tɪ");
    assert!((syllable.xmin - 1.2).abs() < 1e-9);
    assert!((syllable.xmax - 1.4).abs() < 1e-9);
}

#[test]
fn test_no_inference_without_end_phones() {
    // the last phone never matches, so nothing spanning it is inferred
    let tg = textgrid(vec![interval_tier(
        "IPA Target: Phone",
        0.0,
        &[("k", 0.1), ("æ", 0.1), ("d", 0.1)],
    )]);
    let record = ipa_record(&["kæt"]);

    let alignment = annotate_record(&tg, &record);
    assert!(alignment.contains(&ElementId::phone(0, 0, 1)));
    assert!(!alignment.contains(&ElementId::phone(0, 0, 2)));
    assert!(!alignment.contains(&ElementId::word(0, 0, 0)));
    assert!(!alignment.contains(&ElementId::group(0, 0)));
}

#[test]
fn test_partial_alignment_groups_without_words() {
    let tg = textgrid(vec![
        interval_tier("Notes: Group", 0.0, &[("laughs", 1.0)]),
        interval_tier("Notes: Word", 0.0, &[("cries", 1.0)]),
    ]);
    let record = Record::default().with_tier(RecordTier::new(
        RecordTierKind::Text,
        "Notes",
        vec!["laughs".into()],
    ));

    let alignment = annotate_record(&tg, &record);
    assert!(alignment.contains(&ElementId::group(0, 0)));
    assert!(!alignment.contains(&ElementId::word(0, 0, 0)));
}

#[test]
fn test_segment_restricts_search() {
    // the same word occurs in two records of one session-wide TextGrid
    let tg = textgrid(vec![interval_tier(
        "Orthography: Word",
        0.0,
        &[("hello", 1.0), ("", 1.0), ("hello", 1.0)],
    )]);
    let mut record = Record::default().with_tier(RecordTier::new(
        RecordTierKind::Orthography,
        "Orthography",
        vec!["hello".into()],
    ));
    record.segment = Some(MediaSegment::new(2.0, 3.0).unwrap());

    let alignment = annotate_record_segment(&tg, &record).unwrap();
    let word = alignment.get(&ElementId::word(0, 0, 0)).unwrap();
    assert_eq!((word.xmin, word.xmax), (2.0, 3.0));

    record.segment = Some(MediaSegment::new(10.0, 11.0).unwrap());
    assert!(annotate_record_segment(&tg, &record).is_err());
}
