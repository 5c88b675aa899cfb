//! Alignment engine
//!
//! Binds a record's linguistic elements to intervals of a TextGrid. For
//! every record tier and structural level the engine looks for an interval
//! tier named `"<tier>: <Level>"` and walks the elements in session order,
//! matching each element's text against trimmed interval labels. The search
//! cursor only moves forward, so duplicate labels bind in order.
//!
//! The pass is best effort. Missing tiers and unmatched labels are logged,
//! never returned as errors: partial alignment is a valid result.
//!
//! Phonetic tiers without group, word or syllable interval tiers get those
//! levels inferred from the already aligned phones.

use tgsync_common::{IntervalTier, Result, TextGrid, TextInterval};
use tracing::{debug, info};

use crate::alignment::{companion_tier_name, Alignment, ElementId, Level};
use crate::ipa::IpaTranscript;
use crate::record::{Record, RecordTier, RecordTierKind};

/// Align every tier of `record` against `textgrid`
pub fn annotate_record(textgrid: &TextGrid, record: &Record) -> Alignment {
    let mut alignment = Alignment::new();
    for (index, tier) in record.tiers.iter().enumerate() {
        annotate_tier(textgrid, index, tier, &mut alignment);
    }
    debug!(
        "Aligned {} elements of record {}",
        alignment.len(),
        record.id.as_deref().unwrap_or("<unnamed>")
    );
    alignment
}

/// Align `record` against the part of a session-wide TextGrid covered by
/// the record's segment. Interval times stay absolute. Records without a
/// segment are aligned against the whole TextGrid.
pub fn annotate_record_segment(textgrid: &TextGrid, record: &Record) -> Result<Alignment> {
    match record.segment {
        Some(segment) => {
            let part = textgrid.extract_part(segment.start, segment.end, true)?;
            Ok(annotate_record(&part, record))
        }
        None => Ok(annotate_record(textgrid, record)),
    }
}

/// Align one record tier. `index` is the tier's position in the record and
/// becomes part of every element id.
pub fn annotate_tier(textgrid: &TextGrid, index: usize, tier: &RecordTier, alignment: &mut Alignment) {
    match tier.kind {
        // orthography and free text share the tier / group / word layout
        RecordTierKind::Orthography | RecordTierKind::Text => {
            annotate_word_tier(textgrid, index, tier, alignment)
        }
        RecordTierKind::Ipa => annotate_ipa_tier(textgrid, index, tier, alignment),
    }
}

fn companion<'a>(textgrid: &'a TextGrid, tier: &RecordTier, level: Level) -> Option<&'a IntervalTier> {
    let name = companion_tier_name(&tier.name, level);
    let found = textgrid.find_interval_tier(&name);
    if found.is_none() {
        debug!("No interval tier '{}'", name);
    }
    found
}

/// Ordered greedy matching of `elements` against `tier`.
///
/// Each element is searched for strictly after the previous match. The
/// first element without a match ends the level.
fn match_level(
    interval_tier: &IntervalTier,
    elements: impl IntoIterator<Item = (ElementId, String)>,
    alignment: &mut Alignment,
) {
    let mut from = 0;
    for (id, text) in elements {
        if text.is_empty() {
            continue;
        }
        match interval_tier.find_text_from(&text, from) {
            Some(found) => {
                if let Some(interval) = interval_tier.interval(found) {
                    alignment.insert_matched(id, interval, found);
                }
                from = found + 1;
            }
            None => {
                info!(
                    "Unable to find interval for '{}' ({}) in '{}'",
                    text,
                    id,
                    interval_tier.name()
                );
                break;
            }
        }
    }
}

fn match_full_tier(textgrid: &TextGrid, index: usize, tier: &RecordTier, alignment: &mut Alignment) {
    if let Some(full) = companion(textgrid, tier, Level::Tier) {
        match_level(full, [(ElementId::tier(index), tier.tier_text())], alignment);
    }
}

fn match_groups(textgrid: &TextGrid, index: usize, tier: &RecordTier, alignment: &mut Alignment) -> bool {
    let Some(groups) = companion(textgrid, tier, Level::Group) else {
        return false;
    };
    let elements = (0..tier.groups.len())
        .map(|g| (ElementId::group(index, g), tier.group_text(g).unwrap_or_default()));
    match_level(groups, elements, alignment);
    true
}

fn annotate_word_tier(textgrid: &TextGrid, index: usize, tier: &RecordTier, alignment: &mut Alignment) {
    match_full_tier(textgrid, index, tier, alignment);
    match_groups(textgrid, index, tier, alignment);

    if let Some(words) = companion(textgrid, tier, Level::Word) {
        let elements = (0..tier.groups.len()).flat_map(move |g| {
            tier.words(g)
                .into_iter()
                .enumerate()
                .map(move |(w, word)| (ElementId::word(index, g, w), word.to_string()))
        });
        match_level(words, elements, alignment);
    }
}

fn annotate_ipa_tier(textgrid: &TextGrid, index: usize, tier: &RecordTier, alignment: &mut Alignment) {
    let transcripts: Vec<IpaTranscript> = (0..tier.groups.len())
        .map(|g| tier.transcript(g).unwrap_or_default())
        .collect();

    match_full_tier(textgrid, index, tier, alignment);

    // phones first: the other levels may be inferred from them
    if let Some(phones) = companion(textgrid, tier, Level::Phone) {
        let elements = transcripts.iter().enumerate().flat_map(move |(g, ipa)| {
            (0..ipa.len()).filter_map(move |e| {
                ipa.phone_label(e)
                    .map(|label| (ElementId::phone(index, g, e), label))
            })
        });
        match_level(phones, elements, alignment);
    }

    if !match_groups(textgrid, index, tier, alignment) {
        for (g, ipa) in transcripts.iter().enumerate() {
            infer_interval(ipa, 0..ipa.len(), ElementId::group(index, g), index, g, alignment);
        }
    }

    match companion(textgrid, tier, Level::Word) {
        Some(words) => {
            let elements = transcripts.iter().enumerate().flat_map(move |(g, ipa)| {
                ipa.words()
                    .into_iter()
                    .enumerate()
                    .map(move |(w, range)| (ElementId::word(index, g, w), ipa.render(range)))
            });
            match_level(words, elements, alignment);
        }
        None => {
            for (g, ipa) in transcripts.iter().enumerate() {
                for (w, range) in ipa.words().into_iter().enumerate() {
                    infer_interval(ipa, range, ElementId::word(index, g, w), index, g, alignment);
                }
            }
        }
    }

    match companion(textgrid, tier, Level::Syllable) {
        Some(syllables) => {
            let elements = transcripts.iter().enumerate().flat_map(move |(g, ipa)| {
                ipa.syllables()
                    .into_iter()
                    .enumerate()
                    .map(move |(s, range)| (ElementId::syllable(index, g, s), ipa.render(range)))
            });
            match_level(syllables, elements, alignment);
        }
        None => {
            for (g, ipa) in transcripts.iter().enumerate() {
                for (s, range) in ipa.syllables().into_iter().enumerate() {
                    infer_interval(ipa, range, ElementId::syllable(index, g, s), index, g, alignment);
                }
            }
        }
    }
}

/// Span `[first phone xmin, last phone xmax]` for a composite element.
/// Nothing is inferred unless both end phones are aligned.
fn infer_interval(
    ipa: &IpaTranscript,
    range: std::ops::Range<usize>,
    id: ElementId,
    tier: usize,
    group: usize,
    alignment: &mut Alignment,
) {
    let text = ipa.render(range.clone());
    let Some((first, last)) = ipa.phone_span(range) else {
        return;
    };
    let (Some(i1), Some(i2)) = (
        alignment.get(&ElementId::phone(tier, group, first)),
        alignment.get(&ElementId::phone(tier, group, last)),
    ) else {
        return;
    };
    match TextInterval::new(i1.xmin, i2.xmax, text) {
        Ok(interval) => alignment.insert_inferred(id, interval),
        Err(e) => debug!("Cannot infer interval for {}: {}", id, e),
    }
}
