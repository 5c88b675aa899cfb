//! Element identities and the alignment map
//!
//! Alignment results are kept beside the record, never inside it: each
//! linguistic element is named by an [`ElementId`] and the [`Alignment`]
//! maps ids to the interval found (or inferred) for them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tgsync_common::TextInterval;

/// Structural level of a linguistic element, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Level {
    Tier,
    Group,
    Word,
    Syllable,
    Phone,
}

impl Level {
    /// Suffix of the companion interval tier name
    pub fn classifier(self) -> &'static str {
        match self {
            Level::Tier => "Tier",
            Level::Group => "Group",
            Level::Word => "Word",
            Level::Syllable => "Syllable",
            Level::Phone => "Phone",
        }
    }
}

/// Name of the interval tier holding `level` intervals for a record tier
pub fn companion_tier_name(tier_name: &str, level: Level) -> String {
    format!("{}: {}", tier_name, level.classifier())
}

/// Stable identity of one linguistic element of a record.
///
/// `tier` is the tier's position in the record. `group` is unused (zero)
/// at tier level. `index` counts words or syllables within the group; for
/// phones it is the position in the group's element list, so markers keep
/// their slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId {
    pub tier: usize,
    pub level: Level,
    pub group: usize,
    pub index: usize,
}

impl ElementId {
    pub fn tier(tier: usize) -> Self {
        Self {
            tier,
            level: Level::Tier,
            group: 0,
            index: 0,
        }
    }

    pub fn group(tier: usize, group: usize) -> Self {
        Self {
            tier,
            level: Level::Group,
            group,
            index: 0,
        }
    }

    pub fn word(tier: usize, group: usize, index: usize) -> Self {
        Self {
            tier,
            level: Level::Word,
            group,
            index,
        }
    }

    pub fn syllable(tier: usize, group: usize, index: usize) -> Self {
        Self {
            tier,
            level: Level::Syllable,
            group,
            index,
        }
    }

    pub fn phone(tier: usize, group: usize, index: usize) -> Self {
        Self {
            tier,
            level: Level::Phone,
            group,
            index,
        }
    }

    /// True when `other` sits below `self` in the element tree
    fn contains(&self, other: &ElementId) -> bool {
        if self.tier != other.tier || other.level <= self.level {
            return false;
        }
        match self.level {
            Level::Tier => true,
            Level::Group => self.group == other.group,
            // words and syllables do not nest in a checkable way by id
            _ => false,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Tier => write!(f, "tier {}", self.tier),
            Level::Group => write!(f, "tier {} group {}", self.tier, self.group),
            level => write!(
                f,
                "tier {} group {} {} {}",
                self.tier,
                self.group,
                level.classifier().to_lowercase(),
                self.index
            ),
        }
    }
}

/// How an element's interval was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    /// Label matched in a companion interval tier
    Matched { index: usize },
    /// Spanned from already aligned phones
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedInterval {
    pub interval: TextInterval,
    pub source: Source,
}

/// Intervals attached to a record's elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    entries: BTreeMap<ElementId, AlignedInterval>,
}

impl Alignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_matched(&mut self, id: ElementId, interval: &TextInterval, index: usize) {
        self.entries.insert(
            id,
            AlignedInterval {
                interval: interval.clone(),
                source: Source::Matched { index },
            },
        );
    }

    pub(crate) fn insert_inferred(&mut self, id: ElementId, interval: TextInterval) {
        self.entries.insert(
            id,
            AlignedInterval {
                interval,
                source: Source::Inferred,
            },
        );
    }

    pub fn get(&self, id: &ElementId) -> Option<&TextInterval> {
        self.entries.get(id).map(|e| &e.interval)
    }

    pub fn entry(&self, id: &ElementId) -> Option<&AlignedInterval> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in element order
    pub fn iter(&self) -> impl Iterator<Item = (&ElementId, &AlignedInterval)> {
        self.entries.iter()
    }

    /// Aligned elements of one tier and level, in session order
    pub fn level(&self, tier: usize, level: Level) -> impl Iterator<Item = (&ElementId, &TextInterval)> {
        self.entries
            .iter()
            .filter(move |(id, _)| id.tier == tier && id.level == level)
            .map(|(id, e)| (id, &e.interval))
    }

    /// Interval for `id`. Tier and group elements without an interval of
    /// their own fall back to the span from their first to their last
    /// aligned descendant; the fallback carries an empty label.
    pub fn resolved_interval(&self, id: &ElementId) -> Option<TextInterval> {
        if let Some(interval) = self.get(id) {
            return Some(interval.clone());
        }
        let mut span: Option<(f64, f64)> = None;
        for (_, entry) in self.entries.iter().filter(|(other, _)| id.contains(other)) {
            let (xmin, xmax) = span.unwrap_or((entry.interval.xmin, entry.interval.xmax));
            span = Some((xmin.min(entry.interval.xmin), xmax.max(entry.interval.xmax)));
        }
        span.and_then(|(xmin, xmax)| TextInterval::new(xmin, xmax, "").ok())
    }
}
