//! TextGrid model
//!
//! A TextGrid is an ordered list of named tiers, each either a sequence of
//! contiguous labelled intervals or a sequence of labelled time points.
//! Tiers are addressed by 1-based number, as in Praat; intervals and points
//! inside a tier use ordinary 0-based indices.
//!
//! Invariants maintained by every constructor and mutator:
//! - every interval has `xmax > xmin`
//! - `intervals[i].xmax == intervals[i + 1].xmin`
//! - the first and last interval bounds equal the tier bounds
//! - points are ordered by time and lie inside the tier bounds

mod encoding;
mod reader;
mod writer;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use encoding::{decode_text, encode_utf16};
pub use reader::parse_textgrid;
pub use writer::{to_praat_text, write_textgrid};

/// Tolerance used when checking boundary continuity of parsed tiers
pub const BOUNDARY_EPSILON: f64 = 1e-9;

/// A labelled time span `[xmin, xmax)` in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInterval {
    pub xmin: f64,
    pub xmax: f64,
    pub text: String,
}

impl TextInterval {
    pub fn new(xmin: f64, xmax: f64, text: impl Into<String>) -> Result<Self> {
        if !(xmin.is_finite() && xmax.is_finite()) || xmax <= xmin {
            return Err(Error::InvalidInput(format!(
                "interval bounds [{}, {}] are not increasing",
                xmin, xmax
            )));
        }
        Ok(Self {
            xmin,
            xmax,
            text: text.into(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// True when `t` falls inside `[xmin, xmax)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.xmin && t < self.xmax
    }

    /// Label with surrounding whitespace removed
    pub fn label(&self) -> &str {
        self.text.trim()
    }
}

/// A labelled point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPoint {
    pub time: f64,
    pub mark: String,
}

impl TextPoint {
    pub fn new(time: f64, mark: impl Into<String>) -> Self {
        Self {
            time,
            mark: mark.into(),
        }
    }
}

/// Kind of a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierKind {
    Interval,
    Point,
}

impl TierKind {
    /// Class name used in the Praat text format
    pub fn praat_class(self) -> &'static str {
        match self {
            TierKind::Interval => "IntervalTier",
            TierKind::Point => "TextTier",
        }
    }
}

// ========================================
// Interval tiers
// ========================================

/// Contiguous sequence of labelled intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIntervalTier")]
pub struct IntervalTier {
    name: String,
    xmin: f64,
    xmax: f64,
    intervals: Vec<TextInterval>,
}

/// Unchecked serialized form, validated on the way in
#[derive(Deserialize)]
struct RawIntervalTier {
    name: String,
    xmin: f64,
    xmax: f64,
    intervals: Vec<TextInterval>,
}

impl TryFrom<RawIntervalTier> for IntervalTier {
    type Error = String;

    fn try_from(raw: RawIntervalTier) -> std::result::Result<Self, String> {
        Self::from_parsed(raw.name, raw.xmin, raw.xmax, raw.intervals)
    }
}

impl IntervalTier {
    /// New tier holding one empty interval over `[xmin, xmax]`
    pub fn new(name: impl Into<String>, xmin: f64, xmax: f64) -> Result<Self> {
        let interval = TextInterval::new(xmin, xmax, "")?;
        Ok(Self {
            name: name.into(),
            xmin,
            xmax,
            intervals: vec![interval],
        })
    }

    /// Build a tier from intervals that must already be contiguous
    pub fn from_intervals(name: impl Into<String>, intervals: Vec<TextInterval>) -> Result<Self> {
        let name = name.into();
        let (first, last) = match (intervals.first(), intervals.last()) {
            (Some(f), Some(l)) => (f.xmin, l.xmax),
            _ => {
                return Err(Error::InvalidInput(format!(
                    "interval tier '{}' has no intervals",
                    name
                )))
            }
        };
        let tier = Self {
            name,
            xmin: first,
            xmax: last,
            intervals,
        };
        tier.check_invariants(0.0).map_err(Error::InvalidInput)?;
        Ok(tier)
    }

    /// Used by the reader: tolerate tiny float drift at boundaries, then snap
    /// them so the invariants hold exactly.
    pub(crate) fn from_parsed(
        name: String,
        xmin: f64,
        xmax: f64,
        mut intervals: Vec<TextInterval>,
    ) -> std::result::Result<Self, String> {
        if intervals.is_empty() {
            return Err(format!("interval tier '{}' has no intervals", name));
        }
        for i in 1..intervals.len() {
            let prev = intervals[i - 1].xmax;
            if (intervals[i].xmin - prev).abs() <= BOUNDARY_EPSILON {
                intervals[i].xmin = prev;
            }
        }
        if let Some(first) = intervals.first_mut() {
            if (first.xmin - xmin).abs() <= BOUNDARY_EPSILON {
                first.xmin = xmin;
            }
        }
        if let Some(last) = intervals.last_mut() {
            if (last.xmax - xmax).abs() <= BOUNDARY_EPSILON {
                last.xmax = xmax;
            }
        }
        let tier = Self {
            name,
            xmin,
            xmax,
            intervals,
        };
        tier.check_invariants(0.0)?;
        Ok(tier)
    }

    fn check_invariants(&self, eps: f64) -> std::result::Result<(), String> {
        if self.xmax <= self.xmin {
            return Err(format!(
                "tier '{}' has empty domain [{}, {}]",
                self.name, self.xmin, self.xmax
            ));
        }
        for (i, interval) in self.intervals.iter().enumerate() {
            if interval.xmax <= interval.xmin {
                return Err(format!(
                    "tier '{}' interval {} has bounds [{}, {}]",
                    self.name,
                    i + 1,
                    interval.xmin,
                    interval.xmax
                ));
            }
        }
        for pair in self.intervals.windows(2) {
            if (pair[0].xmax - pair[1].xmin).abs() > eps {
                return Err(format!(
                    "tier '{}' has a gap or overlap at {} / {}",
                    self.name, pair[0].xmax, pair[1].xmin
                ));
            }
        }
        let first = &self.intervals[0];
        let last = &self.intervals[self.intervals.len() - 1];
        if (first.xmin - self.xmin).abs() > eps || (last.xmax - self.xmax).abs() > eps {
            return Err(format!(
                "tier '{}' intervals do not cover [{}, {}]",
                self.name, self.xmin, self.xmax
            ));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn intervals(&self) -> &[TextInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn interval(&self, index: usize) -> Option<&TextInterval> {
        self.intervals.get(index)
    }

    /// Replace the label of interval `index`
    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        let len = self.intervals.len();
        let interval = self.intervals.get_mut(index).ok_or_else(|| {
            Error::InvalidInput(format!("interval index {} out of range ({})", index, len))
        })?;
        interval.text = text.into();
        Ok(())
    }

    /// Split the interval containing `t` in two. The left part keeps the
    /// label, the right part starts empty. Returns the index of the new
    /// right-hand interval.
    pub fn insert_boundary(&mut self, t: f64) -> Result<usize> {
        if t <= self.xmin || t >= self.xmax {
            return Err(Error::InvalidInput(format!(
                "boundary {} outside tier domain ({}, {})",
                t, self.xmin, self.xmax
            )));
        }
        let index = self
            .time_to_low_index(t)
            .ok_or_else(|| Error::Internal(format!("no interval contains {}", t)))?;
        let existing = &self.intervals[index];
        if existing.xmin == t {
            return Err(Error::InvalidInput(format!("boundary already exists at {}", t)));
        }
        let right = TextInterval {
            xmin: t,
            xmax: existing.xmax,
            text: String::new(),
        };
        self.intervals[index].xmax = t;
        self.intervals.insert(index + 1, right);
        Ok(index + 1)
    }

    /// Index of the interval whose span contains `t`. The tier's end time
    /// maps to the last interval.
    pub fn time_to_low_index(&self, t: f64) -> Option<usize> {
        if t < self.xmin || t > self.xmax {
            return None;
        }
        if t == self.xmax {
            return Some(self.intervals.len() - 1);
        }
        // intervals are sorted and contiguous
        let idx = self.intervals.partition_point(|i| i.xmax <= t);
        (idx < self.intervals.len()).then_some(idx)
    }

    /// First interval at or after `from` whose trimmed label equals `text`
    pub fn find_text_from(&self, text: &str, from: usize) -> Option<usize> {
        self.intervals
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, interval)| interval.label() == text)
            .map(|(i, _)| i)
    }

    /// Intervals whose label matches `filter`. An empty pattern selects all.
    pub fn filter<'a>(&'a self, filter: &'a Regex) -> impl Iterator<Item = &'a TextInterval> + 'a {
        self.intervals
            .iter()
            .filter(move |i| filter.as_str().is_empty() || filter.is_match(&i.text))
    }

    /// The part of this tier inside `[start, end]`, shifted by `offset`.
    /// A tier that does not overlap the range becomes a single empty
    /// interval over it, so tier numbering survives extraction.
    fn extract(&self, start: f64, end: f64, offset: f64) -> Self {
        let lo = start.max(self.xmin);
        let hi = end.min(self.xmax);
        let intervals: Vec<TextInterval> = self
            .intervals
            .iter()
            .filter(|i| i.xmax > lo && i.xmin < hi)
            .map(|i| TextInterval {
                xmin: i.xmin.max(lo) - offset,
                xmax: i.xmax.min(hi) - offset,
                text: i.text.clone(),
            })
            .filter(|i| i.xmax > i.xmin)
            .collect();
        if intervals.is_empty() {
            return Self {
                name: self.name.clone(),
                xmin: start - offset,
                xmax: end - offset,
                intervals: vec![TextInterval {
                    xmin: start - offset,
                    xmax: end - offset,
                    text: String::new(),
                }],
            };
        }
        Self {
            name: self.name.clone(),
            xmin: intervals[0].xmin,
            xmax: intervals[intervals.len() - 1].xmax,
            intervals,
        }
    }
}

// ========================================
// Point tiers
// ========================================

/// Ordered sequence of labelled points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTier {
    name: String,
    xmin: f64,
    xmax: f64,
    points: Vec<TextPoint>,
}

impl PointTier {
    pub fn new(name: impl Into<String>, xmin: f64, xmax: f64) -> Result<Self> {
        if xmax <= xmin {
            return Err(Error::InvalidInput(format!(
                "point tier domain [{}, {}] is empty",
                xmin, xmax
            )));
        }
        Ok(Self {
            name: name.into(),
            xmin,
            xmax,
            points: Vec::new(),
        })
    }

    pub(crate) fn from_parsed(
        name: String,
        xmin: f64,
        xmax: f64,
        points: Vec<TextPoint>,
    ) -> std::result::Result<Self, String> {
        if xmax <= xmin {
            return Err(format!("point tier '{}' has an empty domain", name));
        }
        if points.windows(2).any(|p| p[1].time < p[0].time) {
            return Err(format!("point tier '{}' is not ordered by time", name));
        }
        if points
            .iter()
            .any(|p| p.time < xmin - BOUNDARY_EPSILON || p.time > xmax + BOUNDARY_EPSILON)
        {
            return Err(format!("point tier '{}' has a point outside its domain", name));
        }
        Ok(Self {
            name,
            xmin,
            xmax,
            points,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn points(&self) -> &[TextPoint] {
        &self.points
    }

    /// Insert a point keeping time order
    pub fn add_point(&mut self, time: f64, mark: impl Into<String>) -> Result<()> {
        if time < self.xmin || time > self.xmax {
            return Err(Error::InvalidInput(format!(
                "point {} outside tier domain [{}, {}]",
                time, self.xmin, self.xmax
            )));
        }
        let idx = self.points.partition_point(|p| p.time <= time);
        self.points.insert(idx, TextPoint::new(time, mark));
        Ok(())
    }

    fn extract(&self, start: f64, end: f64, offset: f64) -> Self {
        let (lo, hi) = if start.max(self.xmin) < end.min(self.xmax) {
            (start.max(self.xmin), end.min(self.xmax))
        } else {
            (start, end)
        };
        Self {
            name: self.name.clone(),
            xmin: lo - offset,
            xmax: hi - offset,
            points: self
                .points
                .iter()
                .filter(|p| p.time >= start && p.time <= end)
                .map(|p| TextPoint::new(p.time - offset, p.mark.clone()))
                .collect(),
        }
    }
}

// ========================================
// Tiers and TextGrids
// ========================================

/// One tier of a TextGrid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Tier {
    Interval(IntervalTier),
    Point(PointTier),
}

impl Tier {
    pub fn name(&self) -> &str {
        match self {
            Tier::Interval(t) => t.name(),
            Tier::Point(t) => t.name(),
        }
    }

    pub fn kind(&self) -> TierKind {
        match self {
            Tier::Interval(_) => TierKind::Interval,
            Tier::Point(_) => TierKind::Point,
        }
    }

    pub fn xmin(&self) -> f64 {
        match self {
            Tier::Interval(t) => t.xmin(),
            Tier::Point(t) => t.xmin(),
        }
    }

    pub fn xmax(&self) -> f64 {
        match self {
            Tier::Interval(t) => t.xmax(),
            Tier::Point(t) => t.xmax(),
        }
    }

    pub fn as_interval(&self) -> Option<&IntervalTier> {
        match self {
            Tier::Interval(t) => Some(t),
            Tier::Point(_) => None,
        }
    }
}

/// In-memory TextGrid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGrid {
    xmin: f64,
    xmax: f64,
    tiers: Vec<Tier>,
}

impl TextGrid {
    /// Empty TextGrid over `[xmin, xmax]`
    pub fn new(xmin: f64, xmax: f64) -> Result<Self> {
        if !(xmin.is_finite() && xmax.is_finite()) || xmax <= xmin {
            return Err(Error::InvalidInput(format!(
                "TextGrid domain [{}, {}] is empty",
                xmin, xmax
            )));
        }
        Ok(Self {
            xmin,
            xmax,
            tiers: Vec::new(),
        })
    }

    pub(crate) fn from_parsed(xmin: f64, xmax: f64, tiers: Vec<Tier>) -> Self {
        Self { xmin, xmax, tiers }
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn number_of_tiers(&self) -> usize {
        self.tiers.len()
    }

    /// Tier by 1-based number
    pub fn tier(&self, number: usize) -> Result<&Tier> {
        number
            .checked_sub(1)
            .and_then(|i| self.tiers.get(i))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "tier number {} out of range (1..={})",
                    number,
                    self.tiers.len()
                ))
            })
    }

    /// Interval tier by 1-based number; fails when the tier holds points
    pub fn interval_tier(&self, number: usize) -> Result<&IntervalTier> {
        match self.tier(number)? {
            Tier::Interval(t) => Ok(t),
            Tier::Point(t) => Err(Error::InvalidInput(format!(
                "tier {} ('{}') is not an interval tier",
                number,
                t.name()
            ))),
        }
    }

    /// Mutable interval tier by 1-based number
    pub fn interval_tier_mut(&mut self, number: usize) -> Result<&mut IntervalTier> {
        let count = self.tiers.len();
        match number.checked_sub(1).and_then(|i| self.tiers.get_mut(i)) {
            Some(Tier::Interval(t)) => Ok(t),
            Some(Tier::Point(t)) => Err(Error::InvalidInput(format!(
                "tier {} ('{}') is not an interval tier",
                number,
                t.name()
            ))),
            None => Err(Error::InvalidInput(format!(
                "tier number {} out of range (1..={})",
                number, count
            ))),
        }
    }

    /// 1-based number of the first tier called `name`
    pub fn tier_number_from_name(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.name() == name).map(|i| i + 1)
    }

    /// First interval tier called `name`. Point tiers with that name are
    /// treated as absent.
    pub fn find_interval_tier(&self, name: &str) -> Option<&IntervalTier> {
        (1..=self.tiers.len())
            .filter_map(|n| self.interval_tier(n).ok())
            .find(|t| t.name() == name)
    }

    /// Append a tier, widening the TextGrid domain to cover it
    pub fn add_tier(&mut self, tier: Tier) {
        self.xmin = self.xmin.min(tier.xmin());
        self.xmax = self.xmax.max(tier.xmax());
        self.tiers.push(tier);
    }

    /// Append an empty interval tier spanning the whole TextGrid
    pub fn add_interval_tier(&mut self, name: impl Into<String>) -> Result<&mut IntervalTier> {
        let tier = IntervalTier::new(name, self.xmin, self.xmax)?;
        self.tiers.push(Tier::Interval(tier));
        match self.tiers.last_mut() {
            Some(Tier::Interval(t)) => Ok(t),
            _ => Err(Error::Internal("tier just added is missing".to_string())),
        }
    }

    /// Append an empty point tier spanning the whole TextGrid
    pub fn add_point_tier(&mut self, name: impl Into<String>) -> Result<&mut PointTier> {
        let tier = PointTier::new(name, self.xmin, self.xmax)?;
        self.tiers.push(Tier::Point(tier));
        match self.tiers.last_mut() {
            Some(Tier::Point(t)) => Ok(t),
            _ => Err(Error::Internal("tier just added is missing".to_string())),
        }
    }

    /// Part of the TextGrid covering `[start, end]`.
    ///
    /// Intervals crossing the edges are clipped. With `preserve_times` off
    /// the result is shifted to start at zero.
    pub fn extract_part(&self, start: f64, end: f64, preserve_times: bool) -> Result<Self> {
        let start = start.max(self.xmin);
        let end = end.min(self.xmax);
        if end <= start {
            return Err(Error::InvalidInput(format!(
                "cannot extract empty range [{}, {}]",
                start, end
            )));
        }
        let offset = if preserve_times { 0.0 } else { start };
        let tiers = self
            .tiers
            .iter()
            .map(|tier| match tier {
                Tier::Interval(t) => Tier::Interval(t.extract(start, end, offset)),
                Tier::Point(t) => Tier::Point(t.extract(start, end, offset)),
            })
            .collect();
        Ok(Self {
            xmin: start - offset,
            xmax: end - offset,
            tiers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_word_tier() -> IntervalTier {
        IntervalTier::from_intervals(
            "Orthography: Word",
            vec![
                TextInterval::new(0.0, 0.5, "the").unwrap(),
                TextInterval::new(0.5, 1.0, "cat").unwrap(),
                TextInterval::new(1.0, 1.5, " sat ").unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_tier_has_single_empty_interval() {
        let tier = IntervalTier::new("t", 0.0, 2.0).unwrap();
        assert_eq!(tier.len(), 1);
        assert_eq!(tier.intervals()[0].text, "");
        assert_eq!(tier.intervals()[0].xmax, 2.0);
    }

    #[test]
    fn test_from_intervals_rejects_gap() {
        let result = IntervalTier::from_intervals(
            "t",
            vec![
                TextInterval::new(0.0, 0.5, "a").unwrap(),
                TextInterval::new(0.6, 1.0, "b").unwrap(),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_interval_rejects_non_increasing_bounds() {
        assert!(TextInterval::new(1.0, 1.0, "x").is_err());
        assert!(TextInterval::new(1.0, 0.5, "x").is_err());
    }

    #[test]
    fn test_time_to_low_index() {
        let tier = three_word_tier();
        assert_eq!(tier.time_to_low_index(0.0), Some(0));
        assert_eq!(tier.time_to_low_index(0.5), Some(1));
        assert_eq!(tier.time_to_low_index(1.2), Some(2));
        assert_eq!(tier.time_to_low_index(1.5), Some(2));
        assert_eq!(tier.time_to_low_index(1.6), None);
    }

    #[test]
    fn test_find_text_from_trims_labels() {
        let tier = three_word_tier();
        assert_eq!(tier.find_text_from("sat", 0), Some(2));
        assert_eq!(tier.find_text_from("the", 1), None);
    }

    #[test]
    fn test_insert_boundary_splits_interval() {
        let mut tier = IntervalTier::new("t", 0.0, 1.0).unwrap();
        tier.set_text(0, "whole").unwrap();
        let right = tier.insert_boundary(0.4).unwrap();
        assert_eq!(right, 1);
        assert_eq!(tier.intervals()[0].xmax, 0.4);
        assert_eq!(tier.intervals()[1].xmin, 0.4);
        assert_eq!(tier.intervals()[0].text, "whole");
        assert!(tier.insert_boundary(0.4).is_err());
    }

    #[test]
    fn test_interval_tier_lookup_rejects_point_tier() {
        let mut tg = TextGrid::new(0.0, 1.0).unwrap();
        tg.add_point_tier("events").unwrap();
        tg.add_interval_tier("words").unwrap();
        assert!(tg.interval_tier(1).is_err());
        assert!(tg.interval_tier(2).is_ok());
        assert!(tg.tier(0).is_err());
        assert!(tg.tier(3).is_err());
        assert!(tg.find_interval_tier("events").is_none());
        assert_eq!(tg.tier_number_from_name("words"), Some(2));
    }

    #[test]
    fn test_extract_part_clips_and_shifts() {
        let mut tg = TextGrid::new(0.0, 1.5).unwrap();
        tg.add_tier(Tier::Interval(three_word_tier()));
        let events = tg.add_point_tier("events").unwrap();
        events.add_point(0.2, "a").unwrap();
        events.add_point(0.9, "b").unwrap();

        let part = tg.extract_part(0.25, 1.0, false).unwrap();
        assert_eq!(part.xmin(), 0.0);
        assert!((part.xmax() - 0.75).abs() < 1e-12);
        let words = part.interval_tier(1).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words.intervals()[0].text, "the");
        assert!((words.intervals()[0].xmax - 0.25).abs() < 1e-12);
        match part.tier(2).unwrap() {
            Tier::Point(p) => {
                assert_eq!(p.points().len(), 1);
                assert_eq!(p.points()[0].mark, "b");
            }
            _ => panic!("expected point tier"),
        }

        let kept = tg.extract_part(0.25, 1.0, true).unwrap();
        assert_eq!(kept.xmin(), 0.25);
        assert_eq!(kept.interval_tier(1).unwrap().intervals()[1].xmin, 0.5);
    }

    #[test]
    fn test_extract_part_keeps_every_tier_within_its_bounds() {
        let mut tg = TextGrid::new(0.0, 3.0).unwrap();
        tg.add_tier(Tier::Interval(three_word_tier()));
        let late = IntervalTier::from_intervals(
            "late",
            vec![TextInterval::new(2.0, 3.0, "x").unwrap()],
        )
        .unwrap();
        tg.add_tier(Tier::Interval(late));
        tg.add_point_tier("events").unwrap();

        let part = tg.extract_part(1.0, 2.5, true).unwrap();
        assert_eq!(part.number_of_tiers(), 3);

        // words end at 1.5, before the requested range does
        let words = part.interval_tier(1).unwrap();
        assert_eq!(words.xmax(), 1.5);
        assert_eq!(words.intervals().last().unwrap().xmax, words.xmax());
        words.check_invariants(0.0).unwrap();

        let late = part.interval_tier(2).unwrap();
        assert_eq!(late.name(), "late");
        assert_eq!((late.xmin(), late.xmax()), (2.0, 2.5));
        late.check_invariants(0.0).unwrap();

        // no overlap at all: one empty interval over the range
        let early = part.extract_part(1.0, 1.5, true).unwrap();
        let empty = early.interval_tier(2).unwrap();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty.intervals()[0].text, "");
        assert_eq!((empty.xmin(), empty.xmax()), (1.0, 1.5));
        assert_eq!(early.tier_number_from_name("events"), Some(3));
    }

    #[test]
    fn test_deserialized_tier_is_validated() {
        let json = serde_json::to_string(&three_word_tier()).unwrap();
        let back: IntervalTier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, three_word_tier());

        let empty = r#"{"name":"words","xmin":0.0,"xmax":1.0,"intervals":[]}"#;
        let err = serde_json::from_str::<IntervalTier>(empty).unwrap_err();
        assert!(err.to_string().contains("has no intervals"));

        let gap = r#"{"name":"words","xmin":0.0,"xmax":1.0,"intervals":[
            {"xmin":0.0,"xmax":0.4,"text":"a"},{"xmin":0.6,"xmax":1.0,"text":"b"}]}"#;
        assert!(serde_json::from_str::<IntervalTier>(gap).is_err());
    }

    #[test]
    fn test_filter_by_pattern() {
        let tier = three_word_tier();
        let re = Regex::new("^.a").unwrap();
        let labels: Vec<_> = tier.filter(&re).map(|i| i.label()).collect();
        assert_eq!(labels, vec!["cat"]);
        let all = Regex::new("").unwrap();
        assert_eq!(tier.filter(&all).count(), 3);
    }
}
