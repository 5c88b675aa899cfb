//! Merge record-level TextGrids into one session TextGrid
//!
//! Older projects stored one TextGrid per record (unit ids `u<digits>`).
//! Merging lays those grids out on one time line: interval tiers sharing a
//! name are concatenated in time order, gaps become empty intervals and
//! overlapping spans are clipped so the result stays contiguous. Point tiers
//! sharing a name are unioned.

use std::cmp::Ordering;

use tgsync_common::textgrid::{IntervalTier, PointTier, TextInterval, Tier, TierKind};
use tgsync_common::unit::is_record_id;
use tgsync_common::{AnnotationUnit, Error, Result, TextGrid};
use tracing::{info, warn};

use crate::store::TextGridStore;

/// Merge TextGrids laid out on a shared absolute time line
pub fn merge_textgrids(grids: &[TextGrid]) -> Result<TextGrid> {
    let xmin = grids
        .iter()
        .map(TextGrid::xmin)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .ok_or_else(|| Error::InvalidInput("nothing to merge".to_string()))?;
    let xmax = grids
        .iter()
        .map(TextGrid::xmax)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(xmin);

    let mut ordered: Vec<&TextGrid> = grids.iter().collect();
    ordered.sort_by(|a, b| a.xmin().partial_cmp(&b.xmin()).unwrap_or(Ordering::Equal));

    // tier names in first-seen order
    let mut layout: Vec<(String, TierKind)> = Vec::new();
    for tg in &ordered {
        for tier in tg.tiers() {
            let key = (tier.name().to_string(), tier.kind());
            if !layout.contains(&key) {
                layout.push(key);
            }
        }
    }

    let mut merged = TextGrid::new(xmin, xmax)?;
    for (name, kind) in layout {
        let sources = ordered
            .iter()
            .flat_map(|tg| tg.tiers().iter())
            .filter(|t| t.name() == name && t.kind() == kind);
        let tier = match kind {
            TierKind::Interval => Tier::Interval(merge_interval_tiers(
                &name,
                xmin,
                xmax,
                sources.filter_map(Tier::as_interval),
            )?),
            TierKind::Point => {
                let mut points = PointTier::new(name.clone(), xmin, xmax)?;
                for source in sources {
                    if let Tier::Point(p) = source {
                        for point in p.points() {
                            points.add_point(point.time, point.mark.clone())?;
                        }
                    }
                }
                Tier::Point(points)
            }
        };
        merged.add_tier(tier);
    }
    Ok(merged)
}

fn merge_interval_tiers<'a>(
    name: &str,
    xmin: f64,
    xmax: f64,
    sources: impl Iterator<Item = &'a IntervalTier>,
) -> Result<IntervalTier> {
    let mut intervals: Vec<TextInterval> = Vec::new();
    let mut cursor = xmin;
    for source in sources {
        for interval in source.intervals() {
            if interval.xmax <= cursor {
                continue;
            }
            if interval.xmin > cursor {
                intervals.push(TextInterval::new(cursor, interval.xmin, "")?);
                cursor = interval.xmin;
            }
            intervals.push(TextInterval::new(cursor, interval.xmax, interval.text.clone())?);
            cursor = interval.xmax;
        }
    }
    if cursor < xmax {
        intervals.push(TextInterval::new(cursor, xmax, "")?);
    }
    IntervalTier::from_intervals(name, intervals)
}

impl TextGridStore {
    /// Merge every record-level TextGrid of a session and store the result
    /// as the session's default TextGrid. Unreadable record files are
    /// logged and left out.
    pub fn merge_record_textgrids(&self, corpus: &str, session: &str) -> Result<TextGrid> {
        let mut ids: Vec<String> = self
            .units_for_session(corpus, session)?
            .into_iter()
            .filter(|id| is_record_id(id))
            .collect();
        ids.sort_by_key(|id| id[1..].parse::<u64>().unwrap_or(u64::MAX));

        let mut grids = Vec::with_capacity(ids.len());
        for id in &ids {
            let unit = AnnotationUnit::new(corpus, session, id.as_str())?;
            match self.load(&unit) {
                Ok(tg) => grids.push(tg),
                Err(e) => warn!("Skipping record TextGrid {}: {}", unit, e),
            }
        }
        if grids.is_empty() {
            return Err(Error::NotFound(format!(
                "no record TextGrids for {}/{}",
                corpus, session
            )));
        }

        let merged = merge_textgrids(&grids)?;
        let target = AnnotationUnit::default_for(corpus, session)?;
        self.save(&merged, &target)?;
        info!("Merged {} record TextGrids into {}", grids.len(), target);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(xmin: f64, xmax: f64, label: &str) -> TextGrid {
        let mut tg = TextGrid::new(xmin, xmax).unwrap();
        tg.add_interval_tier("Orthography: Tier")
            .unwrap()
            .set_text(0, label)
            .unwrap();
        tg
    }

    #[test]
    fn test_merge_fills_gaps() {
        let merged = merge_textgrids(&[grid(2.0, 3.0, "second"), grid(0.0, 1.0, "first")]).unwrap();
        assert_eq!(merged.xmin(), 0.0);
        assert_eq!(merged.xmax(), 3.0);
        let tier = merged.interval_tier(1).unwrap();
        let labels: Vec<_> = tier.intervals().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(labels, vec!["first", "", "second"]);
        assert_eq!(tier.intervals()[1].xmin, 1.0);
        assert_eq!(tier.intervals()[1].xmax, 2.0);
    }

    #[test]
    fn test_merge_clips_overlap() {
        let merged = merge_textgrids(&[grid(0.0, 1.5, "a"), grid(1.0, 2.0, "b")]).unwrap();
        let tier = merged.interval_tier(1).unwrap();
        assert_eq!(tier.len(), 2);
        assert_eq!(tier.intervals()[1].xmin, 1.5);
        assert_eq!(tier.intervals()[1].text, "b");
    }

    #[test]
    fn test_merge_nothing_is_error() {
        assert!(merge_textgrids(&[]).is_err());
    }
}
