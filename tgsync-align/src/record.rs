//! Session record model consumed by the alignment engine
//!
//! Only what alignment needs: the record's tiers, each split into groups,
//! and the media segment the record covers. Records are read from JSON:
//!
//! ```json
//! {
//!   "id": "u3",
//!   "segment": { "start": 1.2, "end": 2.9 },
//!   "tiers": [
//!     { "kind": "orthography", "name": "Orthography", "groups": ["the cat", "sat"] },
//!     { "kind": "ipa", "name": "IPA Target", "groups": ["ðə ˈkæt", "sæt"] },
//!     { "kind": "text", "name": "Notes", "groups": ["laughs"] }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tgsync_common::{Error, Result};

use crate::ipa::IpaTranscript;

pub const ORTHOGRAPHY: &str = "Orthography";
pub const IPA_TARGET: &str = "IPA Target";
pub const IPA_ACTUAL: &str = "IPA Actual";

/// Media span of a record, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaSegment {
    pub start: f64,
    pub end: f64,
}

impl MediaSegment {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !(end > start) || start < 0.0 {
            return Err(Error::InvalidInput(format!(
                "invalid segment [{}, {}]",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Kind of linguistic content a tier carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTierKind {
    Orthography,
    Ipa,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTier {
    pub kind: RecordTierKind,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl RecordTier {
    pub fn new(kind: RecordTierKind, name: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            groups,
        }
    }

    /// Canonical text of group `index`: whitespace-separated words joined
    /// by single spaces
    pub fn group_text(&self, index: usize) -> Option<String> {
        self.groups.get(index).map(|g| normalize(g))
    }

    /// Canonical text of the whole tier: group texts joined by spaces
    pub fn tier_text(&self) -> String {
        self.groups
            .iter()
            .map(|g| normalize(g))
            .filter(|g| !g.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Words of group `index`
    pub fn words(&self, index: usize) -> Vec<&str> {
        self.groups
            .get(index)
            .map(|g| g.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Parsed transcription of group `index`
    pub fn transcript(&self, index: usize) -> Option<IpaTranscript> {
        self.groups.get(index).map(|g| IpaTranscript::parse(g))
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub segment: Option<MediaSegment>,
    #[serde(default)]
    pub tiers: Vec<RecordTier>,
}

impl Record {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidInput(format!("bad record: {}", e)))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn tier(&self, name: &str) -> Option<&RecordTier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    pub fn with_tier(mut self, tier: RecordTier) -> Self {
        self.tiers.push(tier);
        self
    }
}
