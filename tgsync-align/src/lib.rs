//! # TextGrid Alignment
//!
//! Attaches TextGrid intervals to the linguistic elements of a session
//! record (tiers, groups, words, syllables, phones).
//!
//! - [`record`]: serde model of a record's tiers and media segment
//! - [`ipa`]: phonetic transcription parsing
//! - [`alignment`]: element identities and the resulting interval map
//! - [`annotator`]: the matching and inference pass

pub mod alignment;
pub mod annotator;
pub mod ipa;
pub mod record;

pub use alignment::{companion_tier_name, AlignedInterval, Alignment, ElementId, Level, Source};
pub use annotator::{annotate_record, annotate_record_segment, annotate_tier};
pub use ipa::{IpaElement, IpaElementKind, IpaTranscript};
pub use record::{MediaSegment, Record, RecordTier, RecordTierKind};
