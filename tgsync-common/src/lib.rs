//! # TextGrid Sync Common Library
//!
//! Shared code for all tgsync crates including:
//! - Error types
//! - Configuration loading and project root resolution
//! - Event types (SyncEvent enum) and the EventBus
//! - Annotation unit keys and the backing file-name convention
//! - The TextGrid model and its Praat text codec

pub mod config;
pub mod error;
pub mod events;
pub mod textgrid;
pub mod unit;

pub use error::{Error, Result};
pub use textgrid::{IntervalTier, PointTier, TextGrid, TextInterval, TextPoint, Tier, TierKind};
pub use unit::AnnotationUnit;
