//! # TextGrid Store
//!
//! File-backed storage for TextGrids keyed by annotation unit, plus the
//! per-project change notification bus that watches the backing folder.
//!
//! - [`store`]: load/save/list with atomic writes (no caching)
//! - [`watcher`]: reference-counted folder watcher fanning out decoded changes
//! - [`merge`]: combine record-level TextGrids into a session TextGrid
//! - [`registry`]: explicit per-project map of store and bus handles

pub mod merge;
pub mod registry;
pub mod store;
pub mod watcher;

pub use registry::{ProjectHandles, ProjectRegistry};
pub use store::{load_textgrid_file, save_textgrid_file, TextGridStore, TEXTGRID_FOLDER};
pub use watcher::{NotificationBus, Subscription};
