//! # TextGrid Round Trip
//!
//! Sends stored TextGrids to Praat for editing and takes the edited result
//! back into the store.
//!
//! - [`coordinator`]: per-unit lock state machine and callback handling
//! - [`listener`]: single-message loopback callback listener
//! - [`script`]: hand-off script context and template generation
//! - [`sender`]: external tool invocation (`praat --send`)
//! - [`audio`]: companion audio lookup

pub mod audio;
pub mod coordinator;
pub mod listener;
pub mod script;
pub mod sender;

pub use audio::AudioResolver;
pub use coordinator::{
    LockState, RoundTrip, RoundTripCoordinator, RoundTripOutcome, RoundTripRequest,
    HANDOFF_FILE_NAME,
};
pub use listener::CallbackListener;
pub use script::{ScriptContext, ScriptGenerator, TemplateScript};
pub use sender::{ExternalTool, PraatSender};
