//! Event definitions and the EventBus
//!
//! Two event families live here:
//! - [`TextGridChange`]: a file-system change to a stored TextGrid, decoded
//!   into its annotation unit by the change notification bus.
//! - [`SyncEvent`]: round-trip lifecycle notifications, broadcast to any
//!   view that needs to refresh or update its lock indicator.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::unit::AnnotationUnit;

/// Classification of a stored-file change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One decoded change in the store's backing folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextGridChange {
    pub kind: ChangeKind,
    pub unit: AnnotationUnit,
}

impl TextGridChange {
    pub fn new(kind: ChangeKind, unit: AnnotationUnit) -> Self {
        Self { kind, unit }
    }
}

/// Why a unit left the locked state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockReason {
    /// External tool sent its completion callback
    Completed,
    /// User released the lock by hand
    ForceUnlocked,
    /// Hand-off to the external tool failed before the lock was established
    SendFailed,
}

/// Round-trip lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Unit handed to the external tool; local edits must be refused
    UnitLocked {
        unit: AnnotationUnit,
        /// Callback port the external tool will reply to
        port: u16,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Unit editable again
    UnitUnlocked {
        unit: AnnotationUnit,
        reason: UnlockReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Round trip finished; views showing `unit` should reload it.
    ///
    /// `reconciled` is false when the hand-off file was missing or
    /// unparsable and the stored TextGrid was left untouched.
    TextGridUpdated {
        unit: AnnotationUnit,
        reconciled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SyncEvent {
    pub fn unit(&self) -> &AnnotationUnit {
        match self {
            SyncEvent::UnitLocked { unit, .. }
            | SyncEvent::UnitUnlocked { unit, .. }
            | SyncEvent::TextGridUpdated { unit, .. } => unit,
        }
    }
}

/// Central distribution bus for round-trip events
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// observe `Lagged` instead of stalling the publisher, and receivers clean
/// themselves up when dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SyncEvent,
    ) -> Result<usize, broadcast::error::SendError<SyncEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SyncEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for sync event");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
