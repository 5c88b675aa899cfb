//! Round-trip coordinator
//!
//! Hands a stored TextGrid to the external editor and takes the edited
//! result back. Per unit:
//!
//! ```text
//! Idle -> Sending -> Locked -> Reconciling -> Idle
//!            |          |
//!            |          +-- force_unlock --> Idle
//!            +-- send failed --> Idle
//! ```
//!
//! While a unit is anything but `Idle` it counts as locked: other parts of
//! the system must refuse edits to it. There is no timeout; a stuck editor
//! is released with [`RoundTripCoordinator::force_unlock`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tgsync_align::MediaSegment;
use tgsync_common::config::PraatConfig;
use tgsync_common::events::{EventBus, SyncEvent, UnlockReason};
use tgsync_common::{AnnotationUnit, Error, Result};
use tgsync_store::{load_textgrid_file, TextGridStore};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::listener::CallbackListener;
use crate::script::{keys, ScriptContext, ScriptGenerator, TemplateScript};
use crate::sender::{ExternalTool, PraatSender};

/// File the external editor writes when sending a TextGrid back
pub const HANDOFF_FILE_NAME: &str = "praat_backToCaller.Data";

/// Observable lock state of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    /// Script is being handed to the external tool
    Sending,
    /// External tool owns the TextGrid
    Locked { handle: Uuid, port: u16 },
    /// Callback arrived; the returned TextGrid is being stored
    Reconciling { handle: Uuid },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        !matches!(self, LockState::Unlocked)
    }
}

enum UnitState {
    Idle,
    Sending,
    Locked {
        handle: Uuid,
        port: u16,
        cancel: CancellationToken,
    },
    Reconciling {
        handle: Uuid,
    },
}

impl UnitState {
    fn observe(&self) -> LockState {
        match self {
            UnitState::Idle => LockState::Unlocked,
            UnitState::Sending => LockState::Sending,
            UnitState::Locked { handle, port, .. } => LockState::Locked {
                handle: *handle,
                port: *port,
            },
            UnitState::Reconciling { handle } => LockState::Reconciling { handle: *handle },
        }
    }
}

type UnitSlot = Arc<Mutex<UnitState>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns a unit's `Sending` state. Unless disarmed, dropping it returns the
/// unit to `Idle`, including when the sending future itself is dropped.
struct SendingGuard<'a> {
    events: &'a EventBus,
    unit: &'a AnnotationUnit,
    slot: &'a UnitSlot,
    armed: bool,
}

impl SendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut state = lock(self.slot);
            if !matches!(*state, UnitState::Sending) {
                return;
            }
            *state = UnitState::Idle;
        }
        warn!("Send of {} did not complete, unit unlocked", self.unit);
        self.events.emit_lossy(SyncEvent::UnitUnlocked {
            unit: self.unit.clone(),
            reason: UnlockReason::SendFailed,
            timestamp: Utc::now(),
        });
    }
}

/// What to hand to the external tool
#[derive(Debug, Clone)]
pub struct RoundTripRequest {
    pub unit: AnnotationUnit,
    /// Audio file opened next to the TextGrid
    pub audio_path: PathBuf,
    pub segment: MediaSegment,
    /// Open the whole recording instead of the segment only
    pub use_full_audio: bool,
}

/// How a round trip ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTripOutcome {
    /// Callback received. `reconciled` is false when the hand-off file was
    /// missing or unreadable and the store was left untouched.
    Completed { reconciled: bool, payload: String },
    ForceUnlocked,
}

/// An established round trip, returned once the unit is locked
#[derive(Debug)]
pub struct RoundTrip {
    pub unit: AnnotationUnit,
    pub handle: Uuid,
    pub port: u16,
    outcome: oneshot::Receiver<RoundTripOutcome>,
}

impl RoundTrip {
    /// Wait until the callback arrives or the unit is force-unlocked
    pub async fn finished(self) -> Result<RoundTripOutcome> {
        self.outcome
            .await
            .map_err(|_| Error::Internal("round trip ended without an outcome".to_string()))
    }
}

pub struct RoundTripCoordinator {
    store: Arc<TextGridStore>,
    events: EventBus,
    script: Arc<dyn ScriptGenerator>,
    tool: Arc<dyn ExternalTool>,
    handoff_file: PathBuf,
    units: Mutex<HashMap<AnnotationUnit, UnitSlot>>,
}

impl RoundTripCoordinator {
    pub fn new(
        store: Arc<TextGridStore>,
        events: EventBus,
        script: Arc<dyn ScriptGenerator>,
        tool: Arc<dyn ExternalTool>,
        handoff_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            events,
            script,
            tool,
            handoff_file: handoff_file.into(),
            units: Mutex::new(HashMap::new()),
        }
    }

    /// Coordinator talking to the configured Praat binary with the built-in
    /// script template
    pub fn with_praat(store: Arc<TextGridStore>, events: EventBus, config: &PraatConfig) -> Self {
        Self::new(
            store,
            events,
            Arc::new(TemplateScript::open_textgrid()),
            Arc::new(PraatSender::new(&config.binary)),
            config.resolved_prefs_dir().join(HANDOFF_FILE_NAME),
        )
    }

    pub fn handoff_file(&self) -> &Path {
        &self.handoff_file
    }

    fn slot(&self, unit: &AnnotationUnit) -> UnitSlot {
        lock(&self.units)
            .entry(unit.clone())
            .or_insert_with(|| Arc::new(Mutex::new(UnitState::Idle)))
            .clone()
    }

    pub fn lock_state(&self, unit: &AnnotationUnit) -> LockState {
        match lock(&self.units).get(unit) {
            Some(slot) => lock(slot).observe(),
            None => LockState::Unlocked,
        }
    }

    /// True while edits to `unit` must be refused
    pub fn is_locked(&self, unit: &AnnotationUnit) -> bool {
        self.lock_state(unit).is_locked()
    }

    /// Units currently out of the `Idle` state, sorted
    pub fn locked_units(&self) -> Vec<AnnotationUnit> {
        let mut units: Vec<AnnotationUnit> = lock(&self.units)
            .iter()
            .filter(|(_, slot)| lock(slot).observe().is_locked())
            .map(|(unit, _)| unit.clone())
            .collect();
        units.sort();
        units
    }

    /// Hand the unit's TextGrid to the external tool and lock the unit.
    ///
    /// Fails with `AlreadyLocked` unless the unit is idle. Any failure
    /// before the tool accepts the script returns the unit to idle and is
    /// reported to the caller; nothing is retried.
    pub async fn begin_send(self: &Arc<Self>, request: RoundTripRequest) -> Result<RoundTrip> {
        let unit = request.unit.clone();
        let slot = self.slot(&unit);
        {
            let mut state = lock(&slot);
            match &*state {
                UnitState::Idle => *state = UnitState::Sending,
                other => {
                    return Err(Error::AlreadyLocked(format!(
                        "{} ({:?})",
                        unit,
                        other.observe()
                    )))
                }
            }
        }

        let guard = SendingGuard {
            events: &self.events,
            unit: &unit,
            slot: &slot,
            armed: true,
        };

        let listener = match self.hand_off(&request).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to send {} to {}: {}", unit, self.tool.name(), e);
                // the guard unlocks the unit and reports SendFailed
                drop(guard);
                return Err(e);
            }
        };

        let port = listener.port();
        let handle = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *lock(&slot) = UnitState::Locked {
            handle,
            port,
            cancel: cancel.clone(),
        };
        guard.disarm();
        info!("{} sent to {} (callback port {})", unit, self.tool.name(), port);
        self.events.emit_lossy(SyncEvent::UnitLocked {
            unit: unit.clone(),
            port,
            timestamp: Utc::now(),
        });

        let (tx, rx) = oneshot::channel();
        let coordinator = Arc::clone(self);
        let task_unit = unit.clone();
        tokio::spawn(async move {
            let outcome = coordinator
                .wait_for_callback(listener, &task_unit, handle, cancel)
                .await;
            let _ = tx.send(outcome);
        });

        Ok(RoundTrip {
            unit,
            handle,
            port,
            outcome: rx,
        })
    }

    /// Callback task body. A callback that loses the race against
    /// `force_unlock` ends the round trip as force-unlocked.
    async fn wait_for_callback(
        &self,
        listener: CallbackListener,
        unit: &AnnotationUnit,
        handle: Uuid,
        cancel: CancellationToken,
    ) -> RoundTripOutcome {
        match listener.accept_one(cancel).await {
            Some(payload) => self
                .complete(unit, handle, payload)
                .await
                .unwrap_or(RoundTripOutcome::ForceUnlocked),
            None => RoundTripOutcome::ForceUnlocked,
        }
    }

    /// Bind the listener, build the script and send it. The listener is
    /// dropped (port closed) on any failure.
    async fn hand_off(&self, request: &RoundTripRequest) -> Result<CallbackListener> {
        let listener = CallbackListener::bind().await?;
        let textgrid_path = absolute(&self.store.path(&request.unit))?;
        let audio_path = absolute(&request.audio_path)?;

        let mut context = ScriptContext::new();
        context
            .insert_flag(keys::REPLY_TO_CALLER, true)
            .insert(keys::SOCKET, listener.port())
            .insert_path(keys::AUDIO_PATH, &audio_path)
            .insert_path(keys::TEXTGRID_PATH, &textgrid_path)
            .insert_text(keys::TEXTGRID_NAME, &request.unit.unit_id)
            .insert(keys::SEGMENT_START, request.segment.start)
            .insert(keys::SEGMENT_END, request.segment.end)
            .insert_flag(keys::USE_FULL_AUDIO, request.use_full_audio);

        let script = self.script.generate(&context)?;
        self.tool.send(&script).await?;
        Ok(listener)
    }

    /// Callback path. Returns `None` when the callback belongs to a round
    /// trip that was force-unlocked in the meantime.
    async fn complete(
        &self,
        unit: &AnnotationUnit,
        handle: Uuid,
        payload: String,
    ) -> Option<RoundTripOutcome> {
        let slot = self.slot(unit);
        {
            let mut state = lock(&slot);
            match &*state {
                UnitState::Locked { handle: current, .. } if *current == handle => {
                    *state = UnitState::Reconciling { handle };
                }
                _ => {
                    debug!("Discarding stale callback for {}", unit);
                    return None;
                }
            }
        }

        let reconciled = match self.reconcile(unit).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        };

        *lock(&slot) = UnitState::Idle;
        info!("Round trip for {} finished (reconciled: {})", unit, reconciled);
        let timestamp = Utc::now();
        self.events.emit_lossy(SyncEvent::UnitUnlocked {
            unit: unit.clone(),
            reason: UnlockReason::Completed,
            timestamp,
        });
        self.events.emit_lossy(SyncEvent::TextGridUpdated {
            unit: unit.clone(),
            reconciled,
            timestamp,
        });
        Some(RoundTripOutcome::Completed {
            reconciled,
            payload,
        })
    }

    /// Store the TextGrid the external tool left in the hand-off file. The
    /// stored TextGrid is untouched when the file is missing or unreadable.
    async fn reconcile(&self, unit: &AnnotationUnit) -> Result<()> {
        let store = Arc::clone(&self.store);
        let handoff = self.handoff_file.clone();
        let unit = unit.clone();

        tokio::task::spawn_blocking(move || {
            let textgrid = load_textgrid_file(&handoff).map_err(|e| {
                Error::ReconciliationSkipped(format!("{}: {}", unit, e))
            })?;
            store.save(&textgrid, &unit)?;
            // a stale hand-off file must not feed the next round trip
            if let Err(e) = std::fs::remove_file(&handoff) {
                debug!("Could not remove {}: {}", handoff.display(), e);
            }
            Ok(())
        })
        .await
        .map_err(|e| Error::Internal(format!("reconciliation task failed: {}", e)))?
    }

    /// Release a locked unit without waiting for the callback. A callback
    /// arriving later is ignored.
    pub fn force_unlock(&self, unit: &AnnotationUnit) -> Result<()> {
        let slot = self.slot(unit);
        {
            let mut state = lock(&slot);
            match &*state {
                UnitState::Locked { cancel, .. } => {
                    cancel.cancel();
                    *state = UnitState::Idle;
                }
                other => {
                    return Err(Error::NotLocked(format!("{} ({:?})", unit, other.observe())));
                }
            }
        }
        warn!("{} force-unlocked", unit);
        self.events.emit_lossy(SyncEvent::UnitUnlocked {
            unit: unit.clone(),
            reason: UnlockReason::ForceUnlocked,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
