//! Change notification bus
//!
//! One bus per project. The folder watcher only runs while at least one
//! subscription is alive: it is started when the subscriber count goes from
//! zero to one and stopped when the last subscription is dropped.
//!
//! Raw file-system events are decoded into [`TextGridChange`]s on a
//! background task. File names that do not follow the unit naming pattern
//! (temporary files from atomic saves, editor backups, ...) are ignored.
//! Each subscriber owns an unbounded queue, so a slow subscriber never
//! blocks the others and per-subscriber order matches event order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tgsync_common::events::{ChangeKind, TextGridChange};
use tgsync_common::{AnnotationUnit, Error, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type SubscriberList = Arc<Mutex<Vec<(u64, mpsc::UnboundedSender<TextGridChange>)>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct RunningWatcher {
    // Dropping the watcher closes the raw event channel
    watcher: RecommendedWatcher,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    running: Option<RunningWatcher>,
}

/// Per-project change notification bus
pub struct NotificationBus {
    folder: PathBuf,
    subscribers: SubscriberList,
    state: Mutex<BusState>,
}

impl NotificationBus {
    /// Create a bus for the given backing folder. Nothing is watched until
    /// the first subscription.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            state: Mutex::new(BusState::default()),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Register a new listener. Must be called from within a tokio runtime;
    /// the first subscription starts the folder watcher.
    pub fn subscribe(self: &Arc<Self>) -> Result<Subscription> {
        let mut state = lock(&self.state);
        let (tx, rx) = mpsc::unbounded_channel();

        if state.running.is_none() {
            state.running = Some(self.start_watcher()?);
        }

        let id = state.next_id;
        state.next_id += 1;
        lock(&self.subscribers).push((id, tx));
        debug!("Subscriber {} added to {}", id, self.folder.display());

        Ok(Subscription {
            id,
            rx,
            bus: Arc::downgrade(self),
        })
    }

    /// Remove a listener. Equivalent to dropping the subscription.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// True while the folder watcher task is running
    pub fn is_watching(&self) -> bool {
        lock(&self.state).running.is_some()
    }

    fn remove_subscriber(&self, id: u64) {
        let mut state = lock(&self.state);
        let remaining = {
            let mut subscribers = lock(&self.subscribers);
            subscribers.retain(|(sub_id, _)| *sub_id != id);
            subscribers.len()
        };
        debug!("Subscriber {} removed from {}", id, self.folder.display());

        if remaining == 0 {
            if let Some(RunningWatcher {
                watcher,
                shutdown,
                task,
            }) = state.running.take()
            {
                shutdown.cancel();
                drop(watcher);
                drop(task);
                info!("Stopped watching {}", self.folder.display());
            }
        }
    }

    fn start_watcher(&self) -> Result<RunningWatcher> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::Internal(format!("notification bus requires a tokio runtime: {}", e))
        })?;
        std::fs::create_dir_all(&self.folder)?;

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            // Receiver gone means the bus is shutting down
            let _ = raw_tx.send(event);
        })
        .map_err(|e| Error::Internal(format!("failed to create folder watcher: {}", e)))?;
        watcher
            .watch(&self.folder, RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::Internal(format!("failed to watch {}: {}", self.folder.display(), e))
            })?;

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let subscribers = self.subscribers.clone();
        let mut known = scan_units(&self.folder);
        let folder = self.folder.clone();

        let task = runtime.spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = raw_rx.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                match event {
                    Ok(event) => {
                        for change in classify(&event, &mut known) {
                            deliver(&subscribers, change);
                        }
                    }
                    Err(e) => warn!("Watcher error on {}: {}", folder.display(), e),
                }
            }
            debug!("Watcher task for {} finished", folder.display());
        });

        info!("Watching {}", self.folder.display());
        Ok(RunningWatcher {
            watcher,
            shutdown,
            task,
        })
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("folder", &self.folder)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn deliver(subscribers: &SubscriberList, change: TextGridChange) {
    let subscribers = lock(subscribers);
    for (id, tx) in subscribers.iter() {
        if tx.send(change.clone()).is_err() {
            debug!("Subscriber {} queue closed", id);
        }
    }
}

fn scan_units(folder: &Path) -> HashSet<AnnotationUnit> {
    let Ok(entries) = std::fs::read_dir(folder) else {
        return HashSet::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(AnnotationUnit::from_file_name)
        })
        .collect()
}

fn unit_of(path: &Path) -> Option<AnnotationUnit> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(AnnotationUnit::from_file_name)
}

/// Decode one raw event into unit changes. `known` tracks which units are
/// currently present so a rename over an existing file reads as a
/// modification.
fn classify(event: &Event, known: &mut HashSet<AnnotationUnit>) -> Vec<TextGridChange> {
    let mut changes = Vec::new();

    match &event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                appeared(path, known, &mut changes);
            }
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => {
                for path in &event.paths {
                    disappeared(path, known, &mut changes);
                }
            }
            RenameMode::To => {
                for path in &event.paths {
                    appeared(path, known, &mut changes);
                }
            }
            RenameMode::Both => {
                if let [from, to, ..] = event.paths.as_slice() {
                    disappeared(from, known, &mut changes);
                    appeared(to, known, &mut changes);
                }
            }
            _ => {
                for path in &event.paths {
                    if path.exists() {
                        appeared(path, known, &mut changes);
                    } else {
                        disappeared(path, known, &mut changes);
                    }
                }
            }
        },
        EventKind::Modify(_) => {
            for path in &event.paths {
                if let Some(unit) = unit_of(path) {
                    known.insert(unit.clone());
                    changes.push(TextGridChange::new(ChangeKind::Modified, unit));
                }
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                disappeared(path, known, &mut changes);
            }
        }
        _ => {}
    }
    changes
}

fn appeared(path: &Path, known: &mut HashSet<AnnotationUnit>, changes: &mut Vec<TextGridChange>) {
    if let Some(unit) = unit_of(path) {
        let kind = if known.insert(unit.clone()) {
            ChangeKind::Added
        } else {
            ChangeKind::Modified
        };
        changes.push(TextGridChange::new(kind, unit));
    }
}

fn disappeared(path: &Path, known: &mut HashSet<AnnotationUnit>, changes: &mut Vec<TextGridChange>) {
    if let Some(unit) = unit_of(path) {
        known.remove(&unit);
        changes.push(TextGridChange::new(ChangeKind::Removed, unit));
    }
}

/// A live registration on a [`NotificationBus`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<TextGridChange>,
    bus: Weak<NotificationBus>,
}

impl Subscription {
    /// Wait for the next change. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<TextGridChange> {
        self.rx.recv().await
    }

    /// Next already-delivered change, if any
    pub fn try_recv(&mut self) -> Option<TextGridChange> {
        self.rx.try_recv().ok()
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_subscriber(self.id);
        }
    }
}
