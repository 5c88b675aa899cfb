//! Round trips against a scripted stand-in for the external editor

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tgsync_align::MediaSegment;
use tgsync_common::events::{EventBus, SyncEvent, UnlockReason};
use tgsync_common::{AnnotationUnit, Error, IntervalTier, Result, TextGrid, TextInterval, Tier};
use tgsync_praat::{
    ExternalTool, LockState, RoundTripCoordinator, RoundTripOutcome, RoundTripRequest,
    TemplateScript, HANDOFF_FILE_NAME,
};
use tgsync_store::{save_textgrid_file, TextGridStore};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Notify};
use tokio::time::timeout;

/// Records every script and answers like the external editor would
#[derive(Default)]
struct FakeTool {
    scripts: Mutex<Vec<String>>,
    refuse: bool,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl ExternalTool for FakeTool {
    fn name(&self) -> &str {
        "fake"
    }

    async fn send(&self, script: &str) -> Result<()> {
        self.scripts.lock().unwrap().push(script.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.refuse {
            return Err(Error::ExternalTool("fake refused the script".to_string()));
        }
        Ok(())
    }
}

impl FakeTool {
    fn sent(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

struct Fixture {
    _project: TempDir,
    prefs: TempDir,
    store: Arc<TextGridStore>,
    events: EventBus,
    tool: Arc<FakeTool>,
    coordinator: Arc<RoundTripCoordinator>,
}

impl Fixture {
    fn new(tool: FakeTool) -> Self {
        let project = TempDir::new().unwrap();
        let prefs = TempDir::new().unwrap();
        let store = Arc::new(TextGridStore::new(project.path()));
        let events = EventBus::new(32);
        let tool = Arc::new(tool);
        let coordinator = Arc::new(RoundTripCoordinator::new(
            store.clone(),
            events.clone(),
            Arc::new(TemplateScript::open_textgrid()),
            tool.clone(),
            prefs.path().join(HANDOFF_FILE_NAME),
        ));
        Self {
            _project: project,
            prefs,
            store,
            events,
            tool,
            coordinator,
        }
    }

    fn request(&self, unit: &AnnotationUnit) -> RoundTripRequest {
        RoundTripRequest {
            unit: unit.clone(),
            audio_path: PathBuf::from("/media/s01.wav"),
            segment: MediaSegment::new(1.5, 3.0).unwrap(),
            use_full_audio: false,
        }
    }

    /// What the editor leaves behind on "Send back to calling program"
    fn write_handoff(&self, label: &str) {
        save_textgrid_file(&edited_grid(label), &self.prefs.path().join(HANDOFF_FILE_NAME)).unwrap();
    }
}

fn unit(id: &str) -> AnnotationUnit {
    AnnotationUnit::new("english", "s01", id).unwrap()
}

fn edited_grid(label: &str) -> TextGrid {
    let mut tg = TextGrid::new(0.0, 2.0).unwrap();
    tg.add_tier(Tier::Interval(
        IntervalTier::from_intervals(
            "Orthography: Word",
            vec![
                TextInterval::new(0.0, 0.8, label).unwrap(),
                TextInterval::new(0.8, 2.0, "").unwrap(),
            ],
        )
        .unwrap(),
    ));
    tg
}

async fn callback(port: u16, message: &str) {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream.write_all(message.as_bytes()).await.unwrap();
}

async fn next_event(rx: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event in time")
        .unwrap()
}

#[tokio::test]
async fn test_script_carries_callback_port_and_paths() {
    let fx = Fixture::new(FakeTool::default());
    let u = unit("u1");

    let round_trip = fx.coordinator.begin_send(fx.request(&u)).await.unwrap();

    let scripts = fx.tool.sent();
    assert_eq!(scripts.len(), 1);
    let script = &scripts[0];
    assert!(script.contains(&format!("View & Edit with callback: \"{} u1\"", round_trip.port)));
    assert!(script.contains("audioPath$ = \"/media/s01.wav\""));
    assert!(script.contains(&fx.store.path(&u).display().to_string()));
    assert!(script.contains("segmentStart = 1.5"));
    assert!(script.contains("useFullAudio = 0"));
    assert!(!script.contains("{{"));

    fx.coordinator.force_unlock(&u).unwrap();
}

#[tokio::test]
async fn test_callback_reconciles_into_store() {
    let fx = Fixture::new(FakeTool::default());
    let mut events = fx.events.subscribe();
    let u = unit("default");

    let round_trip = fx.coordinator.begin_send(fx.request(&u)).await.unwrap();
    assert_eq!(
        fx.coordinator.lock_state(&u),
        LockState::Locked {
            handle: round_trip.handle,
            port: round_trip.port
        }
    );
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::UnitLocked { port, .. } if port == round_trip.port
    ));

    fx.write_handoff("hello");
    callback(round_trip.port, "finished default").await;

    let outcome = timeout(Duration::from_secs(5), round_trip.finished())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        outcome,
        RoundTripOutcome::Completed {
            reconciled: true,
            payload: "finished default".to_string()
        }
    );

    let stored = fx.store.load(&u).unwrap();
    assert_eq!(stored, edited_grid("hello"));
    assert!(!fx.coordinator.is_locked(&u));
    // hand-off file consumed
    assert!(!fx.prefs.path().join(HANDOFF_FILE_NAME).exists());

    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::UnitUnlocked { reason: UnlockReason::Completed, .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TextGridUpdated { reconciled: true, .. }
    ));
}

#[tokio::test]
async fn test_missing_handoff_file_still_unlocks() {
    let fx = Fixture::new(FakeTool::default());
    let u = unit("u2");
    fx.store.save(&edited_grid("before"), &u).unwrap();

    let round_trip = fx.coordinator.begin_send(fx.request(&u)).await.unwrap();
    callback(round_trip.port, "").await;

    let outcome = timeout(Duration::from_secs(5), round_trip.finished())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, RoundTripOutcome::Completed { reconciled: false, .. }));
    assert!(!fx.coordinator.is_locked(&u));
    assert_eq!(fx.store.load(&u).unwrap(), edited_grid("before"));
}

#[tokio::test]
async fn test_second_send_while_locked_is_refused() {
    let fx = Fixture::new(FakeTool::default());
    let u = unit("u3");

    let round_trip = fx.coordinator.begin_send(fx.request(&u)).await.unwrap();
    let err = fx.coordinator.begin_send(fx.request(&u)).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyLocked(_)));
    assert_eq!(fx.tool.sent().len(), 1);

    // the first round trip is unaffected
    fx.write_handoff("first");
    callback(round_trip.port, "done").await;
    let outcome = round_trip.finished().await.unwrap();
    assert!(matches!(outcome, RoundTripOutcome::Completed { reconciled: true, .. }));
}

#[tokio::test]
async fn test_second_send_while_sending_is_refused() {
    let gate = Arc::new(Notify::new());
    let fx = Fixture::new(FakeTool {
        gate: Some(gate.clone()),
        ..FakeTool::default()
    });
    let u = unit("u4");

    let coordinator = fx.coordinator.clone();
    let request = fx.request(&u);
    let first = tokio::spawn(async move { coordinator.begin_send(request).await });

    timeout(Duration::from_secs(5), async {
        while fx.coordinator.lock_state(&u) != LockState::Sending {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let err = fx.coordinator.begin_send(fx.request(&u)).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyLocked(_)));

    gate.notify_one();
    let round_trip = first.await.unwrap().unwrap();
    assert_eq!(fx.tool.sent().len(), 1);
    assert!(fx.coordinator.is_locked(&u));
    drop(round_trip);
    fx.coordinator.force_unlock(&u).unwrap();
}

#[tokio::test]
async fn test_abandoned_send_unlocks_unit() {
    let gate = Arc::new(Notify::new());
    let fx = Fixture::new(FakeTool {
        gate: Some(gate.clone()),
        ..FakeTool::default()
    });
    let mut events = fx.events.subscribe();
    let u = unit("u7");

    let coordinator = fx.coordinator.clone();
    let request = fx.request(&u);
    let task = tokio::spawn(async move { coordinator.begin_send(request).await });

    timeout(Duration::from_secs(5), async {
        while fx.coordinator.lock_state(&u) != LockState::Sending {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert_eq!(fx.coordinator.lock_state(&u), LockState::Unlocked);
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::UnitUnlocked { reason: UnlockReason::SendFailed, .. }
    ));

    // the unit is usable again
    gate.notify_one();
    let round_trip = fx.coordinator.begin_send(fx.request(&u)).await.unwrap();
    assert!(fx.coordinator.is_locked(&u));
    assert_eq!(fx.tool.sent().len(), 2);
    drop(round_trip);
    fx.coordinator.force_unlock(&u).unwrap();
}

#[tokio::test]
async fn test_force_unlock_ignores_late_callback() {
    let fx = Fixture::new(FakeTool::default());
    let mut events = fx.events.subscribe();
    let u = unit("u5");
    fx.store.save(&edited_grid("kept"), &u).unwrap();

    let round_trip = fx.coordinator.begin_send(fx.request(&u)).await.unwrap();
    let port = round_trip.port;
    next_event(&mut events).await;

    fx.coordinator.force_unlock(&u).unwrap();
    assert_eq!(fx.coordinator.lock_state(&u), LockState::Unlocked);
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::UnitUnlocked { reason: UnlockReason::ForceUnlocked, .. }
    ));
    assert_eq!(round_trip.finished().await.unwrap(), RoundTripOutcome::ForceUnlocked);

    // the listener is gone; a late editor reply cannot reach the store
    fx.write_handoff("late");
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    assert_eq!(fx.store.load(&u).unwrap(), edited_grid("kept"));

    let err = fx.coordinator.force_unlock(&u).unwrap_err();
    assert!(matches!(err, Error::NotLocked(_)));
}

#[tokio::test]
async fn test_send_failure_returns_unit_to_unlocked() {
    let fx = Fixture::new(FakeTool {
        refuse: true,
        ..FakeTool::default()
    });
    let mut events = fx.events.subscribe();
    let u = unit("u6");

    let err = fx.coordinator.begin_send(fx.request(&u)).await.unwrap_err();
    assert!(matches!(err, Error::ExternalTool(_)));
    assert_eq!(fx.coordinator.lock_state(&u), LockState::Unlocked);
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::UnitUnlocked { reason: UnlockReason::SendFailed, .. }
    ));

    // not sticky: the next attempt reaches the tool again
    assert!(fx.coordinator.begin_send(fx.request(&u)).await.is_err());
    assert_eq!(fx.tool.sent().len(), 2);
}

#[tokio::test]
async fn test_locked_units_are_independent() {
    let fx = Fixture::new(FakeTool::default());
    let a = unit("u1");
    let b = unit("u2");

    let _ra = fx.coordinator.begin_send(fx.request(&b)).await.unwrap();
    let _rb = fx.coordinator.begin_send(fx.request(&a)).await.unwrap();
    assert_eq!(fx.coordinator.locked_units(), vec![a.clone(), b.clone()]);

    fx.coordinator.force_unlock(&a).unwrap();
    assert_eq!(fx.coordinator.locked_units(), vec![b.clone()]);
    assert!(fx.coordinator.is_locked(&b));
    assert!(!fx.coordinator.is_locked(&unit("u9")));
}
