//! Optimistic sync integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use annokit_core::{
    AppEvent, EventBus, EventFilter, NotificationLevel, RemoteError, ShapeKind, SyncEvent,
};
use annokit_shapes::{
    AnnotationSession, BoxPatch, Circle, Ellipse, FileShapes, Line, Open, PersistenceService,
    Point, ShapeRecord, SharedSession, SyncEngine, SyncOutcome,
};

#[derive(Default)]
struct MockService {
    fail: AtomicBool,
    gate: Option<Arc<Notify>>,
    saved: Mutex<Vec<ShapeRecord>>,
    deleted: Mutex<Vec<String>>,
}

impl MockService {
    fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    fn gated(gate: Arc<Notify>, fail: bool) -> Self {
        Self {
            fail: AtomicBool::new(fail),
            gate: Some(gate),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable {
                reason: "offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// The service's canonical copy carries a server-side note.
fn stamp(record: ShapeRecord) -> ShapeRecord {
    let note = Some("saved".to_string());
    match record {
        ShapeRecord::Circle(mut s) => {
            s.attributes.notes = note;
            ShapeRecord::Circle(s)
        }
        ShapeRecord::Line(mut s) => {
            s.attributes.notes = note;
            ShapeRecord::Line(s)
        }
        other => other,
    }
}

#[async_trait]
impl PersistenceService for MockService {
    async fn save_shape(&self, record: ShapeRecord) -> Result<ShapeRecord, RemoteError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.saved.lock().push(record.clone());
        self.check()?;
        Ok(stamp(record))
    }

    async fn delete_shape(&self, _kind: ShapeKind, id: &str) -> Result<(), RemoteError> {
        self.deleted.lock().push(id.to_string());
        self.check()
    }
}

/// Bus with a listener that keeps every published event.
#[derive(Clone)]
struct Recorder {
    bus: Arc<EventBus>,
    log: Arc<Mutex<Vec<AppEvent>>>,
}

impl Recorder {
    fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        bus.subscribe(EventFilter::All, move |event| sink.lock().push(event));
        Self { bus, log }
    }

    fn events(&self) -> Vec<AppEvent> {
        self.log.lock().clone()
    }
}

fn setup(service: MockService) -> (SyncEngine<MockService>, SharedSession, Recorder) {
    let recorder = Recorder::new();
    let bus = recorder.bus.clone();
    let mut shapes = FileShapes::new();
    shapes.circles.set(vec![
        Circle::with_id("c1", 10.0, 10.0, 5.0, 5.0),
        Circle::with_id("c2", 0.0, 0.0, 1.0, 1.0),
    ]);
    shapes
        .lines
        .set(vec![Line::with_id("l1", vec![Point::with_id("p0", 0.0, 0.0)])]);

    let mut session = AnnotationSession::new().with_events(bus.clone());
    session.load("file-1", shapes).unwrap();
    let session: SharedSession = Arc::new(Mutex::new(session));

    let engine = SyncEngine::new(session.clone(), Arc::new(service), bus);
    (engine, session, recorder)
}

fn sync_events(recorder: &Recorder) -> Vec<SyncEvent> {
    recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::Sync(s) => Some(s),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_update_applies_canonical_record() {
    let (engine, session, recorder) = setup(MockService::default());

    let outcome = engine
        .update::<Circle>("c1", &BoxPatch::position(3.0, 4.0))
        .await;

    let SyncOutcome::Reconciled(canonical) = outcome else {
        panic!("expected reconcile, got {:?}", outcome);
    };
    assert_eq!((canonical.x, canonical.y), (3.0, 4.0));
    assert_eq!(canonical.attributes.notes.as_deref(), Some("saved"));
    assert_eq!(session.lock().get::<Circle>("c1"), Some(&canonical));
    assert_eq!(
        sync_events(&recorder),
        vec![SyncEvent::Reconciled {
            kind: ShapeKind::Circle,
            id: "c1".to_string()
        }]
    );
}

#[tokio::test]
async fn test_failed_update_rolls_back_and_notifies() {
    let (engine, session, recorder) = setup(MockService::failing());
    let before = session.lock().get::<Circle>("c1").cloned().unwrap();

    let outcome = engine.resize::<Ellipse>("c1", 30.0, 5.0).await;

    assert!(matches!(outcome, SyncOutcome::RolledBack(_)));
    assert_eq!(session.lock().get::<Circle>("c1"), Some(&before));

    let notifications: Vec<_> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::Notification(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
    assert!(notifications[0].message.contains("circle c1"));
}

#[tokio::test]
async fn test_newer_local_edit_survives_failure() {
    let gate = Arc::new(Notify::new());
    let (engine, session, recorder) = setup(MockService::gated(gate.clone(), true));

    let patch = BoxPatch::position(5.0, 5.0);
    let remote = engine.update::<Circle>("c1", &patch);
    let local = async {
        session.lock().circles_mut().update(
            "c1",
            &BoxPatch {
                width: Some(99.0),
                ..Default::default()
            },
        );
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(remote, local);

    assert!(matches!(outcome, SyncOutcome::Superseded(_)));
    let circle = session.lock().get::<Circle>("c1").cloned().unwrap();
    assert_eq!((circle.x, circle.width), (5.0, 99.0));
    assert!(sync_events(&recorder).contains(&SyncEvent::Superseded {
        kind: ShapeKind::Circle,
        id: "c1".to_string()
    }));
}

#[tokio::test]
async fn test_late_reply_does_not_clobber_local_edit() {
    let gate = Arc::new(Notify::new());
    let (engine, session, _bus) = setup(MockService::gated(gate.clone(), false));

    let remote = engine.add_points::<Open>("l1", Point::with_id("p1", 1.0, 1.0));
    let local = async {
        session
            .lock()
            .lines_mut()
            .add_points("l1", Point::with_id("p2", 2.0, 2.0));
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(remote, local);

    assert!(matches!(outcome, SyncOutcome::Stale(_)));
    let line = session.lock().get::<Line>("l1").cloned().unwrap();
    let ids: Vec<&str> = line.points.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p0", "p1", "p2"]);
    assert_eq!(line.attributes.notes, None);
}

#[tokio::test]
async fn test_missing_shape_is_not_sent() {
    let service = Arc::new(MockService::default());
    let (_, session, recorder) = setup(MockService::default());
    let engine = SyncEngine::new(session.clone(), service.clone(), recorder.bus);

    let outcome = engine.delete_point::<Open>("nope", "p0").await;
    assert_eq!(outcome, SyncOutcome::Missing);
    let outcome = engine.delete::<Circle>("nope").await;
    assert_eq!(outcome, SyncOutcome::Missing);

    assert!(service.saved.lock().is_empty());
    assert!(service.deleted.lock().is_empty());
}

#[tokio::test]
async fn test_noop_edit_skips_service() {
    let service = Arc::new(MockService::default());
    let (_, session, recorder) = setup(MockService::default());
    let engine = SyncEngine::new(session, service.clone(), recorder.bus);

    let outcome = engine.delete_point::<Open>("l1", "absent-point").await;
    assert!(outcome.is_reconciled());
    assert!(service.saved.lock().is_empty());
}

#[tokio::test]
async fn test_failed_add_is_removed() {
    let (engine, session, _bus) = setup(MockService::failing());

    let outcome = engine
        .add(Circle::with_id("c3", 1.0, 1.0, 1.0, 1.0))
        .await
        .unwrap();
    assert!(matches!(outcome, SyncOutcome::RolledBack(_)));
    assert!(session.lock().get::<Circle>("c3").is_none());

    let duplicate = engine.add(Circle::with_id("c1", 0.0, 0.0, 0.0, 0.0)).await;
    assert!(duplicate.is_err());
}

#[tokio::test]
async fn test_failed_delete_restores_position() {
    let (engine, session, _bus) = setup(MockService::failing());

    let outcome = engine.delete::<Circle>("c1").await;

    assert!(matches!(outcome, SyncOutcome::RolledBack(_)));
    let guard = session.lock();
    let ids: Vec<&str> = guard.collection::<Circle>().ids().collect();
    assert_eq!(ids, ["c1", "c2"]);
}

#[tokio::test]
async fn test_delete_reconciles() {
    let (engine, session, _bus) = setup(MockService::default());

    let outcome = engine.delete::<Circle>("c2").await;

    assert!(outcome.is_reconciled());
    assert_eq!(session.lock().shape_count(), 2);
}

#[tokio::test]
async fn test_listeners_can_read_session_during_sync() {
    let service = Arc::new(MockService::default());
    let (_, session, recorder) = setup(MockService::default());
    let engine = SyncEngine::new(session.clone(), service.clone(), recorder.bus.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let blocked = Arc::new(Mutex::new(0usize));

    let watcher = session.clone();
    let (seen_in, blocked_in) = (seen.clone(), blocked.clone());
    recorder.bus.subscribe(EventFilter::All, move |_| match watcher.try_lock() {
        Some(guard) => seen_in.lock().push(guard.shape_count()),
        None => *blocked_in.lock() += 1,
    });

    engine
        .update::<Circle>("c1", &BoxPatch::position(1.0, 1.0))
        .await;
    engine
        .add(Circle::with_id("c3", 2.0, 2.0, 1.0, 1.0))
        .await
        .unwrap();
    engine.delete::<Circle>("c2").await;

    service.fail.store(true, Ordering::SeqCst);
    let outcome = engine.resize::<Ellipse>("c1", 40.0, 40.0).await;
    assert!(matches!(outcome, SyncOutcome::RolledBack(_)));

    assert_eq!(*blocked.lock(), 0);
    assert!(seen.lock().len() >= 6);
    assert_eq!(seen.lock().last(), Some(&3));
}
