//! Two-phase shape changes: apply locally, then reconcile with the
//! persistence service.
//!
//! 1. The change is applied to the shared session immediately and the
//!    pre-edit record is kept.
//! 2. The changed record is sent to the service as a patch. On success the
//!    canonical record returned by the service replaces the local one; on
//!    failure the pre-edit record is restored and an error notification is
//!    published.
//!
//! In both outcomes the local record is only overwritten if it still equals
//! the optimistic value. A newer local edit always wins over a late reply.
//!
//! Events are collected while the session is locked and published after the
//! guard is dropped, so listeners may lock the session themselves.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use annokit_core::{
    AppEvent, EventBus, NotificationEvent, RemoteError, ShapeKind, SyncEvent,
};

use crate::model::{BoxKind, BoxShape, PathKind, PathShape, PointBatch, Shape};
use crate::record::ShapeRecord;
use crate::session::{AnnotationSession, ShapesMut, Stored};

/// Session shared between the UI thread and sync tasks.
pub type SharedSession = Arc<Mutex<AnnotationSession>>;

/// Remote store for shape records.
///
/// `save_shape` has patch semantics: the service merges the record into its
/// copy and returns the canonical merged record.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn save_shape(&self, record: ShapeRecord) -> Result<ShapeRecord, RemoteError>;

    async fn delete_shape(&self, kind: ShapeKind, id: &str) -> Result<(), RemoteError>;
}

/// Result of a two-phase change.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome<S> {
    /// The service accepted the change; holds the canonical record.
    Reconciled(S),
    /// The service accepted the change, but the shape was edited or removed
    /// locally in the meantime so the reply was not applied.
    Stale(S),
    /// The service failed and the pre-edit state was restored.
    RolledBack(RemoteError),
    /// The service failed but a newer local edit was kept.
    Superseded(RemoteError),
    /// The addressed shape does not exist locally; nothing was sent.
    Missing,
}

impl<S> SyncOutcome<S> {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, SyncOutcome::Reconciled(_))
    }

    pub fn error(&self) -> Option<&RemoteError> {
        match self {
            SyncOutcome::RolledBack(e) | SyncOutcome::Superseded(e) => Some(e),
            _ => None,
        }
    }
}

/// Applies shape changes optimistically and reconciles them remotely.
pub struct SyncEngine<P: ?Sized> {
    session: SharedSession,
    service: Arc<P>,
    bus: Arc<EventBus>,
}

impl<P: PersistenceService + ?Sized> SyncEngine<P> {
    pub fn new(session: SharedSession, service: Arc<P>, bus: Arc<EventBus>) -> Self {
        Self {
            session,
            service,
            bus,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Apply `edit` to the shape `id` and reconcile the result.
    ///
    /// `edit` runs under the session lock and must not block.
    pub async fn edit<S, F>(&self, id: &str, edit: F) -> SyncOutcome<S>
    where
        S: Stored,
        F: FnOnce(&mut ShapesMut<'_, S>),
    {
        let change = self.with_session(|session, _| {
            let mut shapes = session.shapes_mut_deferred::<S>();
            let before = shapes.get(id).cloned()?;
            edit(&mut shapes);
            // None when the edit removed the shape; nothing left to patch
            shapes.get(id).cloned().map(|after| (before, after))
        });
        let Some((before, after)) = change else {
            return SyncOutcome::Missing;
        };

        if before == after {
            return SyncOutcome::Reconciled(after);
        }

        let result = self.service.save_shape(after.clone().into_record()).await;
        self.settle_save(id, before, after, result)
    }

    pub async fn update<S: Stored>(&self, id: &str, patch: &S::Patch) -> SyncOutcome<S> {
        self.edit::<S, _>(id, |shapes| {
            shapes.update(id, patch);
        })
        .await
    }

    pub async fn resize<K>(&self, id: &str, x2: f64, y2: f64) -> SyncOutcome<BoxShape<K>>
    where
        K: BoxKind,
        BoxShape<K>: Stored,
    {
        self.edit::<BoxShape<K>, _>(id, |shapes| {
            shapes.resize(id, x2, y2);
        })
        .await
    }

    pub async fn add_points<K>(
        &self,
        id: &str,
        points: impl Into<PointBatch>,
    ) -> SyncOutcome<PathShape<K>>
    where
        K: PathKind,
        PathShape<K>: Stored,
    {
        let points: PointBatch = points.into();
        self.edit::<PathShape<K>, _>(id, move |shapes| {
            shapes.add_points(id, points);
        })
        .await
    }

    pub async fn delete_point<K>(&self, id: &str, point_id: &str) -> SyncOutcome<PathShape<K>>
    where
        K: PathKind,
        PathShape<K>: Stored,
    {
        self.edit::<PathShape<K>, _>(id, |shapes| {
            shapes.delete_point(id, point_id);
        })
        .await
    }

    /// Add a new shape locally and persist it.
    ///
    /// A local id conflict is reported as `Err` before anything is sent. A
    /// remote failure removes the shape again unless it was edited since.
    pub async fn add<S: Stored>(
        &self,
        shape: S,
    ) -> Result<SyncOutcome<S>, annokit_core::ShapeError> {
        let id = shape.id().to_string();
        self.with_session(|session, _| {
            session
                .shapes_mut_deferred::<S>()
                .add(shape.clone())
                .map(|_| ())
        })?;

        let result = self.service.save_shape(shape.clone().into_record()).await;
        let outcome = match result {
            Ok(record) => self.apply_canonical(&id, &shape, record),
            Err(err) => self.with_session(|session, events| {
                let mut shapes = session.shapes_mut_deferred::<S>();
                let rolled_back = shapes.get(&id) == Some(&shape);
                if rolled_back {
                    shapes.delete(&id);
                }
                Self::failed(S::KIND, &id, rolled_back, err, events)
            }),
        };
        Ok(outcome)
    }

    /// Delete a shape locally and remotely.
    ///
    /// A remote failure puts the shape back at its old position unless the
    /// id has been reused in the meantime.
    pub async fn delete<S: Stored>(&self, id: &str) -> SyncOutcome<S> {
        let removed = self.with_session(|session, _| {
            let mut shapes = session.shapes_mut_deferred::<S>();
            let index = shapes.collection().position(id)?;
            shapes.delete(id).map(|removed| (index, removed))
        });
        let Some((index, removed)) = removed else {
            return SyncOutcome::Missing;
        };

        match self.service.delete_shape(S::KIND, id).await {
            Ok(()) => {
                self.bus.emit(AppEvent::Sync(SyncEvent::Reconciled {
                    kind: S::KIND,
                    id: id.to_string(),
                }));
                SyncOutcome::Reconciled(removed)
            }
            Err(err) => self.with_session(|session, events| {
                let restored = session
                    .shapes_mut_deferred::<S>()
                    .insert_at(index, removed)
                    .is_ok();
                Self::failed(S::KIND, id, restored, err, events)
            }),
        }
    }

    fn settle_save<S: Stored>(
        &self,
        id: &str,
        before: S,
        after: S,
        result: Result<ShapeRecord, RemoteError>,
    ) -> SyncOutcome<S> {
        match result {
            Ok(record) => self.apply_canonical(id, &after, record),
            Err(err) => self.with_session(|session, events| {
                let mut shapes = session.shapes_mut_deferred::<S>();
                let rolled_back = shapes.get(id) == Some(&after);
                if rolled_back {
                    shapes.replace(before);
                }
                Self::failed(S::KIND, id, rolled_back, err, events)
            }),
        }
    }

    fn apply_canonical<S: Stored>(
        &self,
        id: &str,
        optimistic: &S,
        record: ShapeRecord,
    ) -> SyncOutcome<S> {
        let kind = record.kind();
        let Some(canonical) = S::from_record(record) else {
            tracing::error!(
                expected = %S::KIND,
                returned = %kind,
                id,
                "service returned wrong kind"
            );
            return SyncOutcome::Stale(optimistic.clone());
        };

        self.with_session(|session, events| {
            let mut shapes = session.shapes_mut_deferred::<S>();
            if shapes.get(id) != Some(optimistic) {
                tracing::debug!(kind = %S::KIND, id, "reply ignored; shape changed locally");
                return SyncOutcome::Stale(canonical);
            }
            if canonical != *optimistic {
                shapes.replace(canonical.clone());
            }
            events.push(AppEvent::Sync(SyncEvent::Reconciled {
                kind: S::KIND,
                id: id.to_string(),
            }));
            SyncOutcome::Reconciled(canonical)
        })
    }

    /// Run `f` under the session lock, then publish what it produced.
    ///
    /// Shape events from deferred handles go out first, followed by the
    /// events `f` pushed.
    fn with_session<R>(
        &self,
        f: impl FnOnce(&mut AnnotationSession, &mut Vec<AppEvent>) -> R,
    ) -> R {
        let mut events = Vec::new();
        let (result, deferred) = {
            let mut session = self.session.lock();
            let result = f(&mut session, &mut events);
            (result, session.take_deferred())
        };
        deferred.publish();
        self.bus.publish_all(events);
        result
    }

    fn failed<S>(
        kind: ShapeKind,
        id: &str,
        rolled_back: bool,
        err: RemoteError,
        events: &mut Vec<AppEvent>,
    ) -> SyncOutcome<S> {
        tracing::warn!(%kind, id, rolled_back, error = %err, "shape sync failed");
        let id = id.to_string();
        let event = if rolled_back {
            SyncEvent::RolledBack {
                kind,
                id: id.clone(),
            }
        } else {
            SyncEvent::Superseded {
                kind,
                id: id.clone(),
            }
        };
        events.push(AppEvent::Sync(event));
        events.push(AppEvent::Notification(NotificationEvent::error(format!(
            "Could not save {} {}: {}",
            kind, id, err
        ))));
        if rolled_back {
            SyncOutcome::RolledBack(err)
        } else {
            SyncOutcome::Superseded(err)
        }
    }
}
