//! Mutable per-kind access to the open file's shapes.

use annokit_core::{AppEvent, EventBus, ShapeError, ShapeEvent};

use crate::collection::ShapeCollection;
use crate::model::{BoxKind, BoxShape, PathKind, PathShape, Point, PointBatch, Shape};

/// Where a handle sends the events of its changes.
pub(super) enum Sink<'a> {
    Off,
    Bus(&'a EventBus),
    /// Held on the session until [`super::AnnotationSession::take_deferred`].
    Queue(&'a mut Vec<AppEvent>),
}

/// Mutable view of one collection that records changes on the session.
///
/// Every effective mutation marks the session modified and, when the
/// session has an event bus, produces a [`ShapeEvent`]. Calls that change
/// nothing (unknown ids, unknown points, empty batches) produce neither.
pub struct ShapesMut<'a, S: Shape> {
    pub(super) collection: &'a mut ShapeCollection<S>,
    pub(super) sink: Sink<'a>,
    pub(super) modified: &'a mut bool,
}

fn record(sink: &mut Sink<'_>, modified: &mut bool, event: ShapeEvent) {
    *modified = true;
    match sink {
        Sink::Off => {}
        Sink::Bus(bus) => bus.emit(AppEvent::Shape(event)),
        Sink::Queue(queue) => queue.push(AppEvent::Shape(event)),
    }
}

impl<S: Shape> ShapesMut<'_, S> {
    pub fn get(&self, id: &str) -> Option<&S> {
        self.collection.get(id)
    }

    pub fn collection(&self) -> &ShapeCollection<S> {
        self.collection
    }

    pub fn add(&mut self, shape: S) -> Result<&S, ShapeError> {
        let id = shape.id().to_string();
        let added = self.collection.add(shape)?;
        record(&mut self.sink, self.modified, ShapeEvent::Added { kind: S::KIND, id });
        Ok(added)
    }

    pub fn insert_at(&mut self, index: usize, shape: S) -> Result<&S, ShapeError> {
        let id = shape.id().to_string();
        let added = self.collection.insert_at(index, shape)?;
        record(&mut self.sink, self.modified, ShapeEvent::Added { kind: S::KIND, id });
        Ok(added)
    }

    pub fn update(&mut self, id: &str, patch: &S::Patch) -> Option<&S> {
        let shape = self.collection.update(id, patch)?;
        record(&mut self.sink, self.modified, updated::<S>(id));
        Some(shape)
    }

    pub fn try_update(&mut self, id: &str, patch: &S::Patch) -> Result<&S, ShapeError> {
        let shape = self.collection.try_update(id, patch)?;
        record(&mut self.sink, self.modified, updated::<S>(id));
        Ok(shape)
    }

    pub fn replace(&mut self, shape: S) -> Option<S> {
        let id = shape.id().to_string();
        let previous = self.collection.replace(shape)?;
        record(&mut self.sink, self.modified, updated::<S>(&id));
        Some(previous)
    }

    pub fn delete(&mut self, id: &str) -> Option<S> {
        let removed = self.collection.delete(id)?;
        record(
            &mut self.sink,
            self.modified,
            ShapeEvent::Deleted {
                kind: S::KIND,
                id: id.to_string(),
            },
        );
        Some(removed)
    }
}

impl<K: BoxKind> ShapesMut<'_, BoxShape<K>> {
    pub fn resize(&mut self, id: &str, x2: f64, y2: f64) -> Option<&BoxShape<K>> {
        let shape = self.collection.resize(id, x2, y2)?;
        record(&mut self.sink, self.modified, updated::<BoxShape<K>>(id));
        Some(shape)
    }
}

impl<K: PathKind> ShapesMut<'_, PathShape<K>> {
    pub fn add_points(
        &mut self,
        id: &str,
        points: impl Into<PointBatch>,
    ) -> Option<&PathShape<K>> {
        let points: PointBatch = points.into();
        if points.is_empty() {
            return self.collection.get(id);
        }
        let shape = self.collection.add_points(id, points)?;
        record(&mut self.sink, self.modified, updated::<PathShape<K>>(id));
        Some(shape)
    }

    pub fn delete_point(&mut self, id: &str, point_id: &str) -> Option<&PathShape<K>> {
        let had_point = self.collection.get(id)?.point(point_id).is_some();
        let shape = self.collection.delete_point(id, point_id)?;
        if had_point {
            record(&mut self.sink, self.modified, updated::<PathShape<K>>(id));
        }
        Some(shape)
    }

    pub fn try_delete_point(
        &mut self,
        id: &str,
        point_id: &str,
    ) -> Result<&PathShape<K>, ShapeError> {
        let shape = self.collection.try_delete_point(id, point_id)?;
        record(&mut self.sink, self.modified, updated::<PathShape<K>>(id));
        Ok(shape)
    }

    pub fn move_point(
        &mut self,
        id: &str,
        point_id: &str,
        x: f64,
        y: f64,
    ) -> Option<&PathShape<K>> {
        let moves = self
            .collection
            .get(id)?
            .point(point_id)
            .is_some_and(|p| (p.x, p.y) != (x, y));
        let shape = self.collection.move_point(id, point_id, x, y)?;
        if moves {
            record(&mut self.sink, self.modified, updated::<PathShape<K>>(id));
        }
        Some(shape)
    }

    pub fn replace_points(&mut self, id: &str, points: Vec<Point>) -> Option<&PathShape<K>> {
        let changes = self.collection.get(id)?.points != points;
        let shape = self.collection.replace_points(id, points)?;
        if changes {
            record(&mut self.sink, self.modified, updated::<PathShape<K>>(id));
        }
        Some(shape)
    }
}

fn updated<S: Shape>(id: &str) -> ShapeEvent {
    ShapeEvent::Updated {
        kind: S::KIND,
        id: id.to_string(),
    }
}
