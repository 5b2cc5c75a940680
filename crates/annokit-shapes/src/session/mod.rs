//! Editing session for the currently open file.
//!
//! The session exclusively owns one collection per shape kind. Loading a
//! file replaces every collection wholesale; nothing is persisted
//! automatically. Mutations go through [`ShapesMut`] handles so that each
//! change is observable on the session's event bus.

mod handle;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use annokit_core::{AppEvent, EventBus, ShapeError, ShapeEvent, ShapeKind};

use crate::collection::ShapeCollection;
use crate::model::{Circle, Face, Line, Polygon, Rectangle, Shape};
use crate::record::ShapeRecord;

use handle::Sink;
pub use handle::ShapesMut;

/// All shape collections of one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileShapes {
    pub circles: ShapeCollection<Circle>,
    pub rectangles: ShapeCollection<Rectangle>,
    pub lines: ShapeCollection<Line>,
    pub polygons: ShapeCollection<Polygon>,
    pub faces: ShapeCollection<Face>,
}

impl FileShapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape_count(&self) -> usize {
        ShapeKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }

    pub fn count(&self, kind: ShapeKind) -> usize {
        match kind {
            ShapeKind::Circle => self.circles.len(),
            ShapeKind::Rectangle => self.rectangles.len(),
            ShapeKind::Line => self.lines.len(),
            ShapeKind::Polygon => self.polygons.len(),
            ShapeKind::Face => self.faces.len(),
        }
    }

    /// Number of shapes of any kind visible on `frame`.
    pub fn count_in_frame(&self, frame: u32) -> usize {
        self.circles.in_frame(frame).count()
            + self.rectangles.in_frame(frame).count()
            + self.lines.in_frame(frame).count()
            + self.polygons.in_frame(frame).count()
            + self.faces.in_frame(frame).count()
    }

    /// Distinct frame indices referenced by any shape, ascending.
    pub fn frames(&self) -> Vec<u32> {
        let mut frames: Vec<u32> = self
            .records()
            .filter_map(|record| match &record {
                ShapeRecord::Circle(s) => s.at_frame(),
                ShapeRecord::Rectangle(s) => s.at_frame(),
                ShapeRecord::Line(s) => s.at_frame(),
                ShapeRecord::Polygon(s) => s.at_frame(),
                ShapeRecord::Face(s) => s.at_frame(),
            })
            .collect();
        frames.sort_unstable();
        frames.dedup();
        frames
    }

    /// Every shape as a kind-tagged record, grouped by kind.
    pub fn records(&self) -> impl Iterator<Item = ShapeRecord> + '_ {
        self.circles
            .iter()
            .cloned()
            .map(ShapeRecord::Circle)
            .chain(self.rectangles.iter().cloned().map(ShapeRecord::Rectangle))
            .chain(self.lines.iter().cloned().map(ShapeRecord::Line))
            .chain(self.polygons.iter().cloned().map(ShapeRecord::Polygon))
            .chain(self.faces.iter().cloned().map(ShapeRecord::Face))
    }

    fn clear(&mut self) {
        self.circles.clear();
        self.rectangles.clear();
        self.lines.clear();
        self.polygons.clear();
        self.faces.clear();
    }
}

/// A shape kind that has a slot in [`FileShapes`].
pub trait Stored: Shape + Sized {
    fn slot(shapes: &FileShapes) -> &ShapeCollection<Self>;
    fn slot_mut(shapes: &mut FileShapes) -> &mut ShapeCollection<Self>;
    fn into_record(self) -> ShapeRecord;
    fn from_record(record: ShapeRecord) -> Option<Self>;
}

macro_rules! impl_stored {
    ($shape:ty, $field:ident, $variant:ident) => {
        impl Stored for $shape {
            fn slot(shapes: &FileShapes) -> &ShapeCollection<Self> {
                &shapes.$field
            }

            fn slot_mut(shapes: &mut FileShapes) -> &mut ShapeCollection<Self> {
                &mut shapes.$field
            }

            fn into_record(self) -> ShapeRecord {
                ShapeRecord::$variant(self)
            }

            fn from_record(record: ShapeRecord) -> Option<Self> {
                match record {
                    ShapeRecord::$variant(shape) => Some(shape),
                    _ => None,
                }
            }
        }
    };
}

impl_stored!(Circle, circles, Circle);
impl_stored!(Rectangle, rectangles, Rectangle);
impl_stored!(Line, lines, Line);
impl_stored!(Polygon, polygons, Polygon);
impl_stored!(Face, faces, Face);

/// Session behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Publish shape events on the session's bus.
    pub emit_events: bool,
    /// Refuse to load a file whose collections repeat an id, instead of
    /// dropping the repeats.
    pub strict_load: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            emit_events: true,
            strict_load: false,
        }
    }
}

/// Editing state of the currently open file.
#[derive(Debug, Default)]
pub struct AnnotationSession {
    file_id: Option<String>,
    shapes: FileShapes,
    bus: Option<Arc<EventBus>>,
    options: SessionOptions,
    is_modified: bool,
    deferred: Vec<AppEvent>,
}

/// Shape events held back while the session was locked.
///
/// Publish them once the lock is released so listeners can read the
/// session.
#[must_use = "deferred events are lost unless published"]
#[derive(Debug, Default)]
pub struct DeferredEvents {
    bus: Option<Arc<EventBus>>,
    events: Vec<AppEvent>,
}

impl DeferredEvents {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn publish(self) {
        if let Some(bus) = self.bus {
            bus.publish_all(self.events);
        }
    }
}

impl AnnotationSession {
    /// Create an empty session with no file open and no event bus.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }

    /// Whether any shape changed since the file was loaded or last saved.
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn mark_saved(&mut self) {
        self.is_modified = false;
    }

    /// Open a file, replacing every collection.
    ///
    /// Returns the number of shapes dropped because their id repeated. In
    /// strict mode a repeated id fails the load and the session is left as
    /// it was.
    pub fn load(
        &mut self,
        file_id: impl Into<String>,
        shapes: FileShapes,
    ) -> Result<usize, ShapeError> {
        let file_id = file_id.into();
        let mut next = FileShapes::new();
        let dropped = if self.options.strict_load {
            next.circles.try_set(shapes.circles.into_vec())?;
            next.rectangles.try_set(shapes.rectangles.into_vec())?;
            next.lines.try_set(shapes.lines.into_vec())?;
            next.polygons.try_set(shapes.polygons.into_vec())?;
            next.faces.try_set(shapes.faces.into_vec())?;
            0
        } else {
            next.circles.set(shapes.circles.into_vec())
                + next.rectangles.set(shapes.rectangles.into_vec())
                + next.lines.set(shapes.lines.into_vec())
                + next.polygons.set(shapes.polygons.into_vec())
                + next.faces.set(shapes.faces.into_vec())
        };

        self.shapes = next;
        self.is_modified = false;
        let shape_count = self.shapes.shape_count();
        tracing::info!(file_id = %file_id, shape_count, dropped, "file loaded");
        self.emit(ShapeEvent::Loaded {
            file_id: file_id.clone(),
            shape_count,
        });
        self.file_id = Some(file_id);
        Ok(dropped)
    }

    /// Close the open file and drop its shapes.
    pub fn close(&mut self) {
        self.shapes.clear();
        self.is_modified = false;
        if let Some(file_id) = self.file_id.take() {
            tracing::info!(file_id = %file_id, "file closed");
            self.emit(ShapeEvent::Closed { file_id });
        }
    }

    pub fn shapes(&self) -> &FileShapes {
        &self.shapes
    }

    /// Copy of the current collections, e.g. for saving.
    pub fn snapshot(&self) -> FileShapes {
        self.shapes.clone()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.shape_count()
    }

    pub fn collection<S: Stored>(&self) -> &ShapeCollection<S> {
        S::slot(&self.shapes)
    }

    pub fn get<S: Stored>(&self, id: &str) -> Option<&S> {
        S::slot(&self.shapes).get(id)
    }

    /// Mutable handle to the collection of `S`. Events are published as
    /// each change is made.
    pub fn shapes_mut<S: Stored>(&mut self) -> ShapesMut<'_, S> {
        let sink = match self.bus.as_deref() {
            Some(bus) if self.options.emit_events => Sink::Bus(bus),
            _ => Sink::Off,
        };
        ShapesMut {
            collection: S::slot_mut(&mut self.shapes),
            sink,
            modified: &mut self.is_modified,
        }
    }

    /// Mutable handle whose events are held on the session until
    /// [`take_deferred`](Self::take_deferred). Use it while the session sits
    /// behind a lock that event listeners may also take.
    pub fn shapes_mut_deferred<S: Stored>(&mut self) -> ShapesMut<'_, S> {
        let sink = if self.options.emit_events && self.bus.is_some() {
            Sink::Queue(&mut self.deferred)
        } else {
            Sink::Off
        };
        ShapesMut {
            collection: S::slot_mut(&mut self.shapes),
            sink,
            modified: &mut self.is_modified,
        }
    }

    /// Take the events held by deferred handles, in the order they happened.
    pub fn take_deferred(&mut self) -> DeferredEvents {
        DeferredEvents {
            bus: self.bus.clone(),
            events: std::mem::take(&mut self.deferred),
        }
    }

    pub fn circles_mut(&mut self) -> ShapesMut<'_, Circle> {
        self.shapes_mut()
    }

    pub fn rectangles_mut(&mut self) -> ShapesMut<'_, Rectangle> {
        self.shapes_mut()
    }

    pub fn lines_mut(&mut self) -> ShapesMut<'_, Line> {
        self.shapes_mut()
    }

    pub fn polygons_mut(&mut self) -> ShapesMut<'_, Polygon> {
        self.shapes_mut()
    }

    pub fn faces_mut(&mut self) -> ShapesMut<'_, Face> {
        self.shapes_mut()
    }

    fn emit(&self, event: ShapeEvent) {
        if !self.options.emit_events {
            return;
        }
        if let Some(bus) = &self.bus {
            bus.emit(AppEvent::Shape(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoxPatch, Point};
    use annokit_core::EventFilter;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<AppEvent>>>;

    fn recording_bus() -> (Arc<EventBus>, Log) {
        let bus = Arc::new(EventBus::new());
        let log = Log::default();
        let sink = log.clone();
        bus.subscribe(EventFilter::All, move |event| sink.lock().push(event));
        (bus, log)
    }

    fn updated(kind: ShapeKind, id: &str) -> AppEvent {
        AppEvent::Shape(ShapeEvent::Updated {
            kind,
            id: id.to_string(),
        })
    }

    fn sample() -> FileShapes {
        let mut shapes = FileShapes::new();
        shapes.circles.set(vec![Circle::with_id("c1", 0.0, 0.0, 4.0, 4.0)]);
        shapes.lines.set(vec![Line::with_id(
            "l1",
            vec![Point::with_id("p0", 0.0, 0.0)],
        )]);
        shapes
    }

    #[test]
    fn test_load_replaces_everything() {
        let mut session = AnnotationSession::new();
        session.load("f1", sample()).unwrap();
        session
            .polygons_mut()
            .add(Polygon::with_id("pg", Vec::new()))
            .unwrap();
        assert_eq!(session.shape_count(), 3);
        assert!(session.is_modified());

        let mut next = FileShapes::new();
        next.faces.set(vec![Face::with_id("face", Vec::new())]);
        session.load("f2", next).unwrap();

        assert_eq!(session.file_id(), Some("f2"));
        assert_eq!(session.shape_count(), 1);
        assert!(session.get::<Polygon>("pg").is_none());
        assert!(!session.is_modified());
    }

    #[test]
    fn test_strict_load_keeps_previous_state() {
        let mut session = AnnotationSession::new().with_options(SessionOptions {
            strict_load: true,
            ..Default::default()
        });
        session.load("f1", sample()).unwrap();

        let mut bad = FileShapes::new();
        bad.rectangles = serde_json::from_str(
            r#"[{"id":"r","x":0,"y":0,"width":1,"height":1},
                {"id":"r","x":0,"y":0,"width":1,"height":1}]"#,
        )
        .unwrap();
        assert!(session.load("f2", bad).is_err());
        assert_eq!(session.file_id(), Some("f1"));
        assert_eq!(session.shape_count(), 2);
    }

    #[test]
    fn test_mutations_publish_events() {
        let (bus, log) = recording_bus();
        let mut session = AnnotationSession::new().with_events(bus.clone());
        session.load("f1", sample()).unwrap();

        session.circles_mut().resize("c1", 9.0, 9.0);
        session.circles_mut().update("missing", &BoxPatch::position(1.0, 1.0));
        session.lines_mut().delete_point("l1", "nope");
        session.lines_mut().delete("l1");
        session.close();

        let events = log.lock().clone();
        assert_eq!(
            events,
            vec![
                AppEvent::Shape(ShapeEvent::Loaded {
                    file_id: "f1".to_string(),
                    shape_count: 2
                }),
                AppEvent::Shape(ShapeEvent::Updated {
                    kind: ShapeKind::Circle,
                    id: "c1".to_string()
                }),
                AppEvent::Shape(ShapeEvent::Deleted {
                    kind: ShapeKind::Line,
                    id: "l1".to_string()
                }),
                AppEvent::Shape(ShapeEvent::Closed {
                    file_id: "f1".to_string()
                }),
            ]
        );
        assert_eq!(session.shape_count(), 0);
    }

    #[test]
    fn test_events_can_be_disabled() {
        let (bus, log) = recording_bus();
        let mut session = AnnotationSession::new()
            .with_events(bus.clone())
            .with_options(SessionOptions {
                emit_events: false,
                ..Default::default()
            });
        session.load("f1", sample()).unwrap();
        session.circles_mut().delete("c1");
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_frames_are_sorted_and_distinct() {
        let mut shapes = sample();
        let mut late = Circle::with_id("c2", 0.0, 0.0, 1.0, 1.0);
        late.attributes.at_frame = Some(9);
        let mut early = Line::with_id("l2", Vec::new());
        early.attributes.at_frame = Some(2);
        let mut again = Rectangle::with_id("r1", 0.0, 0.0, 1.0, 1.0);
        again.attributes.at_frame = Some(9);
        shapes.circles.add(late).unwrap();
        shapes.lines.add(early).unwrap();
        shapes.rectangles.add(again).unwrap();

        assert_eq!(shapes.frames(), vec![2, 9]);
        assert_eq!(shapes.count_in_frame(9), 4);
        assert_eq!(shapes.count_in_frame(2), 3);
    }

    #[test]
    fn test_vertex_edits_record_only_real_changes() {
        let (bus, log) = recording_bus();
        let mut session = AnnotationSession::new().with_events(bus);
        session.load("f1", sample()).unwrap();
        log.lock().clear();

        session.lines_mut().move_point("l1", "missing", 5.0, 5.0);
        session.lines_mut().move_point("l1", "p0", 0.0, 0.0);
        session.lines_mut().add_points("l1", Vec::<Point>::new());
        session
            .lines_mut()
            .replace_points("l1", vec![Point::with_id("p0", 0.0, 0.0)]);
        assert!(log.lock().is_empty());
        assert!(!session.is_modified());

        let moved = session.lines_mut().move_point("l1", "p0", 3.0, 4.0).cloned();
        assert_eq!(moved.map(|l| (l.points[0].x, l.points[0].y)), Some((3.0, 4.0)));
        assert!(session.is_modified());

        session
            .lines_mut()
            .replace_points("l1", vec![Point::with_id("q", 1.0, 1.0)]);
        assert_eq!(session.get::<Line>("l1").map(|l| l.points.len()), Some(1));

        assert_eq!(
            *log.lock(),
            vec![updated(ShapeKind::Line, "l1"), updated(ShapeKind::Line, "l1")]
        );
    }

    #[test]
    fn test_try_delete_point_is_strict() {
        let mut session = AnnotationSession::new();
        session.load("f1", sample()).unwrap();

        let err = session.lines_mut().try_delete_point("l1", "zz").unwrap_err();
        assert!(matches!(err, ShapeError::PointNotFound { .. }));
        assert!(!session.is_modified());

        session.lines_mut().try_delete_point("l1", "p0").unwrap();
        assert!(session.is_modified());
    }

    #[test]
    fn test_deferred_events_wait_for_publish() {
        let (bus, log) = recording_bus();
        let mut session = AnnotationSession::new().with_events(bus);
        session.load("f1", sample()).unwrap();
        log.lock().clear();

        session.shapes_mut_deferred::<Circle>().delete("c1");
        session.shapes_mut_deferred::<Line>().delete("l1");
        assert!(log.lock().is_empty());

        let deferred = session.take_deferred();
        assert_eq!(deferred.len(), 2);
        deferred.publish();
        assert_eq!(log.lock().len(), 2);
        assert!(session.take_deferred().is_empty());
    }
}
