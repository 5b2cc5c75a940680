//! # Annokit Shapes
//!
//! In-memory editing state for image and video annotations.
//!
//! ## Core Components
//!
//! - **Model**: points, bounding-box shapes (circles, rectangles) and
//!   point-list shapes (lines, polygons, face masks) with their display,
//!   class and ownership attributes
//! - **Collections**: ordered, id-unique sets of one shape kind with
//!   tolerant add/update/resize/delete and point-list editing
//! - **Session**: the open file's collections, replaced wholesale on load and
//!   observable through the event bus
//! - **Document**: JSON annotation files
//! - **Sync**: optimistic local edits reconciled with a persistence service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use annokit_shapes::{AnnotationSession, Circle, FileShapes};
//!
//! let mut session = AnnotationSession::new();
//! session.load("file-1", FileShapes::new())?;
//!
//! let circle = Circle::new(10.0, 10.0, 0.0, 0.0);
//! let id = circle.id.clone();
//! session.circles_mut().add(circle)?;
//! session.circles_mut().resize(&id, 30.0, 5.0);
//! ```

pub mod collection;
pub mod document;
pub mod model;
pub mod record;
pub mod session;
pub mod sync;

pub use collection::ShapeCollection;
pub use document::{AnnotationDocument, DocumentMetadata, DOCUMENT_VERSION};
pub use model::{
    AttributePatch, Attributes, BoxKind, BoxPatch, BoxShape, Circle, Closed, Ellipse, Face,
    FaceMask, Line, Open, PathKind, PathPatch, PathShape, Point, PointBatch, Polygon, Rect,
    Rectangle, Shape,
};
pub use record::ShapeRecord;
pub use session::{
    AnnotationSession, DeferredEvents, FileShapes, SessionOptions, ShapesMut, Stored,
};
pub use sync::{PersistenceService, SharedSession, SyncEngine, SyncOutcome};
