//! Geometry primitives and annotation shape records.
//!
//! Every shape kind is one of two generic records:
//! - [`BoxShape`] for shapes defined by an anchor corner and extents
//!   (circles/ellipses and rectangles)
//! - [`PathShape`] for shapes defined by an ordered point list
//!   (lines, polygons and face masks)
//!
//! The marker type parameter only selects the kind; all behaviour is shared.

use serde::{Deserialize, Serialize};

use annokit_core::{new_id, ShapeKind};

mod attributes;
mod box_shape;
mod path_shape;

pub use attributes::{AttributePatch, Attributes};
pub use box_shape::{BoxKind, BoxPatch, BoxShape, Ellipse, Rect};
pub use path_shape::{Closed, FaceMask, Open, PathKind, PathPatch, PathShape, PointBatch};

/// Ellipse/circle annotation.
pub type Circle = BoxShape<Ellipse>;
/// Axis-aligned rectangle annotation.
pub type Rectangle = BoxShape<Rect>;
/// Open polyline annotation.
pub type Line = PathShape<Open>;
/// Closed polygon annotation.
pub type Polygon = PathShape<Closed>;
/// Face mask outline.
pub type Face = PathShape<FaceMask>;

/// A vertex of a point-list shape, unique by `id` within its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point with a freshly generated id.
    pub fn new(x: f64, y: f64) -> Self {
        Self::with_id(new_id(), x, y)
    }

    pub fn with_id(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self { id: id.into(), x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Behaviour shared by every annotation record held in a collection.
pub trait Shape: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Partial update record for this shape.
    type Patch: std::fmt::Debug;

    /// Collection kind this shape belongs to.
    const KIND: ShapeKind;

    fn id(&self) -> &str;

    fn attributes(&self) -> &Attributes;

    /// Merge the given fields into this shape. The id is never changed.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Frame this shape is pinned to, `None` for image-wide shapes.
    fn at_frame(&self) -> Option<u32> {
        self.attributes().at_frame
    }
}
