use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use annokit_core::{new_id, ShapeKind};

use super::{AttributePatch, Attributes, Point, Shape};

/// Selects which point-list kind a [`PathShape`] is.
pub trait PathKind:
    std::fmt::Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static
{
    const KIND: ShapeKind;
    /// Whether the last point connects back to the first.
    const CLOSED: bool;
}

/// Marker for open polylines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Open;

impl PathKind for Open {
    const KIND: ShapeKind = ShapeKind::Line;
    const CLOSED: bool = false;
}

/// Marker for closed polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Closed;

impl PathKind for Closed {
    const KIND: ShapeKind = ShapeKind::Polygon;
    const CLOSED: bool = true;
}

/// Marker for face mask outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceMask;

impl PathKind for FaceMask {
    const KIND: ShapeKind = ShapeKind::Face;
    const CLOSED: bool = true;
}

/// One point or an ordered batch of points to append to a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PointBatch {
    One(Point),
    Many(Vec<Point>),
}

impl PointBatch {
    pub fn is_empty(&self) -> bool {
        matches!(self, PointBatch::Many(points) if points.is_empty())
    }

    pub fn into_vec(self) -> Vec<Point> {
        match self {
            PointBatch::One(point) => vec![point],
            PointBatch::Many(points) => points,
        }
    }
}

impl From<Point> for PointBatch {
    fn from(point: Point) -> Self {
        PointBatch::One(point)
    }
}

impl From<Vec<Point>> for PointBatch {
    fn from(points: Vec<Point>) -> Self {
        PointBatch::Many(points)
    }
}

impl<const N: usize> From<[Point; N]> for PointBatch {
    fn from(points: [Point; N]) -> Self {
        PointBatch::Many(points.into())
    }
}

/// Shape defined by an ordered list of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathShape<K: PathKind> {
    pub id: String,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(flatten)]
    pub attributes: Attributes,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K: PathKind> PathShape<K> {
    /// Create a shape with a freshly generated id and default attributes.
    pub fn new(points: Vec<Point>) -> Self {
        Self::with_id(new_id(), points)
    }

    pub fn with_id(id: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            points,
            attributes: Attributes::default(),
            kind: PhantomData,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn is_closed(&self) -> bool {
        K::CLOSED
    }

    pub fn point(&self, point_id: &str) -> Option<&Point> {
        self.points.iter().find(|p| p.id == point_id)
    }

    /// Append points in the given order.
    pub fn push_points(&mut self, batch: impl Into<PointBatch>) {
        self.points.extend(batch.into().into_vec());
    }

    /// Remove the point with the given id. Returns whether one was removed.
    pub fn remove_point(&mut self, point_id: &str) -> bool {
        match self.points.iter().position(|p| p.id == point_id) {
            Some(index) => {
                self.points.remove(index);
                true
            }
            None => false,
        }
    }

    /// Move a vertex. Returns whether the point exists.
    pub fn move_point(&mut self, point_id: &str, x: f64, y: f64) -> bool {
        match self.points.iter_mut().find(|p| p.id == point_id) {
            Some(point) => {
                point.x = x;
                point.y = y;
                true
            }
            None => false,
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for point in &mut self.points {
            point.x += dx;
            point.y += dy;
        }
    }

    /// Total edge length, including the closing edge for closed kinds.
    pub fn length(&self) -> f64 {
        let open: f64 = self
            .points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum();
        match (K::CLOSED, self.points.first(), self.points.last()) {
            (true, Some(first), Some(last)) if self.points.len() > 2 => {
                open + last.distance_to(first)
            }
            _ => open,
        }
    }

    /// `(min_x, min_y, max_x, max_y)`, or `None` for an empty shape.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }
}

/// Partial update of a [`PathShape`].
///
/// `points` replaces the whole point list when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathPatch {
    pub points: Option<Vec<Point>>,
    pub attributes: AttributePatch,
}

impl PathPatch {
    pub fn points(points: Vec<Point>) -> Self {
        Self {
            points: Some(points),
            ..Self::default()
        }
    }

    pub fn attributes(attributes: AttributePatch) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }
}

impl<K: PathKind> Shape for PathShape<K> {
    type Patch = PathPatch;

    const KIND: ShapeKind = K::KIND;

    fn id(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn apply_patch(&mut self, patch: &PathPatch) {
        if let Some(points) = &patch.points {
            self.points = points.clone();
        }
        patch.attributes.apply(&mut self.attributes);
    }
}
