use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use annokit_core::{new_id, ShapeKind};

use super::{AttributePatch, Attributes, Shape};

/// Selects which bounding-box kind a [`BoxShape`] is.
pub trait BoxKind:
    std::fmt::Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static
{
    const KIND: ShapeKind;
}

/// Marker for ellipse/circle annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ellipse;

impl BoxKind for Ellipse {
    const KIND: ShapeKind = ShapeKind::Circle;
}

/// Marker for rectangle annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect;

impl BoxKind for Rect {
    const KIND: ShapeKind = ShapeKind::Rectangle;
}

/// Shape anchored at `(x, y)` with signed extents.
///
/// Width and height may be negative after a resize past the anchor; callers
/// that need a positive box use [`BoxShape::normalized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxShape<K: BoxKind> {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub attributes: Attributes,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K: BoxKind> BoxShape<K> {
    /// Create a shape with a freshly generated id and default attributes.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::with_id(new_id(), x, y, width, height)
    }

    pub fn with_id(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            attributes: Attributes::default(),
            kind: PhantomData,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Keep `(x, y)` fixed and move the opposite corner to `(x2, y2)`.
    pub fn resize_to(&mut self, x2: f64, y2: f64) {
        self.width = x2 - self.x;
        self.height = y2 - self.y;
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// `(min_x, min_y, width, height)` with non-negative extents.
    pub fn normalized(&self) -> (f64, f64, f64, f64) {
        let min_x = self.x.min(self.x + self.width);
        let min_y = self.y.min(self.y + self.height);
        (min_x, min_y, self.width.abs(), self.height.abs())
    }
}

/// Partial update of a [`BoxShape`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub attributes: AttributePatch,
}

impl BoxPatch {
    /// Move the anchor without touching the extents.
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
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

impl<K: BoxKind> Shape for BoxShape<K> {
    type Patch = BoxPatch;

    const KIND: ShapeKind = K::KIND;

    fn id(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn apply_patch(&mut self, patch: &BoxPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        patch.attributes.apply(&mut self.attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Circle, Rectangle};

    #[test]
    fn test_resize_allows_negative_extents() {
        let mut circle = Circle::with_id("c1", 10.0, 10.0, 0.0, 0.0);
        circle.resize_to(30.0, 5.0);
        assert_eq!(circle.width, 20.0);
        assert_eq!(circle.height, -5.0);
        assert_eq!(circle.normalized(), (10.0, 5.0, 20.0, 5.0));
    }

    #[test]
    fn test_patch_keeps_untouched_fields() {
        let mut rect = Rectangle::with_id("r1", 1.0, 2.0, 3.0, 4.0);
        rect.apply_patch(&BoxPatch::position(7.0, 8.0));
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (7.0, 8.0, 3.0, 4.0));
        assert_eq!(rect.id, "r1");
    }

    #[test]
    fn test_kinds_are_distinct() {
        assert_eq!(<Circle as Shape>::KIND, ShapeKind::Circle);
        assert_eq!(<Rectangle as Shape>::KIND, ShapeKind::Rectangle);
    }

    #[test]
    fn test_wire_format_is_flat() {
        let mut circle = Circle::with_id("c1", 1.0, 2.0, 3.0, 4.0);
        circle.attributes.at_frame = Some(3);
        let json = serde_json::to_value(&circle).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["atFrame"], 3);
        assert!(json.get("attributes").is_none());

        let back: Circle = serde_json::from_value(json).unwrap();
        assert_eq!(back, circle);
    }
}
