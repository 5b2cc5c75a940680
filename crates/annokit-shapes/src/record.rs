//! Kind-tagged shape records exchanged with the persistence service.

use serde::{Deserialize, Serialize};

use annokit_core::ShapeKind;

use crate::model::{Circle, Face, Line, Polygon, Rectangle, Shape};

/// Any shape, tagged with its kind on the wire (`"kind": "polygon"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeRecord {
    Circle(Circle),
    Rectangle(Rectangle),
    Line(Line),
    Polygon(Polygon),
    Face(Face),
}

impl ShapeRecord {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeRecord::Circle(_) => ShapeKind::Circle,
            ShapeRecord::Rectangle(_) => ShapeKind::Rectangle,
            ShapeRecord::Line(_) => ShapeKind::Line,
            ShapeRecord::Polygon(_) => ShapeKind::Polygon,
            ShapeRecord::Face(_) => ShapeKind::Face,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ShapeRecord::Circle(s) => s.id(),
            ShapeRecord::Rectangle(s) => s.id(),
            ShapeRecord::Line(s) => s.id(),
            ShapeRecord::Polygon(s) => s.id(),
            ShapeRecord::Face(s) => s.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    #[test]
    fn test_record_is_kind_tagged() {
        let record = ShapeRecord::Polygon(Polygon::with_id(
            "pg",
            vec![Point::with_id("a", 1.0, 2.0)],
        ));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "polygon");
        assert_eq!(json["points"][0]["x"], 1.0);

        let back: ShapeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), ShapeKind::Polygon);
        assert_eq!(back.id(), "pg");
    }
}
