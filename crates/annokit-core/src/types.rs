//! Shared identifiers and enums.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh identifier for a shape, point or record.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Kinds of annotation shapes.
///
/// Each kind is held in its own collection; a shape never moves between
/// kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Rectangle,
    Line,
    Polygon,
    Face,
}

impl ShapeKind {
    /// All kinds, in the order sessions report them.
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Circle,
        ShapeKind::Rectangle,
        ShapeKind::Line,
        ShapeKind::Polygon,
        ShapeKind::Face,
    ];
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeKind::Circle => write!(f, "circle"),
            ShapeKind::Rectangle => write!(f, "rectangle"),
            ShapeKind::Line => write!(f, "line"),
            ShapeKind::Polygon => write!(f, "polygon"),
            ShapeKind::Face => write!(f, "face"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ShapeKind::Polygon).unwrap();
        assert_eq!(json, "\"polygon\"");
    }
}
