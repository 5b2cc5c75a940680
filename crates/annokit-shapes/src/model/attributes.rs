use serde::{Deserialize, Serialize};

const DEFAULT_STROKE: &str = "#2196f3";
const DEFAULT_FILL: &str = "rgba(33, 150, 243, 0.2)";
const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Display, classification and ownership fields common to every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    #[serde(default = "default_stroke")]
    pub stroke: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_fill")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_frame: Option<u32>,
}

fn default_stroke() -> String {
    DEFAULT_STROKE.to_string()
}

fn default_fill() -> String {
    DEFAULT_FILL.to_string()
}

fn default_stroke_width() -> f64 {
    DEFAULT_STROKE_WIDTH
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            stroke: default_stroke(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            color: default_fill(),
            class_id: None,
            attribute: None,
            notes: None,
            text: None,
            org_id: None,
            project_id: None,
            file_id: None,
            at_frame: None,
        }
    }
}

impl Attributes {
    /// Attributes owned by a file within a project and organization.
    pub fn owned_by(
        org_id: impl Into<String>,
        project_id: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Self {
        Self {
            org_id: Some(org_id.into()),
            project_id: Some(project_id.into()),
            file_id: Some(file_id.into()),
            ..Self::default()
        }
    }
}

/// Partial update of [`Attributes`].
///
/// `None` leaves a field untouched. For optional attributes, `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributePatch {
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub color: Option<String>,
    pub class_id: Option<Option<String>>,
    pub attribute: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub text: Option<Option<String>>,
    pub at_frame: Option<Option<u32>>,
}

impl AttributePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, target: &mut Attributes) {
        if let Some(stroke) = &self.stroke {
            target.stroke = stroke.clone();
        }
        if let Some(width) = self.stroke_width {
            target.stroke_width = width;
        }
        if let Some(color) = &self.color {
            target.color = color.clone();
        }
        if let Some(class_id) = &self.class_id {
            target.class_id = class_id.clone();
        }
        if let Some(attribute) = &self.attribute {
            target.attribute = attribute.clone();
        }
        if let Some(notes) = &self.notes {
            target.notes = notes.clone();
        }
        if let Some(text) = &self.text {
            target.text = text.clone();
        }
        if let Some(frame) = self.at_frame {
            target.at_frame = frame;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_sets_and_clears() {
        let mut attrs = Attributes {
            notes: Some("check".to_string()),
            ..Attributes::default()
        };

        AttributePatch {
            class_id: Some(Some("cls-1".to_string())),
            notes: Some(None),
            stroke_width: Some(4.0),
            ..Default::default()
        }
        .apply(&mut attrs);

        assert_eq!(attrs.class_id.as_deref(), Some("cls-1"));
        assert_eq!(attrs.notes, None);
        assert_eq!(attrs.stroke_width, 4.0);
        assert_eq!(attrs.stroke, DEFAULT_STROKE);
    }

    #[test]
    fn test_camel_case_wire_names() {
        let attrs = Attributes {
            class_id: Some("c".to_string()),
            at_frame: Some(12),
            ..Attributes::owned_by("o", "p", "f")
        };
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["classId"], "c");
        assert_eq!(json["atFrame"], 12);
        assert_eq!(json["strokeWidth"], 2.0);
        assert_eq!(json["orgId"], "o");
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn test_missing_display_fields_default() {
        let attrs: Attributes = serde_json::from_str("{}").unwrap();
        assert_eq!(attrs, Attributes::default());
    }
}
