//! Annotation document files.
//!
//! A document stores every shape of one media file as JSON together with a
//! small metadata header. It is what the file loader hands to
//! [`AnnotationSession::load`](crate::AnnotationSession::load).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use annokit_core::{DocumentError, Result};

use crate::session::{AnnotationSession, FileShapes};

/// Document format version
pub const DOCUMENT_VERSION: &str = "1.0";

/// Document header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub file_id: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// Complete annotation document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    pub version: String,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub shapes: FileShapes,
}

impl AnnotationDocument {
    pub fn new(file_id: impl Into<String>, shapes: FileShapes) -> Self {
        let now = Utc::now();
        Self {
            version: DOCUMENT_VERSION.to_string(),
            metadata: DocumentMetadata {
                file_id: file_id.into(),
                created: now,
                modified: now,
                project_id: None,
            },
            shapes,
        }
    }

    /// Capture the session's open file. Returns `None` when no file is open.
    pub fn from_session(session: &AnnotationSession) -> Option<Self> {
        let file_id = session.file_id()?;
        Some(Self::new(file_id, session.snapshot()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self =
            serde_json::from_str(json).map_err(|e| DocumentError::Malformed {
                reason: e.to_string(),
            })?;
        document.check_version()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let document = Self::from_json(&content)?;
        tracing::debug!(
            path = %path.display(),
            file_id = %document.metadata.file_id,
            "document loaded"
        );
        Ok(document)
    }

    /// Write the document, stamping the modification time.
    pub fn save_to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.metadata.modified = Utc::now();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| DocumentError::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        tracing::debug!(path = %path.display(), "document saved");
        Ok(())
    }

    /// Open this document in `session`, replacing its collections.
    pub fn open_in(self, session: &mut AnnotationSession) -> Result<usize> {
        Ok(session.load(self.metadata.file_id, self.shapes)?)
    }

    fn check_version(&self) -> Result<()> {
        let major = |v: &str| v.split('.').next().map(str::to_string);
        if major(&self.version) != major(DOCUMENT_VERSION) {
            return Err(DocumentError::UnsupportedVersion {
                found: self.version.clone(),
                expected: DOCUMENT_VERSION.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Circle;
    use annokit_core::Error;

    #[test]
    fn test_minor_versions_are_accepted() {
        let json = r#"{
            "version": "1.3",
            "metadata": {
                "fileId": "f1",
                "created": "2024-01-01T00:00:00Z",
                "modified": "2024-01-01T00:00:00Z"
            },
            "shapes": { "circles": [{"id": "c", "x": 1, "y": 2, "width": 3, "height": 4}] }
        }"#;
        let doc = AnnotationDocument::from_json(json).unwrap();
        assert_eq!(doc.shapes.circles.len(), 1);
        assert!(doc.shapes.lines.is_empty());
    }

    #[test]
    fn test_unknown_major_version_is_rejected() {
        let mut doc = AnnotationDocument::new("f1", FileShapes::new());
        doc.version = "2.0".to_string();
        let json = doc.to_json().unwrap();
        let err = AnnotationDocument::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            Error::Document(DocumentError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = AnnotationDocument::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Document(DocumentError::Malformed { .. })));
    }

    #[test]
    fn test_open_in_session() {
        let mut shapes = FileShapes::new();
        shapes
            .circles
            .add(Circle::with_id("c1", 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        let doc = AnnotationDocument::new("f9", shapes);

        let mut session = AnnotationSession::new();
        doc.open_in(&mut session).unwrap();
        assert_eq!(session.file_id(), Some("f9"));
        assert!(session.get::<Circle>("c1").is_some());
    }
}
