//! Remote entity records and the cache keys their mutations touch.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::keys::{EntityTag, QueryKey};

/// A record served by the remote service and cached by the query layer.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TAG: EntityTag;

    fn id(&self) -> &str;

    /// The owning record whose list this entity appears in, if any.
    fn parent_id(&self) -> Option<&str> {
        None
    }

    /// Keys outside this entity's namespace that depend on it.
    fn extra_invalidations(&self) -> Vec<QueryKey> {
        Vec::new()
    }

    /// Every key a create, update or delete of this record must invalidate:
    /// its detail key, the list it belongs to, and any dependent keys.
    fn invalidation_keys(&self) -> Vec<QueryKey> {
        let mut keys = vec![QueryKey::detail(Self::TAG, self.id())];
        match self.parent_id() {
            Some(parent) => keys.push(QueryKey::list(Self::TAG, parent)),
            None => keys.push(QueryKey::all(Self::TAG)),
        }
        keys.extend(self.extra_invalidations());
        keys
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Organization {
    const TAG: EntityTag = EntityTag::Organizations;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub org_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Project {
    const TAG: EntityTag = EntityTag::Projects;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.org_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Annotator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

impl Entity for User {
    const TAG: EntityTag = EntityTag::Users;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.org_id.as_deref()
    }

    // Organization-wide listings also appear under the `all` key.
    fn extra_invalidations(&self) -> Vec<QueryKey> {
        match self.org_id {
            Some(_) => vec![QueryKey::all(EntityTag::Users)],
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationClass {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Entity for AnnotationClass {
    const TAG: EntityTag = EntityTag::AnnotationClasses;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn extra_invalidations(&self) -> Vec<QueryKey> {
        vec![QueryKey::detail(EntityTag::Stats, &self.project_id)]
    }
}

/// Per-project progress counters, keyed by project id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub project_id: String,
    pub total_files: u64,
    pub completed_files: u64,
    pub skipped_files: u64,
    pub class_count: u64,
    pub annotation_count: u64,
}

impl ProjectStats {
    pub fn pending_files(&self) -> u64 {
        self.total_files
            .saturating_sub(self.completed_files)
            .saturating_sub(self.skipped_files)
    }

    /// Fraction of files that are completed or skipped.
    pub fn progress(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        (self.completed_files + self.skipped_files) as f64 / self.total_files as f64
    }
}

impl Entity for ProjectStats {
    const TAG: EntityTag = EntityTag::Stats;

    fn id(&self) -> &str {
        &self.project_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    #[default]
    Pending,
    Completed,
    Skipped,
}

/// Completion status of one media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    pub file_id: String,
    pub project_id: String,
    #[serde(default)]
    pub state: FileState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for FileStatus {
    const TAG: EntityTag = EntityTag::Files;

    fn id(&self) -> &str {
        &self.file_id
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn extra_invalidations(&self) -> Vec<QueryKey> {
        vec![QueryKey::detail(EntityTag::Stats, &self.project_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub file_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_frame: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Comment {
    const TAG: EntityTag = EntityTag::Comments;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.file_id)
    }
}
