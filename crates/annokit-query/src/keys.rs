//! Structured cache keys.
//!
//! A key is an entity namespace tag plus a scope qualifier. Its display form
//! (`annotation-classes/parent:p1`) is what appears in logs and cache
//! events.

use serde::{Deserialize, Serialize};

/// Entity namespaces addressed by the query layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityTag {
    Organizations,
    Projects,
    Users,
    AnnotationClasses,
    Stats,
    Files,
    Comments,
}

impl EntityTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityTag::Organizations => "organizations",
            EntityTag::Projects => "projects",
            EntityTag::Users => "users",
            EntityTag::AnnotationClasses => "annotation-classes",
            EntityTag::Stats => "stats",
            EntityTag::Files => "files",
            EntityTag::Comments => "comments",
        }
    }
}

impl std::fmt::Display for EntityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What part of a namespace a key addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Every record in the namespace.
    All,
    /// A single record.
    Id(String),
    /// The records owned by a parent (project, organization, file).
    Parent(String),
    /// The result of a search, keyed by the normalised term.
    Search(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub tag: EntityTag,
    pub scope: Scope,
}

impl QueryKey {
    pub fn all(tag: EntityTag) -> Self {
        Self {
            tag,
            scope: Scope::All,
        }
    }

    pub fn detail(tag: EntityTag, id: impl Into<String>) -> Self {
        Self {
            tag,
            scope: Scope::Id(id.into()),
        }
    }

    pub fn list(tag: EntityTag, parent: impl Into<String>) -> Self {
        Self {
            tag,
            scope: Scope::Parent(parent.into()),
        }
    }

    /// Search key. The term is trimmed and lowercased so equivalent searches
    /// share an entry.
    pub fn search(tag: EntityTag, term: &str) -> Self {
        Self {
            tag,
            scope: Scope::Search(term.trim().to_lowercase()),
        }
    }

    /// Whether this key addresses a collection rather than one record.
    pub fn is_list(&self) -> bool {
        !matches!(self.scope, Scope::Id(_))
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Scope::All => write!(f, "{}/all", self.tag),
            Scope::Id(id) => write!(f, "{}/id:{}", self.tag, id),
            Scope::Parent(parent) => write!(f, "{}/parent:{}", self.tag, parent),
            Scope::Search(term) => write!(f, "{}/search:{}", self.tag, term),
        }
    }
}
