//! Event type definitions for the event bus.
//!
//! Events are grouped by category so subscribers can filter on what they
//! care about. All events are cloneable and serializable for logging/replay.

use serde::{Deserialize, Serialize};

use crate::types::ShapeKind;

/// Root event enum for all application events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Local shape collection changes
    Shape(ShapeEvent),
    /// Query cache activity
    Cache(CacheEvent),
    /// Optimistic sync progress
    Sync(SyncEvent),
    /// User-facing, non-blocking notifications
    Notification(NotificationEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Shape(_) => EventCategory::Shape,
            AppEvent::Cache(_) => EventCategory::Cache,
            AppEvent::Sync(_) => EventCategory::Sync,
            AppEvent::Notification(_) => EventCategory::Notification,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Shape(e) => e.description(),
            AppEvent::Cache(e) => e.description(),
            AppEvent::Sync(e) => e.description(),
            AppEvent::Notification(e) => e.message.clone(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Shape collection events.
    Shape,
    /// Query cache events.
    Cache,
    /// Optimistic sync events.
    Sync,
    /// Notification events.
    Notification,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Shape => write!(f, "Shape"),
            EventCategory::Cache => write!(f, "Cache"),
            EventCategory::Sync => write!(f, "Sync"),
            EventCategory::Notification => write!(f, "Notification"),
        }
    }
}

/// Changes to the shape collections of the open file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeEvent {
    /// A shape was appended to its collection.
    Added {
        /// Collection kind.
        kind: ShapeKind,
        /// Shape id.
        id: String,
    },
    /// A shape's fields, extent or points changed.
    Updated {
        /// Collection kind.
        kind: ShapeKind,
        /// Shape id.
        id: String,
    },
    /// A shape was removed.
    Deleted {
        /// Collection kind.
        kind: ShapeKind,
        /// Shape id.
        id: String,
    },
    /// All collections were replaced for a newly opened file.
    Loaded {
        /// File whose shapes were loaded.
        file_id: String,
        /// Total number of shapes across all kinds.
        shape_count: usize,
    },
    /// The open file was closed and its collections cleared.
    Closed {
        /// File that was closed.
        file_id: String,
    },
}

impl ShapeEvent {
    fn description(&self) -> String {
        match self {
            ShapeEvent::Added { kind, id } => format!("Added {} {}", kind, id),
            ShapeEvent::Updated { kind, id } => format!("Updated {} {}", kind, id),
            ShapeEvent::Deleted { kind, id } => format!("Deleted {} {}", kind, id),
            ShapeEvent::Loaded {
                file_id,
                shape_count,
            } => format!("Loaded {} shapes for file {}", shape_count, file_id),
            ShapeEvent::Closed { file_id } => format!("Closed file {}", file_id),
        }
    }
}

/// Query cache activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheEvent {
    /// An entry was marked stale and will be refetched on next read.
    Invalidated {
        /// Display form of the cache key.
        key: String,
    },
    /// A fetch completed and its result was stored.
    Fetched {
        /// Display form of the cache key.
        key: String,
    },
    /// An entry was dropped to respect the size limit.
    Evicted {
        /// Display form of the cache key.
        key: String,
    },
}

impl CacheEvent {
    fn description(&self) -> String {
        match self {
            CacheEvent::Invalidated { key } => format!("Invalidated {}", key),
            CacheEvent::Fetched { key } => format!("Fetched {}", key),
            CacheEvent::Evicted { key } => format!("Evicted {}", key),
        }
    }
}

/// Progress of a two-phase (local then remote) shape change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// The remote service accepted the change and returned the canonical record.
    Reconciled {
        /// Collection kind.
        kind: ShapeKind,
        /// Shape id.
        id: String,
    },
    /// The remote call failed and the local change was reverted.
    RolledBack {
        /// Collection kind.
        kind: ShapeKind,
        /// Shape id.
        id: String,
    },
    /// The remote call failed but a newer local edit was kept.
    Superseded {
        /// Collection kind.
        kind: ShapeKind,
        /// Shape id.
        id: String,
    },
}

impl SyncEvent {
    fn description(&self) -> String {
        match self {
            SyncEvent::Reconciled { kind, id } => format!("Reconciled {} {}", kind, id),
            SyncEvent::RolledBack { kind, id } => format!("Rolled back {} {}", kind, id),
            SyncEvent::Superseded { kind, id } => {
                format!("Kept newer local {} {}", kind, id)
            }
        }
    }
}

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Message meant to be surfaced to the user without blocking editing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Severity.
    pub level: NotificationLevel,
    /// Human-readable text.
    pub message: String,
}

impl NotificationEvent {
    /// Build an error notification.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}
