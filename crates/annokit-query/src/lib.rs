//! # Annokit Query
//!
//! Structured cache keys, a keyed query cache, and typed queries for the
//! remote entities an annotation client reads: organizations, projects,
//! users, annotation classes, project stats, file statuses and comments.
//!
//! Every successful mutation invalidates the entity's detail key, the list
//! key of its parent, and any dependent keys. Reads after that refetch;
//! reads that race a refetch may still see the old value.

pub mod cache;
pub mod client;
pub mod entities;
pub mod keys;
pub mod queries;

pub use cache::{CacheConfig, FetchTicket, QueryCache};
pub use client::QueryClient;
pub use entities::{
    AnnotationClass, Comment, Entity, FileState, FileStatus, Organization, Project, ProjectStats,
    User, UserRole,
};
pub use keys::{EntityTag, QueryKey, Scope};
pub use queries::{EntityBackend, EntityQueries};
