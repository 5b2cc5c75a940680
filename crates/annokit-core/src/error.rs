//! Error handling for Annokit
//!
//! Provides error types for every layer of the library:
//! - Shape errors (collection and session mutations)
//! - Document errors (annotation file load/save)
//! - Remote errors (persistence and entity backends)
//! - Query errors (cache decoding)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::types::ShapeKind;

/// Shape collection error type
///
/// Missing ids are not errors on the default code paths; these variants are
/// only produced by the strict accessors and by insertion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// A shape with the same id already exists in the collection
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId {
        /// Kind of the collection that rejected the insert.
        kind: ShapeKind,
        /// The conflicting id.
        id: String,
    },

    /// No shape with the given id exists
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of the collection that was searched.
        kind: ShapeKind,
        /// The id that was looked up.
        id: String,
    },

    /// No point with the given id exists on the shape
    #[error("Point {point_id} not found on {kind} {id}")]
    PointNotFound {
        /// Kind of the owning shape.
        kind: ShapeKind,
        /// Owning shape id.
        id: String,
        /// Missing point id.
        point_id: String,
    },
}

/// Annotation document error type
#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    /// The document was written by an incompatible format version
    #[error("Unsupported document version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: String,
        /// Version this build reads.
        expected: String,
    },

    /// The document could not be parsed
    #[error("Malformed document: {reason}")]
    Malformed {
        /// Parser message.
        reason: String,
    },

    /// Reading or writing the document failed
    #[error("Document I/O error: {reason}")]
    Io {
        /// The underlying I/O message.
        reason: String,
    },
}

/// Remote service error type
///
/// Returned by persistence services and entity backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The service rejected the request
    #[error("Request rejected: {reason}")]
    Rejected {
        /// Reason given by the service.
        reason: String,
    },

    /// The addressed record does not exist remotely
    #[error("Remote record not found: {id}")]
    NotFound {
        /// The id that was addressed.
        id: String,
    },

    /// The service could not be reached
    #[error("Service unavailable: {reason}")]
    Unavailable {
        /// Transport-level message.
        reason: String,
    },

    /// The caller is not allowed to perform the operation
    #[error("Not authorized")]
    Unauthorized,
}

/// Query cache error type
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// A cached value did not decode into the requested type
    #[error("Cached value for {key} has unexpected shape: {reason}")]
    Decode {
        /// Display form of the cache key.
        key: String,
        /// Decoder message.
        reason: String,
    },
}

/// Main error type for Annokit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Document error
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Remote error
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Query error
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is a not-found error from any layer
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Shape(ShapeError::NotFound { .. })
                | Error::Shape(ShapeError::PointNotFound { .. })
                | Error::Remote(RemoteError::NotFound { .. })
        )
    }

    /// Check if this is a remote error
    pub fn is_remote_error(&self) -> bool {
        matches!(self, Error::Remote(_))
    }

    /// Check if this is a duplicate id error
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::Shape(ShapeError::DuplicateId { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
