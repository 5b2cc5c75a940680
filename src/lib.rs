//! # Annokit
//!
//! Editing state and data plumbing for image and video annotation clients:
//! - Shape collections (circles, rectangles, lines, polygons, face masks)
//! - Optimistic local edits reconciled with a persistence service
//! - Keyed query cache with invalidation for remote entities
//!
//! ## Architecture
//!
//! Annokit is organized as a workspace with multiple crates:
//!
//! 1. **annokit-core** - Errors, shape kinds, event bus
//! 2. **annokit-shapes** - Shape model, collections, session, documents, sync
//! 3. **annokit-query** - Cache keys, query cache, entity queries
//! 4. **annokit-settings** - Configuration files
//! 5. **annokit** - This crate: logging setup, wiring, and the CLI

use std::sync::Arc;

use serde::Serialize;

pub use annokit_core::{
    AppEvent, EventBus, Error, RemoteError, Result, ShapeError, ShapeKind,
};
pub use annokit_query::{CacheConfig, QueryCache, QueryClient};
pub use annokit_settings::{CacheSettings, Config, LoggingSettings, SessionSettings};
pub use annokit_shapes::{AnnotationDocument, AnnotationSession, FileShapes, SessionOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// `RUST_LOG` takes precedence over `settings.level`. Output goes to stderr
/// so command output on stdout stays clean.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.level.to_ascii_lowercase()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if settings.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_line_number(true),
            )
            .try_init()?;
    }

    Ok(())
}

pub fn session_options(settings: &SessionSettings) -> SessionOptions {
    SessionOptions {
        emit_events: settings.emit_events,
        strict_load: settings.strict_load,
    }
}

pub fn cache_config(settings: &CacheSettings) -> CacheConfig {
    CacheConfig {
        stale_time: settings.stale_time(),
        max_entries: settings.max_entries,
    }
}

/// Session and query client sharing one event bus, configured from `config`.
pub fn build_runtime(config: &Config) -> (AnnotationSession, QueryClient, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let session = AnnotationSession::new()
        .with_options(session_options(&config.session))
        .with_events(bus.clone());
    let cache = Arc::new(QueryCache::new(cache_config(&config.cache)).with_events(bus.clone()));
    (session, QueryClient::new(cache, bus.clone()), bus)
}

/// Shape counts for one annotation document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub file_id: String,
    pub version: String,
    pub total: usize,
    pub by_kind: Vec<(ShapeKind, usize)>,
    /// Shapes per referenced frame, ascending by frame. Shapes without a
    /// frame are counted on every frame.
    pub by_frame: Vec<(u32, usize)>,
    /// Shapes dropped on open because their id repeated.
    pub dropped: usize,
}

/// Open `document` in `session` and count what it holds.
pub fn summarize(
    document: AnnotationDocument,
    session: &mut AnnotationSession,
) -> Result<DocumentSummary> {
    let file_id = document.metadata.file_id.clone();
    let version = document.version.clone();
    let dropped = document.open_in(session)?;

    let shapes = session.shapes();
    Ok(DocumentSummary {
        file_id,
        version,
        total: shapes.shape_count(),
        by_kind: ShapeKind::ALL
            .iter()
            .map(|kind| (*kind, shapes.count(*kind)))
            .collect(),
        by_frame: shapes
            .frames()
            .into_iter()
            .map(|frame| (frame, shapes.count_in_frame(frame)))
            .collect(),
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "version": "1.0",
        "metadata": {
            "fileId": "clip-1",
            "created": "2024-05-01T10:00:00Z",
            "modified": "2024-05-01T10:00:00Z"
        },
        "shapes": {
            "circles": [
                {"id": "c1", "x": 1, "y": 1, "width": 4, "height": 4, "atFrame": 3},
                {"id": "c1", "x": 9, "y": 9, "width": 1, "height": 1}
            ],
            "lines": [
                {"id": "l1", "points": [{"id": "a", "x": 0, "y": 0}, {"id": "b", "x": 1, "y": 1}]}
            ]
        }
    }"#;

    #[test]
    fn test_summary_counts_kinds_and_frames() {
        let document = AnnotationDocument::from_json(DOCUMENT).unwrap();
        let mut session = AnnotationSession::new();

        let summary = summarize(document, &mut session).unwrap();

        assert_eq!(summary.file_id, "clip-1");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.dropped, 1);
        assert!(summary.by_kind.contains(&(ShapeKind::Circle, 1)));
        assert!(summary.by_kind.contains(&(ShapeKind::Line, 1)));
        assert_eq!(summary.by_frame, vec![(3, 2)]);
    }

    #[test]
    fn test_strict_summary_rejects_repeated_ids() {
        let document = AnnotationDocument::from_json(DOCUMENT).unwrap();
        let mut session = AnnotationSession::new().with_options(SessionOptions {
            strict_load: true,
            ..Default::default()
        });

        let err = summarize(document, &mut session).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(session.file_id(), None);
    }

    #[test]
    fn test_settings_map_onto_runtime_types() {
        let mut config = Config::default();
        config.session.strict_load = true;
        config.cache.stale_time_ms = 250;

        let options = session_options(&config.session);
        assert!(options.strict_load);
        assert_eq!(cache_config(&config.cache).stale_time.as_millis(), 250);

        let (session, client, _bus) = build_runtime(&config);
        assert!(session.options().strict_load);
        assert_eq!(client.cache().config().max_entries, config.cache.max_entries);
    }
}
