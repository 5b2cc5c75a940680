//! # Annokit Core
//!
//! Core types, errors, and the event bus shared by the Annokit crates.

pub mod error;
pub mod event_bus;
pub mod types;

pub use error::{DocumentError, Error, QueryError, RemoteError, Result, ShapeError};

pub use event_bus::{
    AppEvent, CacheEvent, EventBus, EventBusError, EventCategory, EventFilter,
    NotificationEvent, NotificationLevel, ShapeEvent, SubscriptionId, SyncEvent,
};

pub use types::{new_id, ShapeKind};
