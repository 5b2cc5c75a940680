//! # Event Bus Module
//!
//! Publish/subscribe plumbing shared by the editing session, the sync
//! engine and the query client.
//!
//! There is no process-wide instance: owners create an [`EventBus`] and hand
//! out `Arc` clones, so tests can observe exactly the events they caused.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use annokit_core::event_bus::{AppEvent, EventBus, EventCategory, EventFilter};
//!
//! let bus = Arc::new(EventBus::new());
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Shape]),
//!     |event| {
//!         if let AppEvent::Shape(change) = event {
//!             println!("shape changed: {:?}", change);
//!         }
//!     },
//! );
//!
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
