//! Fetch-through and mutate-then-invalidate on top of [`QueryCache`].

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use annokit_core::{AppEvent, EventBus, NotificationEvent, RemoteError, Result};

use crate::cache::QueryCache;
use crate::keys::QueryKey;

/// Cheap to clone; clones share the cache and bus.
#[derive(Debug, Clone)]
pub struct QueryClient {
    cache: Arc<QueryCache>,
    bus: Arc<EventBus>,
}

impl QueryClient {
    pub fn new(cache: Arc<QueryCache>, bus: Arc<EventBus>) -> Self {
        Self { cache, bus }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Return the fresh cached value for `key`, or run `fetcher` and cache
    /// what it returns.
    ///
    /// A fetch failure, or dropping the future before it resolves, leaves any
    /// existing entry in place.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, RemoteError>>,
    {
        if let Some(value) = self.cache.get_fresh(&key)? {
            tracing::trace!(key = %key, "cache hit");
            return Ok(value);
        }

        let ticket = self.cache.begin_fetch(&key);
        tracing::debug!(key = %key, "fetching");
        let value = fetcher().await.map_err(|err| {
            tracing::warn!(key = %key, error = %err, "fetch failed");
            err
        })?;
        ticket.complete(&value)?;
        Ok(value)
    }

    /// Await a remote mutation, then invalidate the keys it affects.
    ///
    /// Invalidation runs for every successful mutation, including one whose
    /// result was superseded by a later request. On failure nothing is
    /// invalidated and an error notification is published.
    pub async fn mutate<T, Fut, K>(&self, mutation: Fut, keys: K) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, RemoteError>>,
        K: FnOnce(&T) -> Vec<QueryKey>,
    {
        match mutation.await {
            Ok(value) => {
                let keys = keys(&value);
                for key in &keys {
                    self.cache.invalidate(key);
                }
                tracing::debug!(invalidated = keys.len(), "mutation settled");
                Ok(value)
            }
            Err(err) => {
                tracing::error!(error = %err, "mutation failed");
                self.bus.emit(AppEvent::Notification(NotificationEvent::error(
                    err.to_string(),
                )));
                Err(err.into())
            }
        }
    }
}
