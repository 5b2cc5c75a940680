//! Typed queries and mutations for one entity namespace.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use annokit_core::{RemoteError, Result};

use crate::client::QueryClient;
use crate::entities::Entity;
use crate::keys::{QueryKey, Scope};

/// Remote operations for one entity type.
#[async_trait]
pub trait EntityBackend<E: Entity>: Send + Sync {
    /// Records owned by `parent`, or every record when `parent` is `None`.
    async fn list(&self, parent: Option<&str>) -> std::result::Result<Vec<E>, RemoteError>;

    async fn get(&self, id: &str) -> std::result::Result<E, RemoteError>;

    async fn search(&self, term: &str) -> std::result::Result<Vec<E>, RemoteError> {
        let _ = term;
        Err(RemoteError::Rejected {
            reason: format!("{} cannot be searched", E::TAG),
        })
    }

    async fn create(&self, entity: E) -> std::result::Result<E, RemoteError>;

    /// Apply a partial update and return the merged record.
    async fn update(&self, id: &str, patch: Value) -> std::result::Result<E, RemoteError>;

    async fn delete(&self, id: &str) -> std::result::Result<(), RemoteError>;
}

pub struct EntityQueries<E: Entity, B: EntityBackend<E> + ?Sized> {
    client: QueryClient,
    backend: Arc<B>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, B: EntityBackend<E> + ?Sized> Clone for EntityQueries<E, B> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            backend: self.backend.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, B: EntityBackend<E> + ?Sized> EntityQueries<E, B> {
    pub fn new(client: QueryClient, backend: Arc<B>) -> Self {
        Self {
            client,
            backend,
            _entity: PhantomData,
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub async fn list(&self, parent: Option<&str>) -> Result<Vec<E>> {
        let key = match parent {
            Some(parent) => QueryKey::list(E::TAG, parent),
            None => QueryKey::all(E::TAG),
        };
        self.client
            .fetch(key, || self.backend.list(parent))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<E> {
        self.client
            .fetch(QueryKey::detail(E::TAG, id), || self.backend.get(id))
            .await
    }

    /// Search by term. Blank terms return an empty list without a request.
    pub async fn search(&self, term: &str) -> Result<Vec<E>> {
        let key = QueryKey::search(E::TAG, term);
        let normalized = match &key.scope {
            Scope::Search(t) if !t.is_empty() => t.clone(),
            _ => return Ok(Vec::new()),
        };
        self.client
            .fetch(key, || async move { self.backend.search(&normalized).await })
            .await
    }

    pub async fn create(&self, entity: E) -> Result<E> {
        let created = self
            .client
            .mutate(self.backend.create(entity), |e: &E| e.invalidation_keys())
            .await?;
        self.client.cache().invalidate_searches(E::TAG);
        tracing::info!(tag = %E::TAG, id = created.id(), "created");
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// Keys of the record as it was before the update are invalidated along
    /// with those of the result, so moving a record to another parent
    /// refreshes both lists.
    pub async fn update(&self, id: &str, patch: Value) -> Result<E> {
        let previous = self.previous(id).await;
        let updated = self
            .client
            .mutate(self.backend.update(id, patch), |e: &E| {
                let mut keys = e.invalidation_keys();
                for key in previous.iter().flat_map(E::invalidation_keys) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys
            })
            .await?;
        self.client.cache().invalidate_searches(E::TAG);
        tracing::info!(tag = %E::TAG, id, "updated");
        Ok(updated)
    }

    /// The record before an update: the cached detail if any, otherwise the
    /// backend's copy.
    async fn previous(&self, id: &str) -> Option<E> {
        let key = QueryKey::detail(E::TAG, id);
        if let Ok(Some(cached)) = self.client.cache().peek::<E>(&key) {
            return Some(cached);
        }
        match self.backend.get(id).await {
            Ok(current) => Some(current),
            Err(err) => {
                tracing::debug!(tag = %E::TAG, id, error = %err, "no previous record");
                None
            }
        }
    }

    /// Delete a record. Its detail entry is dropped rather than marked stale.
    pub async fn delete(&self, entity: &E) -> Result<()> {
        let id = entity.id().to_string();
        self.client
            .mutate(self.backend.delete(&id), |_| entity.invalidation_keys())
            .await?;
        let cache = self.client.cache();
        cache.remove(&QueryKey::detail(E::TAG, &id));
        cache.invalidate_searches(E::TAG);
        tracing::info!(tag = %E::TAG, id = %id, "deleted");
        Ok(())
    }
}
