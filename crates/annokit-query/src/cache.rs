//! Keyed cache of fetched remote data.
//!
//! Entries hold the fetched value as JSON together with the time it was
//! fetched and a stale flag. Invalidating a key marks its entry stale and
//! bumps the key's epoch; a fetch that started before the bump still stores
//! its result, but the entry stays stale so the next read refetches.
//!
//! A key keeps bookkeeping only while it has an entry or a fetch in flight,
//! so invalidating or removing keys that are never fetched again costs no
//! memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use annokit_core::{AppEvent, CacheEvent, EventBus, QueryError};

use crate::keys::{EntityTag, QueryKey, Scope};

/// Cache tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a fetched entry counts as fresh.
    pub stale_time: Duration,
    /// Maximum number of stored entries; the oldest fetch is evicted first.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            max_entries: 512,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    stale: bool,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    epoch: u64,
    in_flight: usize,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.entry.is_none() && self.in_flight == 0
    }
}

/// A fetch in progress, returned by [`QueryCache::begin_fetch`].
///
/// Dropping the ticket without calling [`complete`](Self::complete) abandons
/// the fetch and leaves any existing entry as it was.
#[must_use = "dropping the ticket abandons the fetch"]
#[derive(Debug)]
pub struct FetchTicket<'a> {
    cache: &'a QueryCache,
    key: QueryKey,
    epoch: u64,
    done: bool,
}

impl FetchTicket<'_> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Store the fetched value.
    ///
    /// If the key was invalidated while the fetch was in flight, the value is
    /// stored stale.
    pub fn complete<T: Serialize>(mut self, value: &T) -> Result<(), QueryError> {
        let value = serde_json::to_value(value).map_err(|e| QueryError::Decode {
            key: self.key.to_string(),
            reason: e.to_string(),
        })?;
        self.done = true;
        self.cache.store(&self.key, value, self.epoch);
        Ok(())
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.cache.abandon(&self.key);
        }
    }
}

pub struct QueryCache {
    slots: RwLock<HashMap<QueryKey, Slot>>,
    config: CacheConfig,
    bus: Option<Arc<EventBus>>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            config,
            bus: None,
        }
    }

    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Decode the entry for `key` if it is present and fresh.
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>, QueryError> {
        let slots = self.slots.read();
        match slots.get(key).and_then(|slot| slot.entry.as_ref()) {
            Some(entry) if self.is_fresh(entry) => decode(key, &entry.value).map(Some),
            _ => Ok(None),
        }
    }

    /// Decode the entry for `key` whether or not it is stale.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>, QueryError> {
        let slots = self.slots.read();
        match slots.get(key).and_then(|slot| slot.entry.as_ref()) {
            Some(entry) => decode(key, &entry.value).map(Some),
            None => Ok(None),
        }
    }

    /// `Some(true)` when the entry exists but needs a refetch.
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        let slots = self.slots.read();
        let entry = slots.get(key)?.entry.as_ref()?;
        Some(!self.is_fresh(entry))
    }

    /// Store a value as freshly fetched.
    pub fn set<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<(), QueryError> {
        self.begin_fetch(&key).complete(value)
    }

    /// Record that a fetch for `key` is starting.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket<'_> {
        let mut slots = self.slots.write();
        let slot = slots.entry(key.clone()).or_default();
        slot.in_flight += 1;
        FetchTicket {
            cache: self,
            key: key.clone(),
            epoch: slot.epoch,
            done: false,
        }
    }

    fn store(&self, key: &QueryKey, value: Value, epoch: u64) {
        let evicted = {
            let mut slots = self.slots.write();
            let slot = slots.entry(key.clone()).or_default();
            slot.in_flight = slot.in_flight.saturating_sub(1);
            let stale = slot.epoch != epoch;
            if stale {
                tracing::debug!(key = %key, "fetch raced an invalidation; stored stale");
            }
            slot.entry = Some(CacheEntry {
                value,
                fetched_at: Instant::now(),
                stale,
            });
            self.evict_over_limit(&mut slots)
        };

        self.emit(CacheEvent::Fetched {
            key: key.to_string(),
        });
        for key in evicted {
            self.emit(CacheEvent::Evicted {
                key: key.to_string(),
            });
        }
    }

    fn abandon(&self, key: &QueryKey) {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(key) {
            slot.in_flight = slot.in_flight.saturating_sub(1);
            if slot.is_idle() {
                slots.remove(key);
            }
        }
    }

    /// Mark one key stale. Returns whether an entry existed.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let existed = {
            let mut slots = self.slots.write();
            match slots.get_mut(key) {
                Some(slot) => {
                    slot.epoch += 1;
                    match slot.entry.as_mut() {
                        Some(entry) => {
                            entry.stale = true;
                            true
                        }
                        None => false,
                    }
                }
                None => false,
            }
        };
        tracing::debug!(key = %key, existed, "invalidated");
        self.emit(CacheEvent::Invalidated {
            key: key.to_string(),
        });
        existed
    }

    /// Mark every key in a namespace stale. Returns the number of entries.
    pub fn invalidate_tag(&self, tag: EntityTag) -> usize {
        self.invalidate_where(|key| key.tag == tag)
    }

    /// Mark every key scoped to `parent` within a namespace stale.
    pub fn invalidate_parent(&self, tag: EntityTag, parent: &str) -> usize {
        self.invalidate_where(|key| {
            key.tag == tag && matches!(&key.scope, Scope::Parent(p) if p == parent)
        })
    }

    /// Mark every search result within a namespace stale.
    pub fn invalidate_searches(&self, tag: EntityTag) -> usize {
        self.invalidate_where(|key| key.tag == tag && matches!(key.scope, Scope::Search(_)))
    }

    /// Drop the entry for `key`. A fetch already in flight for it will be
    /// stored stale.
    pub fn remove(&self, key: &QueryKey) -> bool {
        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(key) else {
            return false;
        };
        slot.epoch += 1;
        let existed = slot.entry.take().is_some();
        if slot.is_idle() {
            slots.remove(key);
        }
        existed
    }

    /// Drop every entry. Fetches in flight will be stored stale.
    pub fn clear(&self) {
        let mut slots = self.slots.write();
        slots.retain(|_, slot| slot.in_flight > 0);
        for slot in slots.values_mut() {
            slot.entry = None;
            slot.epoch += 1;
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn invalidate_where(&self, matches: impl Fn(&QueryKey) -> bool) -> usize {
        let keys: Vec<QueryKey> = self
            .slots
            .read()
            .iter()
            .filter(|(key, slot)| slot.entry.is_some() && matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.invalidate(key);
        }
        keys.len()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        !entry.stale && entry.fetched_at.elapsed() <= self.config.stale_time
    }

    fn evict_over_limit(&self, slots: &mut HashMap<QueryKey, Slot>) -> Vec<QueryKey> {
        let mut evicted = Vec::new();
        let mut stored = slots.values().filter(|s| s.entry.is_some()).count();
        while stored > self.config.max_entries {
            let oldest = slots
                .iter()
                .filter_map(|(key, slot)| slot.entry.as_ref().map(|e| (key, e.fetched_at)))
                .min_by_key(|(_, fetched_at)| *fetched_at)
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else {
                break;
            };
            if let Some(slot) = slots.get_mut(&key) {
                slot.entry = None;
                if slot.in_flight == 0 {
                    slots.remove(&key);
                }
            }
            stored -= 1;
            evicted.push(key);
        }
        evicted
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.bus {
            bus.emit(AppEvent::Cache(event));
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
impl QueryCache {
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.read().len()
    }
}

fn decode<T: DeserializeOwned>(key: &QueryKey, value: &Value) -> Result<T, QueryError> {
    T::deserialize(value).map_err(|e| QueryError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
