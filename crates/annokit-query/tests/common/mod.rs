//! In-memory annotation class backend shared by the integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

use annokit_core::{EventBus, RemoteError};
use annokit_query::{
    AnnotationClass, EntityBackend, EntityQueries, QueryCache, QueryClient,
};

#[derive(Default)]
pub struct MemoryClasses {
    pub rows: Mutex<Vec<AnnotationClass>>,
    pub list_calls: AtomicUsize,
    pub fail_writes: AtomicBool,
    /// Held by the next `list` call after it has read its rows.
    pub list_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryClasses {
    pub fn hold_next_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock() = Some(gate.clone());
        gate
    }

    fn check_write(&self) -> Result<(), RemoteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RemoteError::Rejected {
                reason: "read only".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntityBackend<AnnotationClass> for MemoryClasses {
    async fn list(&self, parent: Option<&str>) -> Result<Vec<AnnotationClass>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let rows: Vec<_> = self
            .rows
            .lock()
            .iter()
            .filter(|c| parent.is_none_or(|p| c.project_id == p))
            .cloned()
            .collect();
        let gate = self.list_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(rows)
    }

    async fn get(&self, id: &str) -> Result<AnnotationClass, RemoteError> {
        self.rows
            .lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })
    }

    async fn search(&self, term: &str) -> Result<Vec<AnnotationClass>, RemoteError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|c| c.name.to_lowercase().contains(term))
            .cloned()
            .collect())
    }

    async fn create(&self, class: AnnotationClass) -> Result<AnnotationClass, RemoteError> {
        self.check_write()?;
        self.rows.lock().push(class.clone());
        Ok(class)
    }

    async fn update(&self, id: &str, patch: Value) -> Result<AnnotationClass, RemoteError> {
        self.check_write()?;
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })?;

        let mut merged = serde_json::to_value(&*row).map_err(|e| RemoteError::Rejected {
            reason: e.to_string(),
        })?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut merged, patch) {
            target.extend(fields);
        }
        *row = serde_json::from_value(merged).map_err(|e| RemoteError::Rejected {
            reason: e.to_string(),
        })?;
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.check_write()?;
        self.rows.lock().retain(|c| c.id != id);
        Ok(())
    }
}

pub fn class(id: &str, project: &str, name: &str) -> AnnotationClass {
    AnnotationClass {
        id: id.to_string(),
        project_id: project.to_string(),
        name: name.to_string(),
        color: "#4caf50".to_string(),
        description: None,
    }
}

pub fn setup() -> (
    EntityQueries<AnnotationClass, MemoryClasses>,
    Arc<MemoryClasses>,
    Arc<EventBus>,
) {
    let bus = Arc::new(EventBus::new());
    let cache = Arc::new(QueryCache::default().with_events(bus.clone()));
    let backend = Arc::new(MemoryClasses::default());
    let queries = EntityQueries::new(QueryClient::new(cache, bus.clone()), backend.clone());
    (queries, backend, bus)
}
