//! In-memory record store
//!
//! A [`RecordStore`] over a concurrent map with injectable latency and
//! failures. Backs the CLI and the integration tests.

use crate::collaborators::RecordStore;
use crate::error::StoreError;
use crate::types::{RecordId, UpdateParams};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory store keyed by `(resource, id)`
///
/// Archive is a soft delete: `deleted_at` is set and the record is kept.
#[derive(Debug)]
pub struct MemoryStore {
    records: DashMap<(String, RecordId), Value>,
    latency: Duration,
    failing_updates: DashMap<RecordId, StoreError>,
    fail_delete_many: AtomicBool,
    fail_create: AtomicBool,
    next_id: AtomicI64,
    update_calls: AtomicUsize,
    delete_many_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with no latency
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            latency: Duration::ZERO,
            failing_updates: DashMap::new(),
            fail_delete_many: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            next_id: AtomicI64::new(1000),
            update_calls: AtomicUsize::new(0),
            delete_many_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    /// With a fixed delay before every call completes
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Insert a record; returns its id, or `None` if it has no `id` field
    pub fn insert(&self, resource: &str, record: Value) -> Option<RecordId> {
        let id = record.get("id").and_then(RecordId::from_value)?;
        self.records.insert((resource.to_string(), id.clone()), record);
        Some(id)
    }

    /// Current state of a record
    #[must_use]
    pub fn get(&self, resource: &str, id: &RecordId) -> Option<Value> {
        self.records
            .get(&(resource.to_string(), id.clone()))
            .map(|r| r.value().clone())
    }

    /// All records of a resource, in no particular order
    #[must_use]
    pub fn records(&self, resource: &str) -> Vec<Value> {
        self.records
            .iter()
            .filter(|entry| entry.key().0 == resource)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Make every update of `id` fail with `error`
    pub fn fail_update(&self, id: RecordId, error: StoreError) {
        self.failing_updates.insert(id, error);
    }

    /// Make `delete_many` fail
    pub fn fail_delete_many(&self, fail: bool) {
        self.fail_delete_many.store(fail, Ordering::Release);
    }

    /// Make `create` fail
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::Release);
    }

    /// Number of `update` calls received
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::Acquire)
    }

    /// Number of `delete_many` calls received
    #[must_use]
    pub fn delete_many_calls(&self) -> usize {
        self.delete_many_calls.load(Ordering::Acquire)
    }

    /// Number of `create` calls received
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Acquire)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn now() -> Value {
    Value::from(chrono::Utc::now().to_rfc3339())
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn update(&self, resource: &str, params: UpdateParams) -> Result<Value, StoreError> {
        self.update_calls.fetch_add(1, Ordering::AcqRel);
        self.delay().await;

        if let Some(error) = self.failing_updates.get(&params.id) {
            return Err(error.value().clone());
        }

        let key = (resource.to_string(), params.id.clone());
        let mut record = self
            .records
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(params.id.clone()))?;
        let Value::Object(fields) = record.value_mut() else {
            return Err(StoreError::Rejected(format!("record {} is not an object", params.id)));
        };
        fields.extend(params.data);
        fields.insert("updated_at".to_string(), now());
        Ok(record.value().clone())
    }

    async fn delete_many(
        &self,
        resource: &str,
        ids: &[RecordId],
    ) -> Result<Vec<RecordId>, StoreError> {
        self.delete_many_calls.fetch_add(1, Ordering::AcqRel);
        self.delay().await;

        if self.fail_delete_many.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("delete_many disabled".to_string()));
        }

        // All-or-nothing: check every id before touching any record
        if let Some(missing) = ids
            .iter()
            .find(|id| !self.records.contains_key(&(resource.to_string(), (*id).clone())))
        {
            return Err(StoreError::NotFound(missing.clone()));
        }

        let deleted_at = now();
        for id in ids {
            if let Some(mut record) = self.records.get_mut(&(resource.to_string(), id.clone())) {
                if let Value::Object(fields) = record.value_mut() {
                    fields.insert("deleted_at".to_string(), deleted_at.clone());
                }
            }
        }
        Ok(ids.to_vec())
    }

    async fn create(&self, resource: &str, mut data: Map<String, Value>) -> Result<Value, StoreError> {
        self.create_calls.fetch_add(1, Ordering::AcqRel);
        self.delay().await;

        if self.fail_create.load(Ordering::Acquire) {
            return Err(StoreError::Rejected("create disabled".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        data.insert("id".to_string(), Value::from(id));
        let record = Value::Object(data);
        self.records
            .insert((resource.to_string(), RecordId::Int(id)), record.clone());
        Ok(record)
    }
}
