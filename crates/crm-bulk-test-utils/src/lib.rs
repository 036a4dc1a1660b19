//! Testing utilities for the crm-bulk workspace
//!
//! Shared fixtures, recording collaborators and orchestrator setup.

#![allow(missing_docs)]

use crm_bulk::{
    BulkOrchestrator, CacheInvalidator, MemoryStore, Notification, NotificationKind, Notifier,
    RecordSnapshot, Selection,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

pub const OPPORTUNITIES: &str = "opportunities";
pub const ACTIVITIES: &str = "activities";

/// Notifier that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn messages(&self, kind: NotificationKind) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NotificationKind::Success)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NotificationKind::Error)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

/// Invalidator that records which resources were refreshed
#[derive(Debug, Default)]
pub struct CountingInvalidator {
    invalidated: Mutex<Vec<String>>,
}

impl CountingInvalidator {
    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.invalidated.lock().len()
    }
}

impl CacheInvalidator for CountingInvalidator {
    fn invalidate(&self, resource: &str) {
        self.invalidated.lock().push(resource.to_string());
    }
}

pub fn mock_opportunity(id: i64, stage: &str) -> RecordSnapshot {
    RecordSnapshot::new(json!({
        "id": id,
        "name": format!("Opp {id}"),
        "stage": stage,
        "status": "active",
        "customer_organization_id": 100 + id,
        "opportunity_owner_id": 1,
    }))
}

pub fn mock_opportunities(count: i64) -> Vec<RecordSnapshot> {
    (1..=count).map(|id| mock_opportunity(id, "new_lead")).collect()
}

/// Store seeded with `records` under `opportunities`
pub fn seeded_store(records: &[RecordSnapshot], store: MemoryStore) -> Arc<MemoryStore> {
    for record in records {
        store.insert(OPPORTUNITIES, record.0.clone());
    }
    Arc::new(store)
}

pub struct TestBench {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub cache: Arc<CountingInvalidator>,
    pub orchestrator: Arc<BulkOrchestrator>,
}

/// Orchestrator over `store` with `records` already selected
pub fn setup_bench(store: Arc<MemoryStore>, records: Vec<RecordSnapshot>) -> TestBench {
    let notifier = Arc::new(RecordingNotifier::default());
    let cache = Arc::new(CountingInvalidator::default());
    let orchestrator = BulkOrchestrator::new(
        Arc::clone(&store) as Arc<dyn crm_bulk::RecordStore>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::clone(&cache) as Arc<dyn CacheInvalidator>,
    );
    orchestrator.select(Selection::from_records(records));

    TestBench {
        store,
        notifier,
        cache,
        orchestrator: Arc::new(orchestrator),
    }
}
