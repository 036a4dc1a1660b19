use crm_bulk::{
    ActionKind, AuditConfig, BulkConfig, BulkOrchestrator, CacheInvalidator, MemoryStore,
    Notifier, RecordId, Selection,
};
use crm_bulk_test_utils::{
    mock_opportunities, seeded_store, setup_bench, RecordingNotifier, ACTIVITIES, OPPORTUNITIES,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn archive_writes_one_audit_record_per_record() {
    let records = mock_opportunities(2);
    let store = seeded_store(&records, MemoryStore::new());
    let bench = setup_bench(store, records);

    bench.orchestrator.open_dialog(ActionKind::Archive);
    assert!(bench.orchestrator.can_execute());

    let report = bench.orchestrator.handle_bulk_archive().await.unwrap();
    assert_eq!(report.outcome().unwrap().success_count(), 2);
    assert_eq!(bench.notifier.successes(), vec!["Successfully archived 2 opportunities"]);

    let summary = report.into_audit().unwrap().wait().await;
    assert_eq!(summary.created, 2);
    assert_eq!(bench.store.delete_many_calls(), 1);
    assert_eq!(bench.store.create_calls(), 2);

    let mut audits = bench.store.records(ACTIVITIES);
    audits.sort_by_key(|a| a["opportunity_id"].as_i64());
    assert_eq!(audits.len(), 2);
    for (audit, id) in audits.iter().zip([1, 2]) {
        assert_eq!(audit["opportunity_id"], json!(id));
        assert_eq!(audit["organization_id"], json!(100 + id));
        assert_eq!(audit["subject"], json!("Opportunity archived"));
        assert_eq!(audit["activity_type"], json!("engagement"));
        assert_eq!(audit["type"], json!("note"));
    }

    let archived = bench.store.get(OPPORTUNITIES, &RecordId::Int(1)).unwrap();
    assert!(archived.get("deleted_at").is_some());
    assert_eq!(bench.cache.invalidated(), vec![OPPORTUNITIES, ACTIVITIES]);
    assert!(bench.orchestrator.selection().is_empty());
}

#[tokio::test]
async fn audit_failures_do_not_touch_archive() {
    let records = mock_opportunities(2);
    let store = seeded_store(&records, MemoryStore::new());
    store.fail_create(true);
    let bench = setup_bench(store, records);

    let report = bench.orchestrator.handle_bulk_archive().await.unwrap();
    assert_eq!(report.outcome().unwrap().failure_count(), 0);

    let summary = report.into_audit().unwrap().wait().await;
    assert_eq!(summary.failed, 2);
    assert_eq!(bench.store.create_calls(), 2);

    assert_eq!(bench.notifier.successes(), vec!["Successfully archived 2 opportunities"]);
    assert!(bench.notifier.errors().is_empty());
    for id in 1..=2 {
        let archived = bench.store.get(OPPORTUNITIES, &RecordId::Int(id)).unwrap();
        assert!(archived.get("deleted_at").is_some());
    }
}

#[tokio::test]
async fn archive_notifies_before_audit_completes() {
    let records = mock_opportunities(3);
    let store = seeded_store(&records, MemoryStore::new().with_latency(Duration::from_millis(50)));
    let bench = setup_bench(store, records);

    let report = bench.orchestrator.handle_bulk_archive().await.unwrap();

    assert_eq!(bench.notifier.successes(), vec!["Successfully archived 3 opportunities"]);
    assert!(bench.store.records(ACTIVITIES).is_empty());
    assert_eq!(bench.cache.invalidated(), vec![OPPORTUNITIES]);

    report.into_audit().unwrap().wait().await;
    assert_eq!(bench.store.records(ACTIVITIES).len(), 3);
    assert_eq!(bench.cache.invalidated(), vec![OPPORTUNITIES, ACTIVITIES]);
}

/// Records how many audit rows existed each time a resource was refreshed
struct AuditRowsAtRefresh {
    store: Arc<MemoryStore>,
    seen: Mutex<Vec<(String, usize)>>,
}

impl CacheInvalidator for AuditRowsAtRefresh {
    fn invalidate(&self, resource: &str) {
        let rows = self.store.records(ACTIVITIES).len();
        self.seen.lock().push((resource.to_string(), rows));
    }
}

#[tokio::test]
async fn audit_resource_refreshed_after_rows_exist() {
    let records = mock_opportunities(2);
    let store = seeded_store(&records, MemoryStore::new().with_latency(Duration::from_millis(50)));
    let cache = Arc::new(AuditRowsAtRefresh {
        store: Arc::clone(&store),
        seen: Mutex::new(Vec::new()),
    });
    let orchestrator = BulkOrchestrator::new(
        Arc::clone(&store) as Arc<dyn crm_bulk::RecordStore>,
        Arc::new(RecordingNotifier::default()) as Arc<dyn Notifier>,
        Arc::clone(&cache) as Arc<dyn CacheInvalidator>,
    );
    orchestrator.select(Selection::from_records(records));

    let report = orchestrator.handle_bulk_archive().await.unwrap();
    assert_eq!(cache.seen.lock().clone(), vec![(OPPORTUNITIES.to_string(), 0)]);

    let summary = report.into_audit().unwrap().wait().await;
    assert_eq!(summary.created, 2);
    assert_eq!(
        cache.seen.lock().clone(),
        vec![(OPPORTUNITIES.to_string(), 0), (ACTIVITIES.to_string(), 2)]
    );
}

#[tokio::test]
async fn failed_audit_writes_skip_audit_refresh() {
    let records = mock_opportunities(2);
    let store = seeded_store(&records, MemoryStore::new());
    store.fail_create(true);
    let bench = setup_bench(store, records);

    let report = bench.orchestrator.handle_bulk_archive().await.unwrap();
    report.into_audit().unwrap().wait().await;
    assert_eq!(bench.cache.invalidated(), vec![OPPORTUNITIES]);
}

#[tokio::test]
async fn failed_archive_reports_and_skips_audit() {
    let records = mock_opportunities(1);
    let store = seeded_store(&records, MemoryStore::new());
    store.fail_delete_many(true);
    let bench = setup_bench(store, records);

    let report = bench.orchestrator.handle_bulk_archive().await.unwrap();

    assert_eq!(bench.notifier.errors(), vec!["Failed to archive 1 opportunity"]);
    assert!(bench.notifier.successes().is_empty());
    assert!(report.into_audit().unwrap().is_empty());
    assert_eq!(bench.store.create_calls(), 0);
    assert!(!bench.orchestrator.is_processing());
}

#[tokio::test]
async fn audit_can_be_disabled() {
    let records = mock_opportunities(2);
    let store = seeded_store(&records, MemoryStore::new());
    let bench = setup_bench(store, records);
    let config = BulkConfig::default().with_audit(AuditConfig {
        enabled: false,
        ..AuditConfig::default()
    });
    let orchestrator = std::sync::Arc::try_unwrap(bench.orchestrator)
        .unwrap()
        .with_config(config);

    let report = orchestrator.handle_bulk_archive().await.unwrap();
    assert!(report.into_audit().unwrap().is_empty());
    assert_eq!(bench.store.create_calls(), 0);
    assert_eq!(bench.cache.invalidated(), vec![OPPORTUNITIES]);
}

#[tokio::test]
async fn archive_with_empty_selection_is_refused() {
    let store = seeded_store(&[], MemoryStore::new());
    let bench = setup_bench(store, Vec::new());

    bench.orchestrator.open_dialog(ActionKind::Archive);
    assert!(!bench.orchestrator.can_execute());
    assert!(bench.orchestrator.handle_bulk_archive().await.is_err());
    assert_eq!(bench.store.delete_many_calls(), 0);
    assert!(bench.notifier.all().is_empty());
}
