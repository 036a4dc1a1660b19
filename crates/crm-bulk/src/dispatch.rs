//! Concurrent dispatch and aggregation
//!
//! One store call per selected record, all in flight at once, joined with a
//! settle-all barrier. Wall-clock time follows the slowest call, not the sum.
//!
//! # Invariant
//!
//! Every selected id yields exactly one [`RecordOutcome`]; aggregation only
//! runs after all calls have settled.

use crate::collaborators::RecordStore;
use crate::types::{ActionKind, BulkOutcome, RecordOutcome, Selection, UpdateParams};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::time::Instant;

/// Apply `data` to every selected record concurrently
///
/// Failures are logged with the record id and folded into the outcome; a
/// failing call never cancels or delays its siblings.
pub async fn dispatch_updates(
    store: &dyn RecordStore,
    resource: &str,
    action: ActionKind,
    selection: &Selection,
    data: &Map<String, Value>,
) -> BulkOutcome {
    let start = Instant::now();

    let calls = selection.ids().iter().map(|id| {
        let params = UpdateParams {
            id: id.clone(),
            data: data.clone(),
            previous_data: selection.snapshot(id).cloned(),
        };
        async move {
            let result = store.update(resource, params).await.map(|_| ());
            if let Err(e) = &result {
                tracing::warn!(
                    record_id = %id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Bulk {} failed for record",
                    action
                );
            }
            RecordOutcome {
                id: id.clone(),
                result,
            }
        }
    });

    let outcome = BulkOutcome {
        action,
        outcomes: join_all(calls).await,
    };

    tracing::info!(
        "Bulk {} on {}: {} succeeded, {} failed in {}ms",
        action,
        resource,
        outcome.success_count(),
        outcome.failure_count(),
        start.elapsed().as_millis()
    );
    outcome
}

/// Archive every selected record with a single `delete_many` call
///
/// The call is all-or-nothing, so every record shares its result.
pub async fn dispatch_archive(
    store: &dyn RecordStore,
    resource: &str,
    selection: &Selection,
) -> BulkOutcome {
    let result = store.delete_many(resource, selection.ids()).await.map(|_| ());
    if let Err(e) = &result {
        tracing::warn!(
            error = %e,
            retryable = e.is_retryable(),
            "Bulk archive of {} {} failed",
            selection.len(),
            resource
        );
    }

    BulkOutcome {
        action: ActionKind::Archive,
        outcomes: selection
            .ids()
            .iter()
            .map(|id| RecordOutcome {
                id: id.clone(),
                result: result.clone(),
            })
            .collect(),
    }
}
