//! Fire-and-forget audit trail for archive
//!
//! After an archive commits, one activity record per archived record is
//! created on a detached task, and the audit resource is refreshed once they
//! settle. Failures are logged and go nowhere else: the archive is already
//! committed and is never rolled back or re-reported.

use crate::collaborators::{CacheInvalidator, RecordStore};
use crate::config::AuditConfig;
use crate::types::{RecordId, Selection};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Activity payload derived from one archived record
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    /// Archived record
    pub record_id: RecordId,
    /// Organization of the archived record, if its snapshot had one
    pub organization_id: Option<Value>,
    /// Creation time, RFC 3339
    pub activity_date: String,
}

impl AuditRecord {
    /// Build the audit record for `id` from the selection's snapshot
    #[must_use]
    pub fn for_archived(id: &RecordId, selection: &Selection, config: &AuditConfig) -> Self {
        let organization_id = selection
            .snapshot(id)
            .and_then(|s| s.field(&config.snapshot_organization_field))
            .cloned();
        if organization_id.is_none() {
            tracing::debug!(record_id = %id, "Archived record has no organization reference");
        }
        Self {
            record_id: id.clone(),
            organization_id,
            activity_date: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creation payload sent to the store
    #[must_use]
    pub fn to_data(&self, config: &AuditConfig) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("activity_type".to_string(), Value::from(config.activity_type.as_str()));
        data.insert("type".to_string(), Value::from(config.kind.as_str()));
        data.insert("subject".to_string(), Value::from(config.subject.as_str()));
        data.insert("activity_date".to_string(), Value::from(self.activity_date.as_str()));
        data.insert(config.link_field.clone(), self.record_id.to_value());
        data.insert(
            config.organization_field.clone(),
            self.organization_id.clone().unwrap_or(Value::Null),
        );
        data
    }
}

/// Handle of the detached audit task for one archive
///
/// Dropping the batch leaves the task running. Awaiting [`AuditBatch::wait`]
/// is only needed by callers that want to observe completion.
#[derive(Debug, Default)]
pub struct AuditBatch {
    len: usize,
    handle: Option<JoinHandle<AuditSummary>>,
}

/// How the audit records of a batch ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    /// Audit records written
    pub created: usize,
    /// Audit records that failed (logged only)
    pub failed: usize,
}

impl AuditBatch {
    /// Number of audit records being written
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no audit work was spawned
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
    }

    /// Wait for every audit record to settle and the audit cache refresh
    pub async fn wait(self) -> AuditSummary {
        let Some(handle) = self.handle else {
            return AuditSummary::default();
        };
        match handle.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "Audit task did not complete");
                AuditSummary {
                    created: 0,
                    failed: self.len,
                }
            }
        }
    }
}

/// Spawn the detached audit trail for an archived selection
///
/// One `create` per selected record, all in flight at once on a single
/// detached task. Once every create has settled, the audit resource is
/// invalidated in `cache` if at least one record was written.
///
/// Needs a tokio runtime. Without one, nothing is written and the
/// returned batch is empty.
#[must_use]
pub fn spawn_audit(
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheInvalidator>,
    config: &AuditConfig,
    selection: &Selection,
) -> AuditBatch {
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(
                error = %e,
                "No tokio runtime; skipping audit of {} archived records",
                selection.len()
            );
            return AuditBatch::default();
        }
    };

    let records: Vec<(RecordId, Map<String, Value>)> = selection
        .ids()
        .iter()
        .map(|id| {
            let record = AuditRecord::for_archived(id, selection, config);
            let data = record.to_data(config);
            (record.record_id, data)
        })
        .collect();
    let len = records.len();
    let resource = config.resource.clone();

    let handle = runtime.spawn(async move {
        let creates = records.into_iter().map(|(id, data)| {
            let store = Arc::clone(&store);
            let resource = resource.as_str();
            async move {
                match store.create(resource, data).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(
                            record_id = %id,
                            error = %e,
                            "Failed to write archive audit record"
                        );
                        false
                    }
                }
            }
        });

        let created = join_all(creates).await.into_iter().filter(|ok| *ok).count();
        let summary = AuditSummary {
            created,
            failed: len - created,
        };
        if summary.created > 0 {
            cache.invalidate(&resource);
        }
        tracing::debug!(
            created = summary.created,
            failed = summary.failed,
            "Archive audit settled"
        );
        summary
    });

    AuditBatch {
        len,
        handle: Some(handle),
    }
}
