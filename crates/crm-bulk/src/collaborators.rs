//! Collaborator interfaces
//!
//! The orchestrator owns no storage, UI or cache. It talks to three
//! capabilities injected at construction:
//! - [`RecordStore`]: the record backend
//! - [`Notifier`]: user-facing messages
//! - [`CacheInvalidator`]: refresh signal for cached list/show views

use crate::error::StoreError;
use crate::types::{Notification, NotificationKind, RecordId, UpdateParams};
use serde_json::{Map, Value};

/// Record storage backend
///
/// Each call either fully applies or fully fails. Timeouts are the
/// implementation's concern and surface as [`StoreError::Timeout`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Update one record, returning the stored record
    async fn update(&self, resource: &str, params: UpdateParams) -> Result<Value, StoreError>;

    /// Archive several records in one call, returning the affected ids
    async fn delete_many(
        &self,
        resource: &str,
        ids: &[RecordId],
    ) -> Result<Vec<RecordId>, StoreError>;

    /// Create one record, returning the stored record
    async fn create(&self, resource: &str, data: Map<String, Value>) -> Result<Value, StoreError>;
}

/// Sink for user-facing notifications
pub trait Notifier: Send + Sync {
    /// Show a notification
    fn notify(&self, notification: Notification);
}

/// Refresh signal for cached views of a resource
pub trait CacheInvalidator: Send + Sync {
    /// Drop cached data for `resource`
    fn invalidate(&self, resource: &str);
}

/// Notifier that forwards to `tracing`
///
/// Useful for headless runs where there is no UI to show toasts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => tracing::error!("{}", notification.message),
            NotificationKind::Success => tracing::info!("{}", notification.message),
        }
    }
}

/// Invalidator for callers without a cache
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self, _resource: &str) {}
}
