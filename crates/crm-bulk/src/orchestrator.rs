//! Bulk mutation orchestrator
//!
//! Applies one logical action across every selected record:
//! - Gates execution on the action/parameter state
//! - Dispatches all record mutations concurrently
//! - Reports one aggregate notification per outcome class
//! - Refreshes caches and resets its own state
//! - Writes a detached audit trail for archive

use crate::audit::{spawn_audit, AuditBatch};
use crate::collaborators::{CacheInvalidator, Notifier, RecordStore};
use crate::config::BulkConfig;
use crate::dispatch::{dispatch_archive, dispatch_updates};
use crate::error::BulkError;
use crate::notify::summarize;
use crate::state::{ActionState, PendingAction};
use crate::types::{ActionKind, BulkOutcome, Notification, Selection};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of one orchestrator invocation
#[derive(Debug)]
pub enum BulkReport {
    /// Every record update settled
    Completed(BulkOutcome),
    /// Archive settled; audit tasks may still be running
    Archived {
        /// Per-record archive outcome
        outcome: BulkOutcome,
        /// Detached audit tasks (empty if the archive failed or audit is off)
        audit: AuditBatch,
    },
    /// Dispatch failed before any record call was issued
    Aborted {
        /// Why dispatch failed
        reason: String,
    },
}

impl BulkReport {
    /// Per-record outcome, unless aborted
    #[must_use]
    pub fn outcome(&self) -> Option<&BulkOutcome> {
        match self {
            Self::Completed(outcome) | Self::Archived { outcome, .. } => Some(outcome),
            Self::Aborted { .. } => None,
        }
    }

    /// Whether dispatch was aborted
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Take the audit batch of an archive
    #[must_use]
    pub fn into_audit(self) -> Option<AuditBatch> {
        match self {
            Self::Archived { audit, .. } => Some(audit),
            Self::Completed(_) | Self::Aborted { .. } => None,
        }
    }
}

/// Clears the processing flag when dropped, including on early return
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, BulkError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(BulkError::AlreadyProcessing);
        }
        Ok(Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The bulk orchestrator
///
/// Owns the transient action state and selection; storage, notifications
/// and cache refresh are injected collaborators. State locks are never held
/// across an `.await`, so [`BulkOrchestrator::close_dialog`] may run while a
/// dispatch is in flight.
pub struct BulkOrchestrator {
    /// Configuration
    config: BulkConfig,
    /// Record backend
    store: Arc<dyn RecordStore>,
    /// User-facing messages
    notifier: Arc<dyn Notifier>,
    /// Cache refresh signal
    cache: Arc<dyn CacheInvalidator>,
    /// Action being configured
    state: Mutex<ActionState>,
    /// Records the action applies to
    selection: Mutex<Selection>,
    /// Set while a dispatch is outstanding
    processing: AtomicBool,
}

impl std::fmt::Debug for BulkOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkOrchestrator")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .field("selected", &self.selection.lock().len())
            .field("processing", &self.is_processing())
            .finish_non_exhaustive()
    }
}

impl BulkOrchestrator {
    /// Create an orchestrator with default configuration
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            config: BulkConfig::default(),
            store,
            notifier,
            cache,
            state: Mutex::new(ActionState::new()),
            selection: Mutex::new(Selection::default()),
            processing: AtomicBool::new(false),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: BulkConfig) -> Self {
        self.config = config;
        self
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Replace the selection
    pub fn select(&self, selection: Selection) {
        tracing::debug!("Selected {} {}", selection.len(), self.config.resource);
        *self.selection.lock() = selection;
    }

    /// Drop the selection
    pub fn clear_selection(&self) {
        *self.selection.lock() = Selection::default();
    }

    /// Copy of the current selection
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection.lock().clone()
    }

    /// Activate `action`, clearing all parameters
    pub fn open_dialog(&self, action: ActionKind) {
        tracing::debug!("Opening {} dialog", action);
        self.state.lock().open(action);
    }

    /// Clear action and parameters
    ///
    /// Safe at any time. Calls already dispatched run to completion; only
    /// future dispatch is prevented.
    pub fn close_dialog(&self) {
        self.state.lock().close();
    }

    /// Set the new stage for `change_stage`
    pub fn set_stage(&self, value: impl Into<String>) {
        self.state.lock().set_stage(value);
    }

    /// Set the new status for `change_status`
    pub fn set_status(&self, value: impl Into<String>) {
        self.state.lock().set_status(value);
    }

    /// Set the new owner id for `assign_owner`
    pub fn set_owner(&self, value: impl Into<String>) {
        self.state.lock().set_owner(value);
    }

    /// Set the parameter of whichever action is active
    pub fn set_parameter(&self, value: impl Into<String>) {
        self.state.lock().set_parameter(value);
    }

    /// Active action
    #[must_use]
    pub fn active_action(&self) -> Option<ActionKind> {
        self.state.lock().active()
    }

    /// Parameter of the active action
    #[must_use]
    pub fn parameter(&self) -> Option<String> {
        self.state.lock().parameter().map(str::to_string)
    }

    /// Whether the active action may run against the current selection
    #[must_use]
    pub fn can_execute(&self) -> bool {
        let selected = self.selection.lock().len();
        self.state.lock().can_execute(selected)
    }

    /// Whether a dispatch is outstanding
    #[inline]
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Run the active action against every selected record
    ///
    /// Per-record failures are counted and notified, never returned.
    ///
    /// # Errors
    /// Only pre-dispatch refusals, with no store call issued and nothing
    /// notified:
    /// - `BulkError::NotExecutable` if no action is active or its parameter is blank
    /// - `BulkError::EmptySelection` if nothing is selected
    /// - `BulkError::AlreadyProcessing` if another dispatch is outstanding
    pub async fn handle_execute_bulk_action(&self) -> Result<BulkReport, BulkError> {
        let (pending, selection) = self.capture()?;
        if pending.kind == ActionKind::Archive {
            return self.handle_bulk_archive().await;
        }

        let _processing = ProcessingGuard::acquire(&self.processing)?;
        tracing::info!(
            "Executing bulk {} on {} {}",
            pending.kind,
            selection.len(),
            self.config.resource
        );

        let data = match pending.payload(&self.config) {
            Ok(data) => data,
            Err(e) => return Ok(self.abort(&e)),
        };

        let outcome = dispatch_updates(
            self.store.as_ref(),
            &self.config.resource,
            pending.kind,
            &selection,
            &data,
        )
        .await;

        self.report(&outcome);
        self.finish();
        Ok(BulkReport::Completed(outcome))
    }

    /// Archive every selected record, then write the audit trail
    ///
    /// The archive is one `delete_many` call. Audit records are created on a
    /// detached tokio task after the success notification; their failures
    /// are only logged. The audit resource is refreshed by that task once
    /// the records exist, not on return.
    ///
    /// Must be driven from within a tokio runtime for the audit trail to be
    /// written. Under another executor the archive still completes and the
    /// audit is skipped with an error log.
    ///
    /// # Errors
    /// - `BulkError::EmptySelection` if nothing is selected
    /// - `BulkError::AlreadyProcessing` if another dispatch is outstanding
    pub async fn handle_bulk_archive(&self) -> Result<BulkReport, BulkError> {
        let selection = self.selection();
        if selection.is_empty() {
            return Err(BulkError::EmptySelection);
        }

        let _processing = ProcessingGuard::acquire(&self.processing)?;
        tracing::info!("Archiving {} {}", selection.len(), self.config.resource);

        let outcome = dispatch_archive(self.store.as_ref(), &self.config.resource, &selection).await;
        self.report(&outcome);

        let audit = if outcome.failure_count() == 0 && self.config.audit.enabled {
            spawn_audit(
                Arc::clone(&self.store),
                Arc::clone(&self.cache),
                &self.config.audit,
                &selection,
            )
        } else {
            AuditBatch::default()
        };

        self.finish();
        Ok(BulkReport::Archived { outcome, audit })
    }

    /// Snapshot action and selection, refusing non-executable states
    fn capture(&self) -> Result<(PendingAction, Selection), BulkError> {
        let selection = self.selection();
        let pending = self.state.lock().pending(selection.len())?;
        Ok((pending, selection))
    }

    fn report(&self, outcome: &BulkOutcome) {
        for notification in summarize(outcome, &self.config) {
            self.notifier.notify(notification);
        }
    }

    fn abort(&self, error: &BulkError) -> BulkReport {
        tracing::error!("Bulk action aborted before dispatch: {}", error);
        self.notifier
            .notify(Notification::error(self.config.generic_failure_message.clone()));
        BulkReport::Aborted {
            reason: error.to_string(),
        }
    }

    /// Refresh the primary resource and reset transient state
    fn finish(&self) {
        self.cache.invalidate(&self.config.resource);
        self.clear_selection();
        self.close_dialog();
    }
}
