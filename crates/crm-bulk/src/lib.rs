//! CRM Bulk - bulk mutation orchestrator
//!
//! Applies one logical action across many independently selected records:
//! - Tracks the action being configured and gates execution
//! - Dispatches one mutation per record concurrently (settle-all)
//! - Aggregates per-record outcomes into one success and/or failure notice
//! - Writes a best-effort, detached audit trail for archive
//!
//! # Example
//!
//! ```no_run
//! use crm_bulk::{ActionKind, BulkOrchestrator, MemoryStore, NoopInvalidator, RecordId, Selection, TracingNotifier};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), crm_bulk::BulkError> {
//! let orchestrator = BulkOrchestrator::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(TracingNotifier),
//!     Arc::new(NoopInvalidator),
//! );
//!
//! orchestrator.select(Selection::new([RecordId::Int(1), RecordId::Int(2)]));
//! orchestrator.open_dialog(ActionKind::ChangeStage);
//! orchestrator.set_stage("proposal");
//!
//! let report = orchestrator.handle_execute_bulk_action().await?;
//! println!("{:?}", report.outcome().map(|o| o.success_count()));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod audit;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod memory;
pub mod notify;
pub mod orchestrator;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use audit::{AuditBatch, AuditRecord, AuditSummary};
pub use collaborators::{CacheInvalidator, Notifier, NoopInvalidator, RecordStore, TracingNotifier};
pub use config::{AuditConfig, BulkConfig};
pub use error::{BulkError, ConfigError, StoreError};
pub use memory::MemoryStore;
pub use orchestrator::{BulkOrchestrator, BulkReport};
pub use state::{ActionState, PendingAction};
pub use types::{
    ActionKind, BulkOutcome, Notification, NotificationKind, RecordId, RecordOutcome,
    RecordSnapshot, Selection, UpdateParams,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the orchestrator
    pub use crate::{
        ActionKind, BulkConfig, BulkOrchestrator, BulkReport, CacheInvalidator, Notifier,
        RecordId, RecordSnapshot, RecordStore, Selection,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
