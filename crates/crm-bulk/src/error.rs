//! Error types for the bulk orchestrator
//!
//! Provides error handling for:
//! - Pre-dispatch validation refusals
//! - Storage collaborator failures (per record, never raised past the orchestrator)
//! - Payload construction failures
//! - Configuration loading

use crate::types::{ActionKind, RecordId};

/// Main orchestrator error type
///
/// Only pre-dispatch refusals surface as `Err` from the public handlers.
/// Per-record failures are folded into [`crate::BulkReport`] counts.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    /// No action is active or its required parameter is empty
    #[error("action not executable: {0}")]
    NotExecutable(String),

    /// Nothing selected
    #[error("selection is empty")]
    EmptySelection,

    /// A previous invocation is still processing
    #[error("a bulk action is already processing")]
    AlreadyProcessing,

    /// The update payload could not be built
    #[error("invalid parameter for {action}: {reason}")]
    InvalidParameter {
        /// Action being configured
        action: ActionKind,
        /// Why the parameter was rejected
        reason: String,
    },
}

impl BulkError {
    /// Check if the error was a pre-dispatch refusal (no calls were issued)
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotExecutable(_) | Self::EmptySelection | Self::AlreadyProcessing
        )
    }
}

/// Errors reported by a [`crate::RecordStore`] implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// Backend rejected the write (constraint, policy, conflict)
    #[error("rejected: {0}")]
    Rejected(String),

    /// Request timed out on the backend side
    #[error("request timed out after {duration_ms}ms")]
    Timeout {
        /// Elapsed time before giving up
        duration_ms: u64,
    },

    /// Transport or connection failure
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if the error is transient
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }
}

/// Configuration loading / validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse into the config schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required field is empty
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
}
