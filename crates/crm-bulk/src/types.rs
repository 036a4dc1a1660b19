//! Core types for the bulk orchestrator
//!
//! Defines the fundamental types shared by every stage:
//! - Record identifiers and snapshots
//! - Selections
//! - Actions and the update parameters sent to the store
//! - Per-record outcomes and their aggregate

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// Record identifier as issued by the backend (integer or string key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric primary key
    Int(i64),
    /// String key (uuid, slug)
    Str(String),
}

impl RecordId {
    /// Read the `id` field of a JSON record
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// JSON form of the identifier
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Previous-state representation of a selected record
///
/// Passed through to the store as `previous_data`. The orchestrator only
/// reads single fields from it (the organization reference for audit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSnapshot(pub Value);

impl RecordSnapshot {
    /// Wrap a JSON record
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Identifier of the record, if it carries one
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        self.0.get("id").and_then(RecordId::from_value)
    }

    /// Field lookup; missing and `null` are both `None`
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }
}

/// Records chosen by the caller before invoking an action
///
/// Ids are unique; insertion order is kept so logs read in selection order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: Vec<RecordId>,
    snapshots: HashMap<RecordId, RecordSnapshot>,
}

impl Selection {
    /// Create a selection of bare ids (no snapshots)
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = RecordId>) -> Self {
        let mut selection = Self::default();
        for id in ids {
            selection.push_id(id);
        }
        selection
    }

    /// Create a selection from full records; records without an `id` are skipped
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = RecordSnapshot>) -> Self {
        let mut selection = Self::default();
        for record in records {
            if let Some(id) = record.id() {
                selection.push_id(id.clone());
                selection.snapshots.insert(id, record);
            }
        }
        selection
    }

    /// Select `ids`, looking snapshots up in `records`
    ///
    /// Mirrors a list view: the caller holds the current page of records and
    /// a set of checked ids. Ids with no matching record keep no snapshot.
    #[must_use]
    pub fn from_ids_and_records(
        ids: impl IntoIterator<Item = RecordId>,
        records: &[RecordSnapshot],
    ) -> Self {
        let mut selection = Self::new(ids);
        for record in records {
            if let Some(id) = record.id() {
                if selection.contains(&id) {
                    selection.snapshots.insert(id, record.clone());
                }
            }
        }
        selection
    }

    fn push_id(&mut self, id: RecordId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Selected ids in selection order
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    /// Snapshot of a selected record
    #[inline]
    #[must_use]
    pub fn snapshot(&self, id: &RecordId) -> Option<&RecordSnapshot> {
        self.snapshots.get(id)
    }

    /// Whether `id` is selected
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Number of selected records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The closed set of bulk actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Move records to a new pipeline stage
    ChangeStage,
    /// Set the record status
    ChangeStatus,
    /// Reassign the record owner
    AssignOwner,
    /// Soft-delete records
    Archive,
}

impl ActionKind {
    /// All actions, in toolbar order
    pub const ALL: [ActionKind; 4] = [
        ActionKind::ChangeStage,
        ActionKind::ChangeStatus,
        ActionKind::AssignOwner,
        ActionKind::Archive,
    ];

    /// Whether the action needs a parameter before it can run
    #[inline]
    #[must_use]
    pub fn requires_parameter(self) -> bool {
        !matches!(self, ActionKind::Archive)
    }

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ChangeStage => "change_stage",
            ActionKind::ChangeStatus => "change_status",
            ActionKind::AssignOwner => "assign_owner",
            ActionKind::Archive => "archive",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// Parameters for a single `update` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateParams {
    /// Record being updated
    pub id: RecordId,
    /// Fields to write
    pub data: Map<String, Value>,
    /// Caller-supplied snapshot of the record before the write
    pub previous_data: Option<RecordSnapshot>,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Operation succeeded
    Success,
    /// Operation failed (fully or partially)
    Error,
}

/// Message for the human operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Rendered message
    pub message: String,
    /// Severity
    pub kind: NotificationKind,
}

impl Notification {
    /// Success notification
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    /// Error notification
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Error,
        }
    }
}

/// Settled result of one record's primary mutation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    /// Record the outcome belongs to
    pub id: RecordId,
    /// `Ok` if the mutation was applied, the store's reason otherwise
    pub result: Result<(), StoreError>,
}

impl RecordOutcome {
    /// Whether the mutation was applied
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate of all per-record outcomes for one invocation
///
/// Holds exactly one outcome per selected record.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    /// Action that produced these outcomes
    pub action: ActionKind,
    /// One entry per selected record
    pub outcomes: Vec<RecordOutcome>,
}

impl BulkOutcome {
    /// Number of records the mutation was applied to
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of records whose mutation failed
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// Total outcomes (equals the selection size)
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Ids of records that failed
    #[must_use]
    pub fn failed_ids(&self) -> Vec<&RecordId> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| &o.id)
            .collect()
    }

    /// Outcome for a specific record
    #[must_use]
    pub fn outcome(&self, id: &RecordId) -> Option<&RecordOutcome> {
        self.outcomes.iter().find(|o| &o.id == id)
    }
}
