//! Notification policy
//!
//! One success and/or one failure message per invocation, never one per
//! record.

use crate::config::BulkConfig;
use crate::types::{ActionKind, BulkOutcome, Notification};

/// Past and base form of the verb describing `action`
fn verbs(action: ActionKind) -> (&'static str, &'static str) {
    match action {
        ActionKind::Archive => ("archived", "archive"),
        ActionKind::ChangeStage | ActionKind::ChangeStatus | ActionKind::AssignOwner => {
            ("updated", "update")
        }
    }
}

/// `"{count} {noun}"` with the configured singular/plural noun
#[must_use]
pub fn count_phrase(count: usize, config: &BulkConfig) -> String {
    format!("{count} {}", config.label(count))
}

/// Summary notifications for a settled invocation
///
/// Returns the success notification (if anything succeeded) followed by the
/// failure notification (if anything failed).
#[must_use]
pub fn summarize(outcome: &BulkOutcome, config: &BulkConfig) -> Vec<Notification> {
    let (done, verb) = verbs(outcome.action);
    let succeeded = outcome.success_count();
    let failed = outcome.failure_count();

    let mut notifications = Vec::with_capacity(2);
    if succeeded > 0 {
        notifications.push(Notification::success(format!(
            "Successfully {done} {}",
            count_phrase(succeeded, config)
        )));
    }
    if failed > 0 {
        notifications.push(Notification::error(format!(
            "Failed to {verb} {}",
            count_phrase(failed, config)
        )));
    }
    notifications
}
