//! Entry point for tasks pushed from outside the poller (e.g. by a webhook)
//!
//! The HTTP layer itself is not part of this crate: it only has to hand the request body to [`upsert_task_hook`].

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use url::Url;

use crate::card::CardId;
use crate::error::{SyncError, SyncResult};
use crate::reconciler::Reconciler;
use crate::scheduler::progress::JobProgress;
use crate::Task;

/// A task, as it is received by the entry point.
///
/// Every field is optional here, so that a missing field is reported by [`TaskPayload::validate`] rather than by the JSON parser
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPayload {
    pub id: Option<String>,
    pub title: Option<String>,
    /// Remaining work, in seconds
    pub remaining_secs: Option<i64>,
    pub due: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl TaskPayload {
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| SyncError::InvalidPayload(err.to_string()))
    }

    /// Checks that this payload describes a task
    pub fn validate(self) -> SyncResult<Task> {
        let id = non_empty(self.id, "id")?;
        let title = non_empty(self.title, "title")?;

        let remaining_secs = self.remaining_secs.ok_or_else(|| missing("remaining_secs"))?;
        if remaining_secs < 0 {
            return Err(SyncError::InvalidPayload(format!("remaining_secs must not be negative (got {})", remaining_secs)));
        }
        let remaining = Duration::try_seconds(remaining_secs)
            .ok_or_else(|| SyncError::InvalidPayload(format!("remaining_secs is out of range (got {})", remaining_secs)))?;
        let due = self.due.ok_or_else(|| missing("due"))?;

        let url = non_empty(self.url, "url")?;
        let url = Url::parse(&url)
            .map_err(|err| SyncError::InvalidPayload(format!("invalid url {:?}: {}", url, err)))?;

        Ok(Task::new(id, title, remaining, due, url))
    }
}

fn missing(field: &str) -> SyncError {
    SyncError::InvalidPayload(format!("missing field {}", field))
}

fn non_empty(value: Option<String>, field: &str) -> SyncResult<String> {
    match value {
        None => Err(missing(field)),
        Some(value) if value.trim().is_empty() => Err(SyncError::InvalidPayload(format!("{} must not be empty", field))),
        Some(value) => Ok(value.trim().to_string()),
    }
}

/// Validates a JSON task payload, then upserts its card.
///
/// The board is not touched when the payload is invalid
pub async fn upsert_task_hook(reconciler: &Reconciler, json: &str, progress: &mut JobProgress) -> SyncResult<Vec<CardId>> {
    let task = TaskPayload::from_json(json)?.validate()?;
    progress.info(&format!("Upserting task {}", task.id()));
    reconciler.upsert_task(&task, progress).await
}
