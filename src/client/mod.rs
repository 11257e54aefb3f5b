//! Clients of the real trackers
//!
//! These are thin: they translate the capability contracts into HTTP requests, and HTTP failures into [`SyncError::Transient`].
//! Retrying is left to the next tick.

use reqwest::Response;

use crate::error::{SyncError, SyncResult};

mod gchat;
pub use gchat::GChat;
mod jira;
pub use jira::JiraScrumBoard;
mod trello;
pub use trello::TrelloBoard;

/// Turns an unsuccessful HTTP response into an error
async fn check_status(response: Response) -> SyncResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Transient(format!("Unexpected HTTP status code {:?} for {} ({})", status, url.path(), body.trim())))
}
