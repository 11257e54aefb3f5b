//! Settings of the poller, and credentials of the trackers
//!
//! Everything here is loaded once, at startup, and never mutated afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::{CalendarEvent, ScheduledMessage};

/// Which implementation of the personal board to use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    Trello,
    Memory,
}

/// Which implementation of the scrum board to use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrumKind {
    Jira,
    Memory,
}

/// Which implementation of the scheduled messages pool to use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePoolKind {
    /// Messages listed in the settings file
    Memory,
    /// Cards of the personal Trello board that carry a "send message" comment
    Trello,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// Google Chat incoming webhooks
    GChat,
    /// Only log messages instead of sending them
    Log,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    /// Events listed in the settings file
    Memory,
}

/// Names of the lists, labels and custom fields the reconciliation relies on
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoardLayout {
    /// The list new cards are inserted into
    pub backlog_list: String,
    /// Due cards in this list are marked complete
    pub done_list: String,
    pub templates_list: String,
    /// The name of the card (in `templates_list`) that event cards are copied from
    pub meeting_template: String,
    pub sprint_label: String,
    /// Custom field holding the id of the task a card tracks
    pub task_field: String,
    /// Custom field holding the remaining time (in hours) of a task
    pub time_field: String,
    /// Custom field holding the id of the event a card tracks
    pub calendar_field: String,
    /// Name of the attachment that points to the canonical task URL
    pub url_attachment: String,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            backlog_list: "[Backlog] On Hold".to_string(),
            done_list: "Done".to_string(),
            templates_list: "Templates".to_string(),
            meeting_template: "Meeting".to_string(),
            sprint_label: "task:sprint".to_string(),
            task_field: "Task".to_string(),
            time_field: "Time".to_string(),
            calendar_field: "CalendarId".to_string(),
            url_attachment: "Task URL".to_string(),
        }
    }
}

/// How often the jobs run. All durations are in seconds
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// How often the scheduler checks whether a job is due
    pub tick_secs: u64,
    pub sprint_issues_secs: u64,
    pub scheduled_messages_secs: u64,
    pub events_secs: u64,
    pub done_secs: u64,
    /// Whether every job runs at the first tick, rather than one interval after startup
    pub run_at_startup: bool,
    /// Jobs that take longer than this are abandoned, and considered as transient failures
    pub job_timeout_secs: Option<u64>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            tick_secs: 1,
            sprint_issues_secs: 3600,
            scheduled_messages_secs: 3600,
            events_secs: 3600,
            done_secs: 3600,
            run_at_startup: true,
            job_timeout_secs: None,
        }
    }
}

/// The content of the settings file
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Settings {
    pub personal_board: BoardKind,
    pub scrum_board: ScrumKind,
    pub smpool: MessagePoolKind,
    pub chat: ChatKind,
    pub calendar: CalendarKind,

    /// Path to the Trello credentials. Relative paths are relative to the settings file
    #[serde(default = "default_trello_credentials")]
    pub trello_credentials: PathBuf,
    /// Path to the Jira credentials. Relative paths are relative to the settings file
    #[serde(default = "default_jira_credentials")]
    pub jira_credentials: PathBuf,

    /// Webhook of every chat recipient, by name
    #[serde(default)]
    pub chat_recipients: BTreeMap<String, Url>,

    #[serde(default)]
    pub layout: BoardLayout,
    #[serde(default)]
    pub schedule: ScheduleSettings,

    /// Messages served by the `memory` message pool
    #[serde(default)]
    pub scheduled_messages: Vec<ScheduledMessage>,
    /// Events served by the `memory` calendar
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,

    /// The folder the settings were loaded from
    #[serde(skip)]
    base_path: PathBuf,
}

fn default_trello_credentials() -> PathBuf {
    PathBuf::from("credentials_trello.json")
}

fn default_jira_credentials() -> PathBuf {
    PathBuf::from("credentials_jira.json")
}

impl Settings {
    /// Load settings from a JSON file
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let mut settings: Self = load_json(path)?;
        settings.base_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(settings)
    }

    /// Parse settings from a JSON string. Relative paths will be relative to the current directory
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| SyncError::Configuration(format!("invalid settings: {}", err)))
    }

    pub fn load_trello_credentials(&self) -> SyncResult<TrelloCredentials> {
        load_json(&self.base_path.join(&self.trello_credentials))
    }

    pub fn load_jira_credentials(&self) -> SyncResult<JiraCredentials> {
        load_json(&self.base_path.join(&self.jira_credentials))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TrelloCredentials {
    pub api_key: String,
    pub token: String,
    pub board_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct JiraCredentials {
    /// The user tasks are fetched for, by default
    pub owner: String,
    #[serde(rename = "pass")]
    pub password: String,
    pub board: u64,
    pub server: Url,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> SyncResult<T> {
    let file = match std::fs::File::open(path) {
        Err(err) => {
            return Err(SyncError::Configuration(format!("Unable to open file {:?}: {}", path, err)));
        },
        Ok(file) => file,
    };
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|err| SyncError::Configuration(format!("Unable to parse {:?}: {}", path, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "personal_board": "memory",
        "scrum_board": "memory",
        "smpool": "memory",
        "chat": "log",
        "calendar": "memory"
    }"#;

    #[test]
    fn defaults_are_used_for_missing_sections() {
        let settings = Settings::from_json(MINIMAL).unwrap();
        assert_eq!(settings.personal_board, BoardKind::Memory);
        assert_eq!(settings.layout, BoardLayout::default());
        assert_eq!(settings.layout.time_field, "Time");
        assert_eq!(settings.schedule.tick_secs, 1);
        assert_eq!(settings.schedule.sprint_issues_secs, 3600);
        assert!(settings.chat_recipients.is_empty());
    }

    #[test]
    fn unknown_variants_are_configuration_errors() {
        let json = MINIMAL.replace(r#""personal_board": "memory""#, r#""personal_board": "notion""#);
        let err = Settings::from_json(&json).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn layout_can_be_partially_overridden() {
        let json = MINIMAL.replace(r#""calendar": "memory""#, r#""calendar": "memory", "layout": {"done_list": "Shipped"}"#);
        let settings = Settings::from_json(&json).unwrap();
        assert_eq!(settings.layout.done_list, "Shipped");
        assert_eq!(settings.layout.backlog_list, "[Backlog] On Hold");
    }

    #[test]
    fn jira_credentials_use_the_stored_key_names() {
        let json = r#"{"owner": "jdoe", "pass": "secret", "board": 12, "server": "https://jira.example.com"}"#;
        let credentials: JiraCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(credentials.password, "secret");
        assert_eq!(credentials.board, 12);
    }

    #[test]
    fn missing_credential_files_are_configuration_errors() {
        let mut settings = Settings::from_json(MINIMAL).unwrap();
        settings.trello_credentials = PathBuf::from("/nonexistent/credentials_trello.json");
        assert!(settings.load_trello_credentials().unwrap_err().is_fatal());
    }
}
