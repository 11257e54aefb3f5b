//! Builds the collaborators named by the settings
//!
//! This is the only place that knows about concrete implementations. Everything else works with the traits.

use std::sync::Arc;

use crate::client::{GChat, JiraScrumBoard, TrelloBoard};
use crate::config::{BoardKind, CalendarKind, ChatKind, MessagePoolKind, ScrumKind, Settings};
use crate::error::SyncResult;
use crate::jobs::Workflow;
use crate::memory::{MemoryBoard, MemoryCalendar, MemoryChat, MemoryMessages, MemoryScrum};
use crate::traits::{BoardClient, CalendarSource, ChatSink, MessageSource, ScrumSource};

/// Create every collaborator, and wire them together.
///
/// Missing or invalid credentials are reported here, before any job runs
pub fn build_workflow(settings: &Settings) -> SyncResult<Workflow> {
    let board = build_board(settings)?;
    let scrum = build_scrum(settings)?;
    let messages = build_message_pool(settings)?;
    let chat = build_chat(settings);
    let calendar = build_calendar(settings);

    Ok(Workflow::new(scrum, board, messages, chat, calendar, settings.layout.clone()))
}

pub fn build_board(settings: &Settings) -> SyncResult<Arc<dyn BoardClient>> {
    log::debug!("Using the {:?} personal board", settings.personal_board);
    let board: Arc<dyn BoardClient> = match settings.personal_board {
        BoardKind::Trello => Arc::new(TrelloBoard::new(settings.load_trello_credentials()?)?),
        BoardKind::Memory => Arc::new(MemoryBoard::with_layout(&settings.layout)),
    };
    Ok(board)
}

pub fn build_scrum(settings: &Settings) -> SyncResult<Arc<dyn ScrumSource>> {
    log::debug!("Using the {:?} scrum board", settings.scrum_board);
    let scrum: Arc<dyn ScrumSource> = match settings.scrum_board {
        ScrumKind::Jira => Arc::new(JiraScrumBoard::new(settings.load_jira_credentials()?)),
        ScrumKind::Memory => {
            log::warn!("The memory scrum board has no active sprint: sprint issues will not be synced");
            Arc::new(MemoryScrum::default())
        },
    };
    Ok(scrum)
}

pub fn build_message_pool(settings: &Settings) -> SyncResult<Arc<dyn MessageSource>> {
    log::debug!("Using the {:?} scheduled messages pool", settings.smpool);
    let messages: Arc<dyn MessageSource> = match settings.smpool {
        MessagePoolKind::Memory => Arc::new(MemoryMessages::new(settings.scheduled_messages.clone())),
        MessagePoolKind::Trello => Arc::new(TrelloBoard::new(settings.load_trello_credentials()?)?),
    };
    Ok(messages)
}

pub fn build_chat(settings: &Settings) -> Arc<dyn ChatSink> {
    match settings.chat {
        ChatKind::GChat => {
            if settings.chat_recipients.is_empty() {
                log::warn!("No chat recipient is configured: every message will be rejected");
            }
            Arc::new(GChat::new(settings.chat_recipients.clone()))
        },
        ChatKind::Log => Arc::new(MemoryChat::new()),
    }
}

pub fn build_calendar(settings: &Settings) -> Arc<dyn CalendarSource> {
    match settings.calendar {
        CalendarKind::Memory => Arc::new(MemoryCalendar::new(settings.calendar_events.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    const MEMORY: &str = r#"{
        "personal_board": "memory",
        "scrum_board": "memory",
        "smpool": "memory",
        "chat": "log",
        "calendar": "memory",
        "calendar_events": [
            {"id": "E1", "name": "Standup", "start": "2024-06-03T09:00:00Z"}
        ]
    }"#;

    #[tokio::test]
    async fn memory_settings_build_a_working_workflow() {
        let settings = Settings::from_json(MEMORY).unwrap();
        let calendar = build_calendar(&settings);
        assert_eq!(calendar.list_week_events().await.unwrap().len(), 1);

        let workflow = build_workflow(&settings).unwrap();
        let list = workflow.reconciler().board().get_list(&settings.layout.templates_list).await.unwrap();
        assert_eq!(list.cards.len(), 1);
    }

    #[test]
    fn missing_credentials_are_reported_at_startup() {
        let json = MEMORY.replace(r#""personal_board": "memory""#, r#""personal_board": "trello""#);
        let mut settings = Settings::from_json(&json).unwrap();
        settings.trello_credentials = "/nonexistent/credentials_trello.json".into();

        match build_workflow(&settings) {
            Err(SyncError::Configuration(_)) => {},
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("the workflow should not have been built"),
        }
    }

    #[test]
    fn trello_message_pool_needs_trello_credentials() {
        let json = MEMORY.replace(r#""smpool": "memory""#, r#""smpool": "trello""#);
        let mut settings = Settings::from_json(&json).unwrap();
        assert_eq!(settings.smpool, MessagePoolKind::Trello);
        settings.trello_credentials = "/nonexistent/credentials_trello.json".into();

        match build_message_pool(&settings) {
            Err(err) => assert!(err.is_fatal()),
            Ok(_) => panic!("the message pool should not have been built"),
        }
    }
}
