//! Boards, trackers and workflows shared by the integration tests
//!
//! Everything here runs in memory. Dates are fixed, so that tests never depend on the current time.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use jotfiles::card::{Card, CardId};
use jotfiles::config::BoardLayout;
use jotfiles::memory::{MemoryBoard, MemoryCalendar, MemoryChat, MemoryMessages, MemoryScrum};
use jotfiles::reconciler::Reconciler;
use jotfiles::{CalendarEvent, Sprint, Task, Workflow};

/// The end of sprint S123
pub fn sprint_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

pub fn sprint() -> Sprint {
    Sprint::new("S123".to_string(), sprint_end())
}

pub fn task(id: &str, title: &str, remaining: Duration) -> Task {
    let url = format!("https://jira.example.com/browse/{}", id).parse().unwrap();
    Task::new(id.to_string(), title.to_string(), remaining, sprint_end(), url)
}

pub fn event(id: &str, name: &str, start: DateTime<Utc>) -> CalendarEvent {
    let attendees: BTreeSet<String> = vec!["jdoe".to_string()].into_iter().collect();
    CalendarEvent::new(id.to_string(), name.to_string(), start, attendees)
}

/// A board with every list, label, custom field and template card of the default layout
pub fn populated_board() -> Arc<MemoryBoard> {
    Arc::new(MemoryBoard::with_layout(&BoardLayout::default()))
}

pub fn reconciler(board: &Arc<MemoryBoard>) -> Reconciler {
    Reconciler::new(board.clone(), BoardLayout::default())
}

/// Puts a card carrying `marker` in the backlog, as a previous sync (or a user) would have
pub async fn insert_marked_card(board: &MemoryBoard, name: &str, marker: &str) -> CardId {
    let list_id = board.add_list(&BoardLayout::default().backlog_list).await;
    let mut card = Card::new(CardId::random(), name.to_string(), list_id);
    card.comments.push(marker.to_string());
    let id = card.id.clone();
    board.insert_card(card).await;
    id
}

/// In-memory collaborators, and the workflow that wires them together
pub struct Fixture {
    pub board: Arc<MemoryBoard>,
    pub scrum: Arc<MemoryScrum>,
    pub messages: Arc<MemoryMessages>,
    pub chat: Arc<MemoryChat>,
    pub calendar: Arc<MemoryCalendar>,
    pub workflow: Workflow,
}

impl Fixture {
    /// Sprint S123 is active, but has no task yet
    pub fn new() -> Self {
        Self::with_chat(MemoryChat::new())
    }

    pub fn with_chat(chat: MemoryChat) -> Self {
        let board = populated_board();
        let scrum = Arc::new(MemoryScrum::new(Some(sprint()), Vec::new()));
        let messages = Arc::new(MemoryMessages::default());
        let chat = Arc::new(chat);
        let calendar = Arc::new(MemoryCalendar::default());

        let workflow = Workflow::new(
            scrum.clone(),
            board.clone(),
            messages.clone(),
            chat.clone(),
            calendar.clone(),
            BoardLayout::default(),
        );
        Self { board, scrum, messages, chat, calendar, workflow }
    }
}
