//! In-process implementations of the capability contracts
//!
//! They are selected by the `memory` variants of the [`Settings`](crate::config::Settings) (e.g. for dry runs),
//! and they are what every test of this crate runs against.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::card::{Attachment, BoardList, Card, CardId, CardQuery, FieldValue, Label, NewCard, Position};
use crate::config::BoardLayout;
use crate::error::{LookupError, SyncResult};
use crate::mock_behaviour::MockBehaviour;
use crate::traits::{BoardClient, CalendarSource, ChatSink, MessageSource, ScrumSource};
use crate::{CalendarEvent, Message, ScheduledMessage, Sprint, Task};


#[derive(Debug, Default)]
struct BoardState {
    /// `(id, name)` of every list
    lists: Vec<(String, String)>,
    labels: Vec<Label>,
    custom_fields: BTreeSet<String>,
    cards: Vec<Card>,
    /// How many times the board has been modified
    mutations: usize,
    mock_behaviour: MockBehaviour,
}

impl BoardState {
    fn list_id(&self, name: &str) -> Option<String> {
        self.lists.iter()
            .find(|(_, list_name)| list_name == name)
            .map(|(id, _)| id.clone())
    }

    fn card_mut(&mut self, id: &CardId) -> SyncResult<&mut Card> {
        self.mock_behaviour.can_update_card()?;
        self.mutations += 1;
        self.cards.iter_mut()
            .find(|card| &card.id == id)
            .ok_or_else(|| LookupError::UnknownCard(id.to_string()).into())
    }
}

/// A board that lives in memory
#[derive(Debug, Default)]
pub struct MemoryBoard {
    state: Mutex<BoardState>,
}

impl MemoryBoard {
    /// Create a board with no list, label nor custom field
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a board that has every list, label, custom field and template card `layout` refers to
    pub fn with_layout(layout: &BoardLayout) -> Self {
        let mut state = BoardState::default();
        for list in &[&layout.backlog_list, &layout.done_list, &layout.templates_list] {
            state.lists.push((CardId::random().to_string(), list.to_string()));
        }
        state.labels.push(Label { id: CardId::random().to_string(), name: layout.sprint_label.clone() });
        for field in &[&layout.task_field, &layout.time_field, &layout.calendar_field] {
            state.custom_fields.insert(field.to_string());
        }
        if let Some(templates) = state.list_id(&layout.templates_list) {
            state.cards.push(Card::new(CardId::random(), layout.meeting_template.clone(), templates));
        }
        Self { state: Mutex::new(state) }
    }

    /// Adds a list (if it does not exist yet), and returns its ID
    pub async fn add_list(&self, name: &str) -> String {
        let mut state = self.state.lock().await;
        if let Some(id) = state.list_id(name) {
            return id;
        }
        let id = CardId::random().to_string();
        state.lists.push((id.clone(), name.to_string()));
        id
    }

    pub async fn add_label(&self, name: &str) {
        let mut state = self.state.lock().await;
        state.labels.push(Label { id: CardId::random().to_string(), name: name.to_string() });
    }

    pub async fn add_custom_field(&self, name: &str) {
        self.state.lock().await.custom_fields.insert(name.to_string());
    }

    /// Stores a card as is, bypassing every check and the mock behaviour
    pub async fn insert_card(&self, card: Card) {
        self.state.lock().await.cards.push(card);
    }

    /// Returns every card of the board, including the closed ones
    pub async fn cards(&self) -> Vec<Card> {
        self.state.lock().await.cards.clone()
    }

    /// Returns the open cards that carry a marker
    pub async fn open_cards_with_marker(&self, marker: &str) -> Vec<Card> {
        self.state.lock().await.cards.iter()
            .filter(|card| card.closed == false && card.has_marker(marker))
            .cloned()
            .collect()
    }

    pub async fn card(&self, id: &CardId) -> Option<Card> {
        self.state.lock().await.cards.iter()
            .find(|card| &card.id == id)
            .cloned()
    }

    /// How many times the board has been modified since it was created
    pub async fn mutations(&self) -> usize {
        self.state.lock().await.mutations
    }

    pub async fn set_mock_behaviour(&self, behaviour: MockBehaviour) {
        self.state.lock().await.mock_behaviour = behaviour;
    }
}

#[async_trait]
impl BoardClient for MemoryBoard {
    async fn search_open_cards(&self, query: &CardQuery) -> SyncResult<Vec<Card>> {
        let mut state = self.state.lock().await;
        state.mock_behaviour.can_search()?;

        let list_filter = match query {
            CardQuery::Comment(_) => None,
            CardQuery::Named { list, .. } => match state.list_id(list) {
                // Searching in a list that does not exist simply returns nothing
                None => return Ok(Vec::new()),
                Some(id) => Some(id),
            },
        };

        Ok(state.cards.iter()
            .filter(|card| card.closed == false)
            .filter(|card| match query {
                CardQuery::Comment(marker) => card.has_marker(marker),
                CardQuery::Named { name, .. } => &card.name == name && Some(&card.list_id) == list_filter.as_ref(),
            })
            .cloned()
            .collect())
    }

    async fn add_card(&self, new_card: NewCard) -> SyncResult<Card> {
        let mut state = self.state.lock().await;
        state.mock_behaviour.can_add_card()?;

        if state.lists.iter().all(|(id, _)| id != &new_card.list_id) {
            return Err(LookupError::UnknownList(new_card.list_id).into());
        }

        let mut card = Card::new(CardId::random(), new_card.title, new_card.list_id);
        card.due = new_card.due;
        card.labels = new_card.labels;
        if let Some(template_id) = &new_card.template {
            let template = state.cards.iter()
                .find(|c| &c.id == template_id)
                .ok_or_else(|| LookupError::UnknownCard(template_id.to_string()))?;
            card.labels.extend(template.labels.iter().cloned());
        }

        state.mutations += 1;
        match new_card.position {
            Position::Top => state.cards.insert(0, card.clone()),
            Position::Bottom => state.cards.push(card.clone()),
        }
        Ok(card)
    }

    async fn set_custom_field(&self, card: &CardId, field_name: &str, value: FieldValue) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        if state.custom_fields.contains(field_name) == false {
            return Err(LookupError::UnknownField(field_name.to_string()).into());
        }
        state.card_mut(card)?.custom_fields.insert(field_name.to_string(), value);
        Ok(())
    }

    async fn attach(&self, card: &CardId, label: &str, url: &str) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        state.card_mut(card)?.attachments.push(Attachment {
            id: CardId::random().to_string(),
            name: label.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }

    async fn remove_attachment(&self, card: &CardId, attachment_id: &str) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        state.card_mut(card)?.attachments.retain(|att| att.id != attachment_id);
        Ok(())
    }

    async fn set_due(&self, card: &CardId, due: DateTime<Utc>) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        state.card_mut(card)?.due = Some(due);
        Ok(())
    }

    async fn set_due_complete(&self, card: &CardId) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        state.card_mut(card)?.due_complete = true;
        Ok(())
    }

    async fn comment(&self, card: &CardId, text: &str) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        state.card_mut(card)?.comments.push(text.to_string());
        Ok(())
    }

    async fn get_list(&self, name: &str) -> SyncResult<BoardList> {
        let mut state = self.state.lock().await;
        state.mock_behaviour.can_get_list()?;

        let id = state.list_id(name)
            .ok_or_else(|| LookupError::UnknownList(name.to_string()))?;
        let cards = state.cards.iter()
            .filter(|card| card.list_id == id && card.closed == false)
            .cloned()
            .collect();
        Ok(BoardList { id, name: name.to_string(), cards })
    }

    async fn labels(&self) -> SyncResult<Vec<Label>> {
        Ok(self.state.lock().await.labels.clone())
    }
}



/// A scrum board that lives in memory
#[derive(Debug, Default)]
pub struct MemoryScrum {
    sprint: Mutex<Option<Sprint>>,
    tasks: Mutex<Vec<Task>>,
}

impl MemoryScrum {
    /// `tasks` are the tasks of `sprint`, whoever they are assigned to
    pub fn new(sprint: Option<Sprint>, tasks: Vec<Task>) -> Self {
        Self { sprint: Mutex::new(sprint), tasks: Mutex::new(tasks) }
    }

    pub async fn set_sprint(&self, sprint: Option<Sprint>) {
        *self.sprint.lock().await = sprint;
    }

    pub async fn set_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.lock().await = tasks;
    }
}

#[async_trait]
impl ScrumSource for MemoryScrum {
    async fn current_sprint(&self) -> SyncResult<Sprint> {
        self.sprint.lock().await.clone()
            .ok_or_else(|| LookupError::NoActiveSprint.into())
    }

    async fn current_sprint_tasks(&self, _assignee: Option<&str>) -> SyncResult<Vec<Task>> {
        let sprint = self.current_sprint().await?;
        log::debug!("Listing the tasks of sprint {}", sprint.id());
        Ok(self.tasks.lock().await.clone())
    }
}



/// A message pool that lives in memory. Messages are never removed from it
#[derive(Debug, Default)]
pub struct MemoryMessages {
    messages: Mutex<Vec<ScheduledMessage>>,
}

impl MemoryMessages {
    pub fn new(messages: Vec<ScheduledMessage>) -> Self {
        Self { messages: Mutex::new(messages) }
    }

    pub async fn push(&self, message: ScheduledMessage) {
        self.messages.lock().await.push(message);
    }
}

#[async_trait]
impl MessageSource for MemoryMessages {
    async fn list_messages(&self) -> SyncResult<Vec<ScheduledMessage>> {
        Ok(self.messages.lock().await.clone())
    }
}



#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: Mutex<Vec<CalendarEvent>>,
}

impl MemoryCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events: Mutex::new(events) }
    }

    pub async fn set_events(&self, events: Vec<CalendarEvent>) {
        *self.events.lock().await = events;
    }
}

#[async_trait]
impl CalendarSource for MemoryCalendar {
    async fn list_week_events(&self) -> SyncResult<Vec<CalendarEvent>> {
        Ok(self.events.lock().await.clone())
    }
}



/// A chat that logs and records the messages it is given, instead of sending them
#[derive(Debug, Default)]
pub struct MemoryChat {
    /// If set, messages to any other recipient are rejected
    recipients: Option<BTreeSet<String>>,
    sent: Mutex<Vec<Message>>,
}

impl MemoryChat {
    /// A chat that accepts messages for any recipient
    pub fn new() -> Self {
        Self::default()
    }

    /// A chat that only knows about some recipients
    pub fn with_recipients<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recipients: Some(recipients.into_iter().map(Into::into).collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// The messages that have been sent so far
    pub async fn sent(&self) -> Vec<Message> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChatSink for MemoryChat {
    async fn send_message(&self, message: Message) -> SyncResult<()> {
        if let Some(recipients) = &self.recipients {
            if recipients.contains(&message.recipient) == false {
                return Err(LookupError::UnknownRecipient(message.recipient).into());
            }
        }
        log::info!("[{}#{}] {}", message.recipient, message.thread, message.content);
        self.sent.lock().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    #[tokio::test]
    async fn cards_are_only_found_while_open() {
        let board = MemoryBoard::new();
        let list = board.add_list("Backlog").await;
        let mut card = Card::new(CardId::random(), "Fix bug".into(), list);
        card.comments.push("task_id_T1".into());
        card.closed = true;
        board.insert_card(card).await;

        let found = board.search_open_cards(&CardQuery::Comment("task_id_T1".into())).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn template_cards_are_searched_by_list_and_name() {
        let layout = BoardLayout::default();
        let board = MemoryBoard::with_layout(&layout);

        let query = CardQuery::Named { list: "Templates".into(), name: "Meeting".into() };
        assert_eq!(board.search_open_cards(&query).await.unwrap().len(), 1);

        let query = CardQuery::Named { list: "Done".into(), name: "Meeting".into() };
        assert!(board.search_open_cards(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_names_are_lookup_errors() {
        let board = MemoryBoard::with_layout(&BoardLayout::default());
        let backlog = board.get_list("[Backlog] On Hold").await.unwrap();
        let card = board.add_card(NewCard::new(backlog.id, "Fix bug".into())).await.unwrap();

        match board.set_custom_field(&card.id, "Priority", FieldValue::Number(1.0)).await {
            Err(SyncError::Lookup(LookupError::UnknownField(name))) => assert_eq!(name, "Priority"),
            other => panic!("unexpected result {:?}", other),
        }
        match board.get_list("Doing").await {
            Err(SyncError::Lookup(LookupError::UnknownList(name))) => assert_eq!(name, "Doing"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn chat_rejects_unknown_recipients() {
        let chat = MemoryChat::with_recipients(vec!["team"]);
        let message = |recipient: &str| Message {
            recipient: recipient.to_string(),
            content: "hello".to_string(),
            thread: "standup".to_string(),
        };

        assert!(chat.send_message(message("team")).await.is_ok());
        assert!(chat.send_message(message("boss")).await.is_err());
        assert_eq!(chat.sent().await, vec![message("team")]);
    }

    #[tokio::test]
    async fn scrum_without_active_sprint_fails() {
        let scrum = MemoryScrum::new(None, Vec::new());
        match scrum.current_sprint_tasks(None).await {
            Err(SyncError::Lookup(LookupError::NoActiveSprint)) => {},
            other => panic!("unexpected result {:?}", other),
        }
    }
}
