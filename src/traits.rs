//! Capability contracts of the external trackers
//!
//! The reconciliation logic only ever talks to the trackers through these traits.
//! Concrete implementations live in [`client`](crate::client) (real trackers) and [`memory`](crate::memory) (in-process).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::card::{BoardList, Card, CardId, CardQuery, FieldValue, Label, NewCard};
use crate::error::SyncResult;
use crate::{CalendarEvent, Message, ScheduledMessage, Sprint, Task};

/// A scrum board, that knows about sprints and the tasks they contain
#[async_trait]
pub trait ScrumSource: Send + Sync {
    /// Returns the only sprint that is currently active.
    ///
    /// Fails with [`LookupError::NoActiveSprint`](crate::error::LookupError::NoActiveSprint) if there is none
    async fn current_sprint(&self) -> SyncResult<Sprint>;

    /// Returns the open tasks of the current sprint that are assigned to `assignee` (or to the owner of the board if `None`)
    async fn current_sprint_tasks(&self, assignee: Option<&str>) -> SyncResult<Vec<Task>>;
}

/// The personal board, that is the system of record for reconciled cards
#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Returns the open cards that match the query
    async fn search_open_cards(&self, query: &CardQuery) -> SyncResult<Vec<Card>>;

    /// Adds a card and returns it, as it is stored on the board
    async fn add_card(&self, card: NewCard) -> SyncResult<Card>;

    /// Fails with `UnknownField` if the board has no custom field with this name
    async fn set_custom_field(&self, card: &CardId, field_name: &str, value: FieldValue) -> SyncResult<()>;

    async fn attach(&self, card: &CardId, label: &str, url: &str) -> SyncResult<()>;
    async fn remove_attachment(&self, card: &CardId, attachment_id: &str) -> SyncResult<()>;

    async fn set_due(&self, card: &CardId, due: DateTime<Utc>) -> SyncResult<()>;
    async fn set_due_complete(&self, card: &CardId) -> SyncResult<()>;
    async fn comment(&self, card: &CardId, text: &str) -> SyncResult<()>;

    /// Returns a list (and its open cards) by name. Fails with `UnknownList` if there is none
    async fn get_list(&self, name: &str) -> SyncResult<BoardList>;

    /// Returns the labels defined on this board
    async fn labels(&self) -> SyncResult<Vec<Label>>;
}

/// A pool of messages waiting to be sent at a given time
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn list_messages(&self) -> SyncResult<Vec<ScheduledMessage>>;
}

/// Somewhere messages can be posted to
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Fails with `UnknownRecipient` if this sink cannot reach `message.recipient`
    async fn send_message(&self, message: Message) -> SyncResult<()>;
}

#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Returns the events of the current week that the owner of the board has accepted
    async fn list_week_events(&self) -> SyncResult<Vec<CalendarEvent>>;
}
