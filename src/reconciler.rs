//! Idempotent upserts of tasks and calendar events onto the personal board
//!
//! Every card created here carries a marker comment (see [`task_marker`] and [`event_marker`]).
//! Later runs find the card again through this marker and update it in place, so that running the same
//! upsert several times with the same input leaves the board in the same state as running it once.

use std::sync::Arc;

use crate::card::{Card, CardId, CardQuery, FieldValue, Label, NewCard, Position};
use crate::config::BoardLayout;
use crate::error::{LookupError, SyncError, SyncResult};
use crate::scheduler::progress::JobProgress;
use crate::traits::BoardClient;
use crate::{CalendarEvent, Task};

const TASK_MARKER_PREFIX: &str = "task_id_";
const EVENT_MARKER_PREFIX: &str = "event_id_";

/// The marker comment of the card that tracks a task
pub fn task_marker(task_id: &str) -> String {
    format!("{}{}", TASK_MARKER_PREFIX, task_id)
}

/// The marker comment of the card that tracks a calendar event
pub fn event_marker(event_id: &str) -> String {
    format!("{}{}", EVENT_MARKER_PREFIX, event_id)
}

/// Maps tasks and calendar events onto cards of a board
#[derive(Clone)]
pub struct Reconciler {
    board: Arc<dyn BoardClient>,
    layout: BoardLayout,
}

impl Reconciler {
    pub fn new(board: Arc<dyn BoardClient>, layout: BoardLayout) -> Self {
        Self { board, layout }
    }

    pub fn board(&self) -> &Arc<dyn BoardClient> { &self.board  }
    pub fn layout(&self) -> &BoardLayout         { &self.layout }

    /// Makes sure an open card tracks this task, and that it is up to date.
    ///
    /// In case several open cards carry the marker of this task, a warning is logged and every one of them is updated.
    /// No card is ever deleted or merged. \
    /// Returns the cards that have been updated.
    pub async fn upsert_task(&self, task: &Task, progress: &mut JobProgress) -> SyncResult<Vec<CardId>> {
        let marker = task_marker(task.id());
        let mut cards = self.board.search_open_cards(&CardQuery::Comment(marker.clone())).await?;

        match cards.len() {
            0 => {
                let card = match self.unmarked_card(task.title(), TASK_MARKER_PREFIX, &self.layout.task_field, task.id()).await? {
                    Some(card) => {
                        progress.warn(&format!("Card {} was left without marker by a previous sync, adopting it for task {}", card.id, task.id()));
                        self.board.comment(&card.id, &marker).await?;
                        card
                    },
                    None => self.create_task_card(task, &marker, progress).await?,
                };
                cards.push(card);
            },
            1 => {},
            n => {
                progress.warn(&format!("{} cards exist for task {}. Consider breaking the task into multiple ones, or use a checklist", n, task.id()));
            },
        }

        let n_cards = cards.len();
        let mut updated = Vec::with_capacity(n_cards);
        for card in cards {
            progress.debug(&format!("Syncing card {} with task {}", card.name, task.id()));
            match self.update_task_card(&card, task, progress).await {
                Ok(()) => updated.push(card.id),
                Err(err) if n_cards > 1 => {
                    progress.error(&format!("Unable to sync card {} with task {}: {}", card.id, task.id(), err));
                },
                Err(err) => return Err(err),
            }
        }
        Ok(updated)
    }

    /// Makes sure an open card tracks this calendar event, and that it is up to date.
    ///
    /// Unlike [`Self::upsert_task`], finding several cards for the same event is an error:
    /// this returns a [`SyncError::Conflict`] and leaves the board untouched.
    pub async fn upsert_calendar_event(&self, event: &CalendarEvent, progress: &mut JobProgress) -> SyncResult<CardId> {
        let marker = event_marker(event.id());
        let mut cards = self.board.search_open_cards(&CardQuery::Comment(marker.clone())).await?;

        if cards.len() > 1 {
            return Err(SyncError::Conflict { marker, count: cards.len() });
        }

        let card = match cards.pop() {
            Some(card) => card,
            None => match self.unmarked_card(event.name(), EVENT_MARKER_PREFIX, &self.layout.calendar_field, event.id()).await? {
                Some(card) => {
                    progress.warn(&format!("Card {} was left without marker by a previous sync, adopting it for event {}", card.id, event.id()));
                    self.board.comment(&card.id, &marker).await?;
                    card
                },
                None => self.create_event_card(event, &marker, progress).await?,
            },
        };

        progress.debug(&format!("Syncing card {} with event {}", card.name, event.id()));
        self.update_event_card(&card, event, progress).await?;
        Ok(card.id)
    }


    async fn create_task_card(&self, task: &Task, marker: &str, progress: &mut JobProgress) -> SyncResult<Card> {
        progress.debug("Fetching backlog list");
        let backlog = self.board.get_list(&self.layout.backlog_list).await?;
        let sprint_label = self.label(&self.layout.sprint_label).await?;

        progress.debug(&format!("Adding a card for task {} to the list {}", task.id(), backlog.name));
        let mut new_card = NewCard::new(backlog.id, task.title().to_string());
        new_card.due = Some(*task.due());
        new_card.labels = vec![sprint_label];
        new_card.position = Position::Top;
        let card = self.board.add_card(new_card).await?;
        self.board.comment(&card.id, marker).await?;
        Ok(card)
    }

    async fn update_task_card(&self, card: &Card, task: &Task, progress: &mut JobProgress) -> SyncResult<()> {
        if card.due.as_ref() != Some(task.due()) {
            progress.debug(&format!("Setting due date of card {}", card.name));
            self.board.set_due(&card.id, *task.due()).await?;
        }

        let task_id = FieldValue::Text(task.id().to_string());
        if card.custom_field(&self.layout.task_field) != Some(&task_id) {
            progress.debug("Setting custom task field");
            self.board.set_custom_field(&card.id, &self.layout.task_field, task_id).await?;
        }

        let remaining = FieldValue::Number(task.remaining_hours());
        if card.custom_field(&self.layout.time_field) != Some(&remaining) {
            progress.debug("Setting custom remaining field");
            self.board.set_custom_field(&card.id, &self.layout.time_field, remaining).await?;
        }

        let url = task.url().as_str();
        for att in card.attachments_to(url) {
            progress.debug(&format!("Removing attachment {}", att.name));
            self.board.remove_attachment(&card.id, &att.id).await?;
        }
        self.board.attach(&card.id, &self.layout.url_attachment, url).await
    }

    async fn create_event_card(&self, event: &CalendarEvent, marker: &str, progress: &mut JobProgress) -> SyncResult<Card> {
        let template = self.template(&self.layout.meeting_template).await?;
        progress.debug("Fetching backlog list");
        let backlog = self.board.get_list(&self.layout.backlog_list).await?;

        progress.debug(&format!("Adding a card for event {} to the list {}", event.id(), backlog.name));
        let mut new_card = NewCard::new(backlog.id, event.name().to_string());
        new_card.template = Some(template.id);
        let card = self.board.add_card(new_card).await?;
        self.board.comment(&card.id, marker).await?;
        Ok(card)
    }

    async fn update_event_card(&self, card: &Card, event: &CalendarEvent, progress: &mut JobProgress) -> SyncResult<()> {
        if card.due.as_ref() != Some(event.start()) {
            progress.debug(&format!("Setting due date of card {}", card.name));
            self.board.set_due(&card.id, *event.start()).await?;
        }

        let calendar_id = FieldValue::Text(event.id().to_string());
        if card.custom_field(&self.layout.calendar_field) != Some(&calendar_id) {
            progress.debug("Setting custom calendar field");
            self.board.set_custom_field(&card.id, &self.layout.calendar_field, calendar_id).await?;
        }
        Ok(())
    }

    /// Finds a backlog card named `name` that carries no marker of its kind, and whose id field is unset or equal to `id`.
    ///
    /// Such a card was added by a sync that failed before it could comment the marker.
    async fn unmarked_card(&self, name: &str, marker_prefix: &str, id_field: &str, id: &str) -> SyncResult<Option<Card>> {
        let query = CardQuery::Named { list: self.layout.backlog_list.clone(), name: name.to_string() };
        let expected_id = FieldValue::Text(id.to_string());
        Ok(self.board.search_open_cards(&query).await?
            .into_iter()
            .filter(|card| card.has_marker_prefix(marker_prefix) == false)
            .find(|card| match card.custom_field(id_field) {
                None => true,
                Some(value) => value == &expected_id,
            }))
    }

    async fn label(&self, name: &str) -> SyncResult<Label> {
        self.board.labels().await?
            .into_iter()
            .find(|label| label.name == name)
            .ok_or_else(|| LookupError::UnknownLabel(name.to_string()).into())
    }

    async fn template(&self, name: &str) -> SyncResult<Card> {
        let query = CardQuery::Named { list: self.layout.templates_list.clone(), name: name.to_string() };
        self.board.search_open_cards(&query).await?
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::UnknownTemplate(name.to_string()).into())
    }
}
