//! Cards of the personal board, and the values used to query and create them
//!
//! Cards are owned by the external board. The types of this module are snapshots of their state.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

/// The identifier of a card on the board
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId {
    content: String,
}

impl CardId {
    /// Generate a random CardId.
    pub fn random() -> Self {
        let content = uuid::Uuid::new_v4().to_hyphenated().to_string();
        Self { content }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl From<String> for CardId {
    fn from(content: String) -> Self {
        Self { content }
    }
}

impl From<&str> for CardId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}

impl Display for CardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// The value of a custom field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Number(number) => write!(f, "{}", number),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    /// The identifier of the list this card is in
    pub list_id: String,
    pub due: Option<DateTime<Utc>>,
    pub due_complete: bool,
    /// Archived cards are not "open"
    pub closed: bool,
    pub labels: Vec<Label>,
    /// Custom field values, by field name
    pub custom_fields: BTreeMap<String, FieldValue>,
    pub attachments: Vec<Attachment>,
    pub comments: Vec<String>,
}

impl Card {
    /// Create an open card with no due date, label, field, attachment nor comment
    pub fn new(id: CardId, name: String, list_id: String) -> Self {
        Self {
            id, name, list_id,
            due: None,
            due_complete: false,
            closed: false,
            labels: Vec::new(),
            custom_fields: BTreeMap::new(),
            attachments: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Whether one of the comments of this card contains `marker` as a whole word
    pub fn has_marker(&self, marker: &str) -> bool {
        self.comments.iter()
            .any(|comment| comment.split_whitespace().any(|word| word == marker))
    }

    /// Whether a comment carries any marker starting with `prefix`
    pub fn has_marker_prefix(&self, prefix: &str) -> bool {
        self.comments.iter()
            .any(|comment| comment.split_whitespace().any(|word| word.starts_with(prefix)))
    }

    pub fn custom_field(&self, name: &str) -> Option<&FieldValue> {
        self.custom_fields.get(name)
    }

    /// Returns the attachments that point to `url`
    pub fn attachments_to<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Attachment> + 'a {
        self.attachments.iter().filter(move |att| att.url == url)
    }
}

/// A list of the board, with the open cards it contains
#[derive(Clone, Debug, PartialEq)]
pub struct BoardList {
    pub id: String,
    pub name: String,
    pub cards: Vec<Card>,
}

/// A search among the open cards of the board
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardQuery {
    /// Cards that have a comment containing this word
    Comment(String),
    /// Cards of a given list that have exactly this name
    Named { list: String, name: String },
}

impl Display for CardQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            CardQuery::Comment(text) => write!(f, "comment:\"{}\"", text),
            CardQuery::Named { list, name } => write!(f, "list:\"{}\" name:\"{}\"", list, name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
}

impl Default for Position {
    fn default() -> Self {
        Position::Bottom
    }
}

/// What a card should look like when it is added to the board
#[derive(Clone, Debug, PartialEq)]
pub struct NewCard {
    /// The identifier of the destination list
    pub list_id: String,
    pub title: String,
    pub due: Option<DateTime<Utc>>,
    pub labels: Vec<Label>,
    pub position: Position,
    /// A card to copy the description, checklists and labels from
    pub template: Option<CardId>,
}

impl NewCard {
    pub fn new(list_id: String, title: String) -> Self {
        Self {
            list_id, title,
            due: None,
            labels: Vec::new(),
            position: Position::default(),
            template: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_matched_within_comments() {
        let mut card = Card::new(CardId::random(), "Fix bug".into(), "backlog".into());
        card.comments.push("BOT task_id_T1".into());

        assert!(card.has_marker("task_id_T1"));
        assert!(!card.has_marker("task_id_T2"));
        assert!(!card.has_marker("task_id_T"));
    }

    #[test]
    fn queries_render_as_board_search_terms() {
        assert_eq!(CardQuery::Comment("task_id_T1".into()).to_string(), "comment:\"task_id_T1\"");
        let template = CardQuery::Named { list: "Templates".into(), name: "Meeting".into() };
        assert_eq!(template.to_string(), "list:\"Templates\" name:\"Meeting\"");
    }
}
