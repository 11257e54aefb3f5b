use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use url::Url;

use crate::card::{Attachment, BoardList, Card, CardId, CardQuery, FieldValue, Label, NewCard, Position};
use crate::config::TrelloCredentials;
use crate::error::{LookupError, SyncError, SyncResult};
use crate::traits::{BoardClient, MessageSource};
use crate::ScheduledMessage;

static API_ROOT: &str = "https://api.trello.com/1/";

/// First words of the comments that schedule a message
static SEND_MESSAGE: &str = "send message";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrelloCard {
    id: String,
    name: String,
    id_list: String,
    due: Option<DateTime<Utc>>,
    #[serde(default)]
    due_complete: bool,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    labels: Vec<TrelloLabel>,
    #[serde(default)]
    attachments: Vec<TrelloAttachment>,
    #[serde(default)]
    custom_field_items: Vec<TrelloFieldItem>,
    /// Only comments are requested
    #[serde(default)]
    actions: Vec<TrelloAction>,
}

#[derive(Debug, Deserialize)]
struct TrelloLabel {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrelloAttachment {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrelloFieldItem {
    id_custom_field: String,
    #[serde(default)]
    value: TrelloFieldValue,
}

/// Trello sends numbers as strings
#[derive(Debug, Default, Deserialize)]
struct TrelloFieldValue {
    text: Option<String>,
    number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrelloAction {
    data: TrelloActionData,
}

#[derive(Debug, Deserialize)]
struct TrelloActionData {
    text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct TrelloCustomField {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrelloList {
    id: String,
    name: String,
    #[serde(default)]
    cards: Vec<TrelloCard>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    cards: Vec<SearchedCard>,
}

#[derive(Debug, Deserialize)]
struct SearchedCard {
    id: String,
}


/// A Trello board, used as the personal board
pub struct TrelloBoard {
    http: reqwest::Client,
    api_root: Url,
    credentials: TrelloCredentials,

    /// Custom fields defined on the board. Fetched on first use
    custom_fields: Mutex<Option<Vec<TrelloCustomField>>>,
}

impl TrelloBoard {
    /// Create a client. This does not start a connection
    pub fn new(credentials: TrelloCredentials) -> SyncResult<Self> {
        let api_root = Url::parse(API_ROOT)
            .map_err(|err| SyncError::Configuration(format!("invalid Trello API root: {}", err)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_root,
            credentials,
            custom_fields: Mutex::new(None),
        })
    }

    fn request(&self, method: Method, path: &str) -> SyncResult<RequestBuilder> {
        let url = self.api_root.join(path)
            .map_err(|err| SyncError::Configuration(format!("invalid Trello path {}: {}", path, err)))?;
        Ok(self.http
            .request(method, url)
            .query(&[("key", &self.credentials.api_key), ("token", &self.credentials.token)]))
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<reqwest::Response> {
        let response = request.send().await?;
        super::check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<T> {
        Ok(self.send(request).await?.json().await?)
    }

    fn board_path(&self, segment: &str) -> String {
        format!("boards/{}/{}", self.credentials.board_id, segment)
    }

    /// Return the custom fields of the board, or fetch them from the server if not known yet
    async fn custom_field_definitions(&self) -> SyncResult<Vec<TrelloCustomField>> {
        let mut cached = self.custom_fields.lock().await;
        if let Some(fields) = &*cached {
            return Ok(fields.clone());
        }

        let request = self.request(Method::GET, &self.board_path("customFields"))?;
        let fields: Vec<TrelloCustomField> = self.send_json(request).await?;
        log::debug!("Board {} has {} custom fields", self.credentials.board_id, fields.len());
        *cached = Some(fields.clone());
        Ok(fields)
    }

    /// Fetch a card, with its attachments, custom fields and comments
    async fn card_details(&self, id: &str) -> SyncResult<Card> {
        let request = self.request(Method::GET, &format!("cards/{}", id))?
            .query(&[
                ("attachments", "true"),
                ("customFieldItems", "true"),
                ("actions", "commentCard"),
                ("actions_limit", "1000"),
            ]);
        let card: TrelloCard = self.send_json(request).await?;
        let definitions = self.custom_field_definitions().await?;
        Ok(to_card(card, &definitions))
    }

    /// Ids of the open cards of the board the search index matches with `query`
    async fn search_card_ids(&self, query: &str) -> SyncResult<Vec<String>> {
        let request = self.request(Method::GET, "search")?
            .query(&[
                ("query", format!("{} is:open", query)),
                ("modelTypes", "cards".to_string()),
                ("idBoards", self.credentials.board_id.clone()),
                ("cards_limit", "1000".to_string()),
            ]);
        let results: SearchResults = self.send_json(request).await?;
        Ok(results.cards.into_iter().map(|c| c.id).collect())
    }

    async fn lists(&self) -> SyncResult<Vec<TrelloList>> {
        let request = self.request(Method::GET, &self.board_path("lists"))?
            .query(&[("cards", "open")]);
        self.send_json(request).await
    }

    async fn update_card(&self, card: &CardId, query: &[(&str, String)]) -> SyncResult<()> {
        let request = self.request(Method::PUT, &format!("cards/{}", card))?.query(query);
        self.send(request).await?;
        Ok(())
    }
}

fn to_card(card: TrelloCard, definitions: &[TrelloCustomField]) -> Card {
    let mut custom_fields = BTreeMap::new();
    for item in card.custom_field_items {
        let name = match definitions.iter().find(|def| def.id == item.id_custom_field) {
            None => {
                log::warn!("Card {} has a value for unknown custom field {}", card.id, item.id_custom_field);
                continue;
            },
            Some(def) => def.name.clone(),
        };
        if let Some(value) = to_field_value(item.value) {
            custom_fields.insert(name, value);
        }
    }

    Card {
        id: CardId::from(card.id),
        name: card.name,
        list_id: card.id_list,
        due: card.due,
        due_complete: card.due_complete,
        closed: card.closed,
        labels: card.labels.into_iter().map(|l| Label { id: l.id, name: l.name }).collect(),
        custom_fields,
        attachments: card.attachments.into_iter()
            .map(|a| Attachment { id: a.id, name: a.name, url: a.url })
            .collect(),
        comments: card.actions.into_iter().filter_map(|action| action.data.text).collect(),
    }
}

/// The messages a card schedules.
///
/// Every comment whose first line reads `send message <recipient> [thread]` is a message, sent at the due date of the
/// card. The following lines are the content (the card name when there are none). Without a thread, the card id is
/// used, so that the messages of a card end up in the same thread.
fn messages_of(card: &Card) -> Vec<ScheduledMessage> {
    let schedule = match card.due {
        None => return Vec::new(),
        Some(due) => due,
    };

    card.comments.iter()
        .filter_map(|comment| {
            let mut lines = comment.lines();
            let command = lines.next()?.trim();
            let arguments = command.strip_prefix(SEND_MESSAGE)?;
            if arguments.starts_with(char::is_whitespace) == false && arguments.is_empty() == false {
                return None;
            }
            let mut words = arguments.split_whitespace();
            let recipient = match words.next() {
                Some(recipient) => recipient.to_string(),
                None => {
                    log::warn!("Ignoring a message of card {} that has no recipient", card.name);
                    return None;
                },
            };
            let thread = words.next().map(str::to_string).unwrap_or_else(|| card.id.to_string());

            let content = lines.collect::<Vec<_>>().join("\n").trim().to_string();
            let content = if content.is_empty() { card.name.clone() } else { content };
            Some(ScheduledMessage::new(recipient, content, thread, schedule))
        })
        .collect()
}

fn to_field_value(value: TrelloFieldValue) -> Option<FieldValue> {
    if let Some(number) = value.number {
        match number.parse() {
            Ok(number) => return Some(FieldValue::Number(number)),
            Err(_) => log::warn!("Ignoring invalid number {:?} in custom field", number),
        }
    }
    value.text.map(FieldValue::Text)
}

fn field_body(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Text(text) => json!({ "value": { "text": text } }),
        FieldValue::Number(number) => json!({ "value": { "number": number.to_string() } }),
    }
}

fn format_due(due: &DateTime<Utc>) -> String {
    due.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl BoardClient for TrelloBoard {
    async fn search_open_cards(&self, query: &CardQuery) -> SyncResult<Vec<Card>> {
        let ids: Vec<String> = match query {
            CardQuery::Comment(_) => self.search_card_ids(&query.to_string()).await?,
            CardQuery::Named { list, name } => {
                // Listing is exact, while the search index may lag behind
                let list = self.get_list(list).await?;
                list.cards.into_iter()
                    .filter(|card| &card.name == name)
                    .map(|card| card.id.as_str().to_string())
                    .collect()
            },
        };

        let mut cards = Vec::new();
        for id in ids {
            let card = self.card_details(&id).await?;
            // Search results are fuzzy, only keep what actually matches
            let matches = match query {
                CardQuery::Comment(marker) => card.has_marker(marker),
                CardQuery::Named { .. } => true,
            };
            if matches && card.closed == false {
                cards.push(card);
            }
        }
        log::debug!("{} open cards match {}", cards.len(), query);
        Ok(cards)
    }

    async fn add_card(&self, card: NewCard) -> SyncResult<Card> {
        let position = match card.position {
            Position::Top => "top",
            Position::Bottom => "bottom",
        };
        let mut query = vec![
            ("idList", card.list_id.clone()),
            ("name", card.title.clone()),
            ("pos", position.to_string()),
        ];
        if let Some(due) = &card.due {
            query.push(("due", format_due(due)));
        }
        if card.labels.is_empty() == false {
            let ids: Vec<&str> = card.labels.iter().map(|l| l.id.as_str()).collect();
            query.push(("idLabels", ids.join(",")));
        }
        if let Some(template) = &card.template {
            query.push(("idCardSource", template.to_string()));
            query.push(("keepFromSource", "all".to_string()));
        }

        let request = self.request(Method::POST, "cards")?.query(&query);
        let created: TrelloCard = self.send_json(request).await?;
        log::debug!("Added card {} ({}) to list {}", created.id, created.name, created.id_list);
        Ok(to_card(created, &[]))
    }

    async fn set_custom_field(&self, card: &CardId, field_name: &str, value: FieldValue) -> SyncResult<()> {
        let definitions = self.custom_field_definitions().await?;
        let field = definitions.iter()
            .find(|def| def.name == field_name)
            .ok_or_else(|| LookupError::UnknownField(field_name.to_string()))?;

        let request = self.request(Method::PUT, &format!("cards/{}/customField/{}/item", card, field.id))?
            .json(&field_body(&value));
        self.send(request).await?;
        Ok(())
    }

    async fn attach(&self, card: &CardId, label: &str, url: &str) -> SyncResult<()> {
        let request = self.request(Method::POST, &format!("cards/{}/attachments", card))?
            .query(&[("name", label), ("url", url)]);
        self.send(request).await?;
        Ok(())
    }

    async fn remove_attachment(&self, card: &CardId, attachment_id: &str) -> SyncResult<()> {
        let request = self.request(Method::DELETE, &format!("cards/{}/attachments/{}", card, attachment_id))?;
        self.send(request).await?;
        Ok(())
    }

    async fn set_due(&self, card: &CardId, due: DateTime<Utc>) -> SyncResult<()> {
        self.update_card(card, &[("due", format_due(&due))]).await
    }

    async fn set_due_complete(&self, card: &CardId) -> SyncResult<()> {
        self.update_card(card, &[("dueComplete", "true".to_string())]).await
    }

    async fn comment(&self, card: &CardId, text: &str) -> SyncResult<()> {
        let request = self.request(Method::POST, &format!("cards/{}/actions/comments", card))?
            .query(&[("text", text)]);
        self.send(request).await?;
        Ok(())
    }

    async fn get_list(&self, name: &str) -> SyncResult<BoardList> {
        let list = self.lists().await?
            .into_iter()
            .find(|list| list.name == name)
            .ok_or_else(|| LookupError::UnknownList(name.to_string()))?;

        Ok(BoardList {
            id: list.id,
            name: list.name,
            cards: list.cards.into_iter().map(|card| to_card(card, &[])).collect(),
        })
    }

    async fn labels(&self) -> SyncResult<Vec<Label>> {
        let request = self.request(Method::GET, &self.board_path("labels"))?;
        let labels: Vec<TrelloLabel> = self.send_json(request).await?;
        Ok(labels.into_iter().map(|l| Label { id: l.id, name: l.name }).collect())
    }
}

#[async_trait]
impl MessageSource for TrelloBoard {
    async fn list_messages(&self) -> SyncResult<Vec<ScheduledMessage>> {
        let ids = self.search_card_ids(&format!("comment:\"{}\"", SEND_MESSAGE)).await?;

        let mut messages = Vec::new();
        for id in ids {
            let card = self.card_details(&id).await?;
            if card.closed {
                continue;
            }
            messages.extend(messages_of(&card));
        }
        log::debug!("{} messages are scheduled on the board", messages.len());
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> Vec<TrelloCustomField> {
        vec![
            TrelloCustomField { id: "f1".into(), name: "Task".into() },
            TrelloCustomField { id: "f2".into(), name: "Time".into() },
        ]
    }

    #[test]
    fn cards_are_converted_with_their_field_names() {
        let json = r#"{
            "id": "c1",
            "name": "Fix bug",
            "idList": "l1",
            "due": "2024-06-01T00:00:00.000Z",
            "dueComplete": false,
            "closed": false,
            "labels": [{"id": "lb1", "name": "task:sprint", "color": "green"}],
            "attachments": [{"id": "a1", "name": "Task URL", "url": "https://jira.example.com/browse/T1"}],
            "customFieldItems": [
                {"id": "i1", "idCustomField": "f1", "value": {"text": "T1"}},
                {"id": "i2", "idCustomField": "f2", "value": {"number": "2"}},
                {"id": "i3", "idCustomField": "unknown", "value": {"text": "?"}}
            ],
            "actions": [{"id": "x1", "type": "commentCard", "data": {"text": "BOT task_id_T1"}}]
        }"#;
        let card: TrelloCard = serde_json::from_str(json).unwrap();
        let card = to_card(card, &definitions());

        assert_eq!(card.id, CardId::from("c1"));
        assert_eq!(card.custom_field("Task"), Some(&FieldValue::Text("T1".into())));
        assert_eq!(card.custom_field("Time"), Some(&FieldValue::Number(2.0)));
        assert_eq!(card.custom_fields.len(), 2);
        assert_eq!(card.labels[0].name, "task:sprint");
        assert_eq!(card.attachments_to("https://jira.example.com/browse/T1").count(), 1);
        assert!(card.has_marker("task_id_T1"));
    }

    #[test]
    fn field_values_are_sent_in_the_trello_format() {
        assert_eq!(field_body(&FieldValue::Text("T1".into())), json!({"value": {"text": "T1"}}));
        assert_eq!(field_body(&FieldValue::Number(1.5)), json!({"value": {"number": "1.5"}}));
    }

    fn card_with_comments(due: Option<DateTime<Utc>>, comments: &[&str]) -> Card {
        let mut card = Card::new(CardId::from("c1"), "Prepare the demo".into(), "l1".into());
        card.due = due;
        card.comments = comments.iter().map(|c| c.to_string()).collect();
        card
    }

    #[test]
    fn send_message_comments_are_scheduled_at_the_card_due_date() {
        let due: DateTime<Utc> = "2024-06-03T09:00:00Z".parse().unwrap();
        let card = card_with_comments(Some(due), &[
            "send message team demo\nThe demo starts in 10 minutes\n",
            "send message jdoe",
            "task_id_T1",
            "send messages are ignored",
        ]);

        let messages = messages_of(&card);
        assert_eq!(messages, vec![
            ScheduledMessage::new("team".into(), "The demo starts in 10 minutes".into(), "demo".into(), due),
            ScheduledMessage::new("jdoe".into(), "Prepare the demo".into(), "c1".into(), due),
        ]);
    }

    #[test]
    fn messages_need_a_due_date_and_a_recipient() {
        assert!(messages_of(&card_with_comments(None, &["send message team"])).is_empty());

        let due: DateTime<Utc> = "2024-06-03T09:00:00Z".parse().unwrap();
        assert!(messages_of(&card_with_comments(Some(due), &["send message \nHello"])).is_empty());
    }
}
