use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use url::Url;

use crate::error::{LookupError, SyncResult};
use crate::traits::ChatSink;
use crate::Message;

/// Posts messages to Google Chat spaces, through their incoming webhooks
pub struct GChat {
    http: reqwest::Client,
    /// Webhook of every known recipient
    recipients: BTreeMap<String, Url>,
}

impl GChat {
    pub fn new(recipients: BTreeMap<String, Url>) -> Self {
        Self { http: reqwest::Client::new(), recipients }
    }
}

#[async_trait]
impl ChatSink for GChat {
    async fn send_message(&self, message: Message) -> SyncResult<()> {
        let webhook = match self.recipients.get(&message.recipient) {
            None => {
                log::debug!("Unknown recipient {}. Available: {:?}", message.recipient, self.recipients.keys().collect::<Vec<_>>());
                return Err(LookupError::UnknownRecipient(message.recipient).into());
            },
            Some(webhook) => webhook,
        };

        log::debug!("Sending message to {} in thread {}", message.recipient, message.thread);
        let response = self.http
            .post(webhook.clone())
            .query(&[("threadKey", message.thread.as_str())])
            .json(&json!({ "text": message.content }))
            .send()
            .await?;
        let response = super::check_status(response).await?;
        log::debug!("Message sent: {}", response.text().await.unwrap_or_default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    #[tokio::test]
    async fn unknown_recipients_are_rejected_before_any_request() {
        let chat = GChat::new(BTreeMap::new());
        let message = Message { recipient: "team".into(), content: "hello".into(), thread: "standup".into() };
        match chat.send_message(message).await {
            Err(SyncError::Lookup(LookupError::UnknownRecipient(name))) => assert_eq!(name, "team"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
