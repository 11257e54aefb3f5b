//! Chat messages, and messages waiting for their schedule time

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// A message that should be posted to a chat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub recipient: String,
    pub content: String,
    /// The conversation thread this message belongs to
    pub thread: String,
}

/// A message, as stored in a [`MessageSource`](crate::traits::MessageSource)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    recipient: String,
    content: String,
    thread: String,
    schedule: DateTime<Utc>,
}

impl ScheduledMessage {
    pub fn new(recipient: String, content: String, thread: String, schedule: DateTime<Utc>) -> Self {
        Self { recipient, content, thread, schedule }
    }

    pub fn recipient(&self) -> &str           { &self.recipient }
    pub fn content(&self) -> &str             { &self.content   }
    pub fn thread(&self) -> &str              { &self.thread    }
    pub fn schedule(&self) -> &DateTime<Utc>  { &self.schedule  }

    /// Whether this message should be sent at `now` (or should have been sent already)
    pub fn is_due(&self, now: &DateTime<Utc>) -> bool {
        &self.schedule <= now
    }

    pub fn to_message(&self) -> Message {
        Message {
            recipient: self.recipient.clone(),
            content: self.content.clone(),
            thread: self.thread.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn messages_scheduled_now_are_due() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let at = |schedule| ScheduledMessage::new("team".into(), "hello".into(), "standup".into(), schedule);

        assert!(at(now - Duration::hours(1)).is_due(&now));
        assert!(at(now).is_due(&now));
        assert!(!at(now + Duration::seconds(1)).is_due(&now));
    }
}
