//! Calendar events

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// A calendar event the owner of the board has accepted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    id: String,
    name: String,
    start: DateTime<Utc>,
    /// Attendees that accepted the invitation
    #[serde(default)]
    attendees: BTreeSet<String>,
}

impl CalendarEvent {
    pub fn new(id: String, name: String, start: DateTime<Utc>, attendees: BTreeSet<String>) -> Self {
        Self { id, name, start, attendees }
    }

    pub fn id(&self) -> &str                    { &self.id        }
    pub fn name(&self) -> &str                  { &self.name      }
    pub fn start(&self) -> &DateTime<Utc>       { &self.start     }
    pub fn attendees(&self) -> &BTreeSet<String> { &self.attendees }
}
