//! Sprint tasks, as produced by a [`ScrumSource`](crate::traits::ScrumSource)

use chrono::{DateTime, Duration, Utc};
use url::Url;

/// A task of the current sprint.
///
/// This is an immutable snapshot: a new one is fetched at every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    /// Identifier of the task in the scrum board (e.g. a Jira issue key)
    id: String,
    title: String,
    /// Remaining estimated work
    remaining: Duration,
    /// Usually the end date of the sprint the task belongs to
    due: DateTime<Utc>,
    /// Canonical URL of the task in the scrum board
    url: Url,
}

impl Task {
    pub fn new(id: String, title: String, remaining: Duration, due: DateTime<Utc>, url: Url) -> Self {
        Self { id, title, remaining, due, url }
    }

    pub fn id(&self) -> &str               { &self.id        }
    pub fn title(&self) -> &str            { &self.title     }
    pub fn remaining(&self) -> Duration    { self.remaining  }
    pub fn due(&self) -> &DateTime<Utc>    { &self.due       }
    pub fn url(&self) -> &Url              { &self.url       }

    /// The remaining work, expressed in (possibly fractional) hours
    pub fn remaining_hours(&self) -> f64 {
        self.remaining.num_seconds() as f64 / 3600.0
    }

    /// Returns a copy of this task, with a different remaining duration
    pub fn with_remaining(&self, remaining: Duration) -> Self {
        Self { remaining, ..self.clone() }
    }
}

/// A sprint of the scrum board
#[derive(Clone, Debug, PartialEq)]
pub struct Sprint {
    id: String,
    end_date: DateTime<Utc>,
}

impl Sprint {
    pub fn new(id: String, end_date: DateTime<Utc>) -> Self {
        Self { id, end_date }
    }

    pub fn id(&self) -> &str                 { &self.id       }
    pub fn end_date(&self) -> &DateTime<Utc> { &self.end_date }
}
