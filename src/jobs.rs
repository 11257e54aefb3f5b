//! The jobs the scheduler runs
//!
//! Each job is a plain function over the capability sources it is given, so that it can run against in-memory sources without any timer.
//! Items are handled independently: a failure on one task, event or message is logged and the job moves on to the next one.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::BoardLayout;
use crate::done::DoneCloser;
use crate::error::SyncResult;
use crate::reconciler::Reconciler;
use crate::scheduler::progress::JobProgress;
use crate::traits::{BoardClient, CalendarSource, ChatSink, MessageSource, ScrumSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Job {
    UpdateSprintIssues,
    SendScheduledMessages,
    UpdateEvents,
    UpdateDone,
}

impl Job {
    /// Every job, in the order they run when several are due at the same tick
    pub const ALL: [Job; 4] = [
        Job::UpdateSprintIssues,
        Job::SendScheduledMessages,
        Job::UpdateEvents,
        Job::UpdateDone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Job::UpdateSprintIssues => "update_sprint_issues",
            Job::SendScheduledMessages => "send_scheduled_messages",
            Job::UpdateEvents => "update_events",
            Job::UpdateDone => "update_done",
        }
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}


/// Upserts a card for every task of the current sprint
pub async fn update_sprint_issues(scrum: &dyn ScrumSource, reconciler: &Reconciler, progress: &mut JobProgress) -> SyncResult<()> {
    let tasks = scrum.current_sprint_tasks(None).await?;
    progress.info(&format!("Upserting {} sprint tasks", tasks.len()));

    for task in tasks {
        progress.info(&format!("Upserting sprint task {}", task.id()));
        if let Err(err) = reconciler.upsert_task(&task, progress).await {
            progress.error(&format!("Unable to upsert task {}: {}. Skipping it this time.", task.id(), err));
        }
    }
    Ok(())
}

/// Forwards to the chat every message that is scheduled at or before `now`.
///
/// Messages are not removed from their source. A message will be sent again at the next run,
/// unless the source stops listing it.
pub async fn send_scheduled_messages(
    messages: &dyn MessageSource,
    chat: &dyn ChatSink,
    now: DateTime<Utc>,
    progress: &mut JobProgress,
) -> SyncResult<()> {
    let due: Vec<_> = messages.list_messages().await?
        .into_iter()
        .filter(|message| message.is_due(&now))
        .collect();
    progress.info(&format!("Sending {} scheduled messages", due.len()));

    for message in due {
        progress.debug(&format!("Sending message to {} (scheduled at {})", message.recipient(), message.schedule()));
        if let Err(err) = chat.send_message(message.to_message()).await {
            progress.error(&format!("Unable to send message to {}: {}. Skipping it this time.", message.recipient(), err));
        }
    }
    Ok(())
}

/// Upserts a card for every accepted event of the week
pub async fn update_events(calendar: &dyn CalendarSource, reconciler: &Reconciler, progress: &mut JobProgress) -> SyncResult<()> {
    let events = calendar.list_week_events().await?;
    progress.info(&format!("Upserting {} calendar events", events.len()));

    for event in events {
        if let Err(err) = reconciler.upsert_calendar_event(&event, progress).await {
            progress.error(&format!("Unable to upsert event {}: {}. Skipping it this time.", event.id(), err));
        }
    }
    Ok(())
}

pub async fn update_done(closer: &DoneCloser, progress: &mut JobProgress) -> SyncResult<()> {
    closer.mark_done(progress).await.map(|_| ())
}


/// Read-only handles to every capability source, shared by all jobs
#[derive(Clone)]
pub struct Workflow {
    scrum: Arc<dyn ScrumSource>,
    messages: Arc<dyn MessageSource>,
    chat: Arc<dyn ChatSink>,
    calendar: Arc<dyn CalendarSource>,
    reconciler: Reconciler,
    closer: DoneCloser,
}

impl Workflow {
    pub fn new(
        scrum: Arc<dyn ScrumSource>,
        board: Arc<dyn BoardClient>,
        messages: Arc<dyn MessageSource>,
        chat: Arc<dyn ChatSink>,
        calendar: Arc<dyn CalendarSource>,
        layout: BoardLayout,
    ) -> Self {
        let closer = DoneCloser::new(board.clone(), layout.done_list.clone());
        let reconciler = Reconciler::new(board, layout);
        Self { scrum, messages, chat, calendar, reconciler, closer }
    }

    pub fn reconciler(&self) -> &Reconciler { &self.reconciler }
    pub fn closer(&self) -> &DoneCloser     { &self.closer     }

    /// Runs a job to completion
    pub async fn run(&self, job: Job, now: DateTime<Utc>, progress: &mut JobProgress) -> SyncResult<()> {
        match job {
            Job::UpdateSprintIssues => update_sprint_issues(self.scrum.as_ref(), &self.reconciler, progress).await,
            Job::SendScheduledMessages => send_scheduled_messages(self.messages.as_ref(), self.chat.as_ref(), now, progress).await,
            Job::UpdateEvents => update_events(self.calendar.as_ref(), &self.reconciler, progress).await,
            Job::UpdateDone => update_done(&self.closer, progress).await,
        }
    }
}
