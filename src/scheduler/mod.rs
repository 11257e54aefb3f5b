//! The control loop that runs the jobs on a fixed cadence
//!
//! A single [`Ticker`] drives every job. At each tick, the jobs that are due run one after the other, to completion.
//! A job that fails is logged and rescheduled like any other: it never prevents the following jobs from running.

use std::convert::TryFrom;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::config::ScheduleSettings;
use crate::error::{SyncError, SyncResult};
use crate::jobs::Workflow;

pub use crate::jobs::Job;

pub mod progress;
use progress::{FeedbackSender, JobEvent, JobProgress};

pub mod ticker;
pub use ticker::{ticker, Ticker, TickerHandle};


struct Entry {
    job: Job,
    every: Duration,
    /// `None` until the scheduler has seen its first tick
    next_run: Option<DateTime<Utc>>,
}

fn interval(secs: u64, job: Job) -> SyncResult<Duration> {
    i64::try_from(secs).ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| SyncError::Configuration(format!("interval of job {} is out of range ({}s)", job.name(), secs)))
}

/// Jobs whose next run would fall beyond the last representable date never run again
fn after(now: DateTime<Utc>, every: Duration) -> DateTime<Utc> {
    now.checked_add_signed(every).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// What happened during a tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub succeeded: Vec<Job>,
    pub failed: Vec<Job>,
}

impl TickReport {
    pub fn ran(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

pub struct Scheduler {
    entries: Vec<Entry>,
    run_at_startup: bool,
    job_timeout: Option<StdDuration>,
    feedback_channel: Option<FeedbackSender>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a scheduler with no job
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            run_at_startup: true,
            job_timeout: None,
            feedback_channel: None,
        }
    }

    /// Create a scheduler that runs every job at the intervals of the settings
    ///
    /// Intervals that do not fit a date computation are configuration errors
    pub fn from_settings(settings: &ScheduleSettings) -> SyncResult<Self> {
        let mut scheduler = Self::new()
            .every(interval(settings.sprint_issues_secs, Job::UpdateSprintIssues)?, Job::UpdateSprintIssues)
            .every(interval(settings.scheduled_messages_secs, Job::SendScheduledMessages)?, Job::SendScheduledMessages)
            .every(interval(settings.events_secs, Job::UpdateEvents)?, Job::UpdateEvents)
            .every(interval(settings.done_secs, Job::UpdateDone)?, Job::UpdateDone)
            .run_at_startup(settings.run_at_startup);
        scheduler.job_timeout = settings.job_timeout_secs.map(StdDuration::from_secs);
        Ok(scheduler)
    }

    /// Schedules `job` to run every `every`
    pub fn every(mut self, every: Duration, job: Job) -> Self {
        self.entries.push(Entry { job, every, next_run: None });
        self
    }

    /// Whether jobs run at the first tick, or only once their interval has elapsed
    pub fn run_at_startup(mut self, run_at_startup: bool) -> Self {
        self.run_at_startup = run_at_startup;
        self
    }

    /// Jobs that are still running after `timeout` are abandoned, and considered as failed
    pub fn with_job_timeout(mut self, timeout: StdDuration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    /// Sends job events to this channel (see [`progress::feedback_channel`])
    pub fn with_feedback(mut self, sender: FeedbackSender) -> Self {
        self.feedback_channel = Some(sender);
        self
    }

    /// When `job` is going to run next, if it has been scheduled already
    pub fn next_run(&self, job: Job) -> Option<DateTime<Utc>> {
        self.entries.iter()
            .find(|entry| entry.job == job)
            .and_then(|entry| entry.next_run)
    }

    /// Returns the jobs that are due at `now`, and schedules their next run.
    ///
    /// A job that is overdue by several intervals (e.g. because the host was asleep) is returned only once.
    pub fn due_jobs(&mut self, now: DateTime<Utc>) -> Vec<Job> {
        let run_at_startup = self.run_at_startup;
        let mut due = Vec::new();
        for entry in &mut self.entries {
            let every = entry.every;
            let next_run = *entry.next_run.get_or_insert_with(|| {
                if run_at_startup { now } else { after(now, every) }
            });
            if next_run <= now {
                due.push(entry.job);
                entry.next_run = Some(after(now, every));
            }
        }
        due
    }

    /// Runs the jobs that are due at `now`, one after the other
    pub async fn run_pending(&mut self, workflow: &Workflow, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for job in self.due_jobs(now) {
            self.feedback(JobEvent::Started{ job });
            let mut progress = JobProgress::new();
            progress.info(&format!("Running job {}", job));

            let result = match self.job_timeout {
                Some(limit) => tokio::time::timeout(limit, workflow.run(job, now, &mut progress))
                    .await
                    .unwrap_or_else(|elapsed| Err(SyncError::from(elapsed))),
                None => workflow.run(job, now, &mut progress).await,
            };
            if let Err(err) = result {
                progress.error(&format!("Job {} failed: {}. It will run again when it is next due.", job, err));
            }

            let success = progress.is_success();
            progress.info(&format!("Job {} finished ({} warnings, {} errors)", job, progress.warnings(), progress.errors()));
            self.feedback(JobEvent::Finished{ job, success });
            match success {
                true => report.succeeded.push(job),
                false => report.failed.push(job),
            }
        }

        report
    }

    /// Runs the jobs as they become due, until the ticker is cancelled
    pub async fn run(&mut self, workflow: &Workflow, mut ticker: Ticker) {
        log::info!("Scheduler started with {} jobs", self.entries.len());
        while let Some(now) = ticker.tick().await {
            let report = self.run_pending(workflow, now).await;
            if report.failed.is_empty() == false {
                log::warn!("Some jobs failed at this tick: {:?}", report.failed);
            }
        }
        log::info!("Scheduler stopped");
    }

    fn feedback(&self, event: JobEvent) {
        if let Some(sender) = &self.feedback_channel {
            // Nobody may be listening anymore, which is fine
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn jobs_run_at_startup_then_every_interval() {
        let mut scheduler = Scheduler::new()
            .every(Duration::hours(1), Job::UpdateSprintIssues)
            .every(Duration::seconds(30), Job::SendScheduledMessages);

        assert_eq!(scheduler.due_jobs(t0()), vec![Job::UpdateSprintIssues, Job::SendScheduledMessages]);
        assert!(scheduler.due_jobs(t0() + Duration::seconds(1)).is_empty());
        assert_eq!(scheduler.due_jobs(t0() + Duration::seconds(30)), vec![Job::SendScheduledMessages]);
        assert_eq!(scheduler.next_run(Job::UpdateSprintIssues), Some(t0() + Duration::hours(1)));
        assert_eq!(scheduler.due_jobs(t0() + Duration::hours(1)), vec![Job::UpdateSprintIssues, Job::SendScheduledMessages]);
    }

    #[test]
    fn jobs_can_wait_for_their_first_interval() {
        let mut scheduler = Scheduler::new()
            .every(Duration::hours(1), Job::UpdateDone)
            .run_at_startup(false);

        assert!(scheduler.due_jobs(t0()).is_empty());
        assert!(scheduler.due_jobs(t0() + Duration::minutes(59)).is_empty());
        assert_eq!(scheduler.due_jobs(t0() + Duration::hours(1)), vec![Job::UpdateDone]);
    }

    #[test]
    fn overdue_jobs_run_once() {
        let mut scheduler = Scheduler::new()
            .every(Duration::hours(1), Job::UpdateEvents);
        scheduler.due_jobs(t0());

        // The host was asleep for five hours
        let wake_up = t0() + Duration::hours(5);
        assert_eq!(scheduler.due_jobs(wake_up), vec![Job::UpdateEvents]);
        assert!(scheduler.due_jobs(wake_up + Duration::seconds(1)).is_empty());
        assert_eq!(scheduler.next_run(Job::UpdateEvents), Some(wake_up + Duration::hours(1)));
    }

    #[test]
    fn settings_schedule_every_job() {
        let scheduler = Scheduler::from_settings(&ScheduleSettings::default()).unwrap();
        assert_eq!(scheduler.entries.len(), Job::ALL.len());
        assert!(scheduler.entries.iter().all(|entry| entry.every == Duration::hours(1)));
        assert_eq!(scheduler.job_timeout, None);
    }

    #[test]
    fn very_long_intervals_do_not_overflow() {
        let mut scheduler = Scheduler::new()
            .every(Duration::days(365 * 1_000_000), Job::UpdateDone);

        assert_eq!(scheduler.due_jobs(t0()), vec![Job::UpdateDone]);
        assert_eq!(scheduler.next_run(Job::UpdateDone), Some(DateTime::<Utc>::MAX_UTC));
        assert!(scheduler.due_jobs(t0() + Duration::days(365 * 100)).is_empty());
    }

    #[test]
    fn out_of_range_intervals_are_rejected() {
        let settings = ScheduleSettings { events_secs: u64::MAX, ..ScheduleSettings::default() };
        match Scheduler::from_settings(&settings) {
            Err(err) => {
                assert!(matches!(err, SyncError::Configuration(_)));
                assert!(err.is_fatal());
            },
            Ok(_) => panic!("an interval of u64::MAX seconds was accepted"),
        }
    }
}
