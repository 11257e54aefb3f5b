//! Utilities to track the outcome of a job

use std::fmt::{Display, Error, Formatter};

use super::Job;

/// An event that happens while the scheduler runs
#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent {
    /// No job has run yet
    Idle,
    /// A job has just started
    Started { job: Job },
    /// A job has finished. `success` is false if the job, or one of the items it handled, failed
    Finished { job: Job, success: bool },
}

impl Display for JobEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            JobEvent::Idle => write!(f, "Idle"),
            JobEvent::Started{job} => write!(f, "[{}] started...", job),
            JobEvent::Finished{job, success} => match success {
                true => write!(f, "[{}] successfully finished", job),
                false => write!(f, "[{}] finished with errors", job),
            }
        }
    }
}

impl Default for JobEvent {
    fn default() -> Self {
        Self::Idle
    }
}



/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<JobEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<JobEvent>;

/// Create a feeback channel, that can be used to retrieve the last thing the scheduler did
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(JobEvent::default())
}



/// The logging handle given to every reconciliation operation.
///
/// It forwards to the `log` macros, and counts the warnings and errors it has been given
#[derive(Debug, Default)]
pub struct JobProgress {
    n_warnings: u32,
    n_errors: u32,
}

impl JobProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no error has been reported. Warnings do not count
    pub fn is_success(&self) -> bool {
        self.n_errors == 0
    }
    pub fn warnings(&self) -> u32 {
        self.n_warnings
    }
    pub fn errors(&self) -> u32 {
        self.n_errors
    }

    /// Log an error
    pub fn error(&mut self, text: &str) {
        log::error!("{}", text);
        self.n_errors += 1;
    }
    /// Log a warning
    pub fn warn(&mut self, text: &str) {
        log::warn!("{}", text);
        self.n_warnings += 1;
    }
    /// Log an info
    pub fn info(&mut self, text: &str) {
        log::info!("{}", text);
    }
    /// Log a debug message
    pub fn debug(&mut self, text: &str) {
        log::debug!("{}", text);
    }
    /// Log a trace message
    pub fn trace(&mut self, text: &str) {
        log::trace!("{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_fail_a_job() {
        let mut progress = JobProgress::new();
        progress.warn("two cards for task T1");
        assert!(progress.is_success());
        assert_eq!(progress.warnings(), 1);

        progress.error("unknown list Done");
        assert!(!progress.is_success());
        assert_eq!(progress.errors(), 1);
    }

    #[test]
    fn events_are_displayed() {
        let event = JobEvent::Finished{ job: Job::UpdateDone, success: false };
        assert_eq!(event.to_string(), "[update_done] finished with errors");
    }
}
