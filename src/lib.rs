//! This crate keeps a personal board (e.g. Trello) in sync with the trackers of its owner.
//!
//! The tasks of the current sprint (e.g. from Jira) and the accepted calendar events become cards of the board, in the [`reconciler`] module.
//! Every card carries a marker comment, that identifies the task or event it tracks, so that it is found again at the next sync.
//!
//! A [`Scheduler`](scheduler::Scheduler) runs the jobs (see [`jobs`]) on a fixed cadence. Each job runs to completion, and a failing job never prevents the other ones from running. \
//! The trackers are only reached through the traits of the [`traits`] module. Real clients are in [`client`], in-process ones are in [`memory`].

pub mod traits;
pub mod card;
pub mod error;
pub mod config;

mod task;
pub use task::{Sprint, Task};
mod event;
pub use event::CalendarEvent;
mod message;
pub use message::{Message, ScheduledMessage};

pub mod reconciler;
pub use reconciler::Reconciler;
pub mod done;
pub use done::DoneCloser;
pub mod jobs;
pub use jobs::Workflow;
pub mod scheduler;
pub use scheduler::Scheduler;
pub mod hooks;
pub mod bootstrap;

pub mod client;
pub mod memory;
pub mod mock_behaviour;

pub mod utils;
