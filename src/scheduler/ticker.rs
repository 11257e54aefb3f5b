//! A cancellable ticker

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Create a ticker that fires every `resolution`, and the handle that stops it
pub fn ticker(resolution: Duration) -> (TickerHandle, Ticker) {
    let (sender, receiver) = watch::channel(false);
    let mut interval = tokio::time::interval(resolution);
    // A tick that was missed because a job was slow is not caught up afterwards
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    (TickerHandle { cancel: sender }, Ticker { interval, cancel: receiver })
}

/// Stops a [`Ticker`]. Dropping the handle stops it as well
#[derive(Debug)]
pub struct TickerHandle {
    cancel: watch::Sender<bool>,
}

impl TickerHandle {
    pub fn cancel(&self) {
        // The ticker may be gone already, in which case there is nothing to stop
        let _ = self.cancel.send(true);
    }
}

#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
    cancel: watch::Receiver<bool>,
}

impl Ticker {
    /// Waits for the next tick, and returns the time it fired at.
    ///
    /// The first tick fires immediately. Returns `None` once the ticker has been cancelled
    pub async fn tick(&mut self) -> Option<DateTime<Utc>> {
        if *self.cancel.borrow() {
            return None;
        }

        tokio::select! {
            _ = self.interval.tick() => Some(Utc::now()),
            _ = self.cancel.changed() => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_tick_is_immediate() {
        let (_handle, mut ticker) = ticker(Duration::from_secs(3600));
        let before = Utc::now();
        let fired = tokio::time::timeout(Duration::from_secs(5), ticker.tick()).await.unwrap();
        assert!(fired.unwrap() >= before);
    }

    #[tokio::test]
    async fn cancelled_ticker_stops() {
        let (handle, mut ticker) = ticker(Duration::from_millis(10));
        assert!(ticker.tick().await.is_some());
        handle.cancel();
        assert!(ticker.tick().await.is_none());
        assert!(ticker.tick().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_tick() {
        let (handle, mut ticker) = ticker(Duration::from_secs(3600));
        assert!(ticker.tick().await.is_some());

        let waiter = tokio::spawn(async move { ticker.tick().await });
        handle.cancel();
        let next = tokio::time::timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_ticker() {
        let (handle, mut ticker) = ticker(Duration::from_secs(3600));
        assert!(ticker.tick().await.is_some());
        drop(handle);
        let next = tokio::time::timeout(Duration::from_secs(5), ticker.tick()).await.unwrap();
        assert!(next.is_none());
    }
}
