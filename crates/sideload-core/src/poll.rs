use sideload_schema::ItemId;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tracing::debug;

/// Counts poll handles so leaks and double releases are observable.
#[derive(Debug, Default)]
pub struct PollGauge {
    live: AtomicUsize,
    armed: AtomicUsize,
    released: AtomicUsize,
}

impl PollGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles currently alive.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Handles ever created.
    pub fn armed(&self) -> usize {
        self.armed.load(Ordering::SeqCst)
    }

    /// Handles ever released.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollEvent {
    Tick,
    DeadlineElapsed,
    Shutdown,
}

/// The timer pair of one polling session: a repeating check tick and an
/// overall deadline. Dropping the handle cancels both.
pub struct PollHandle {
    item: ItemId,
    ticker: Interval,
    deadline: Pin<Box<Sleep>>,
    shutdown: watch::Receiver<bool>,
    gauge: Arc<PollGauge>,
}

impl PollHandle {
    /// First tick fires one `interval` from now; the deadline `deadline` from now.
    pub(crate) fn arm(
        item: ItemId,
        interval: Duration,
        deadline: Duration,
        shutdown: watch::Receiver<bool>,
        gauge: Arc<PollGauge>,
    ) -> Self {
        let now = Instant::now();
        let mut ticker = tokio::time::interval_at(now + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        gauge.armed.fetch_add(1, Ordering::SeqCst);
        gauge.live.fetch_add(1, Ordering::SeqCst);
        debug!(
            "{item}: poll handle armed (every {interval:?}, deadline {deadline:?})"
        );
        Self {
            item,
            ticker,
            deadline: Box::pin(tokio::time::sleep_until(now + deadline)),
            shutdown,
            gauge,
        }
    }

    /// Wait for the next tick, the deadline, or engine shutdown. The deadline
    /// wins when it coincides with a tick.
    pub(crate) async fn next_event(&mut self) -> PollEvent {
        loop {
            if *self.shutdown.borrow() {
                return PollEvent::Shutdown;
            }
            tokio::select! {
                biased;
                () = &mut self.deadline => return PollEvent::DeadlineElapsed,
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        return PollEvent::Shutdown;
                    }
                }
                _ = self.ticker.tick() => return PollEvent::Tick,
            }
        }
    }

    /// Cancel both timers. Equivalent to dropping the handle.
    pub fn release(self) {}
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.gauge.live.fetch_sub(1, Ordering::SeqCst);
        self.gauge.released.fetch_add(1, Ordering::SeqCst);
        debug!("{}: poll handle released", self.item);
    }
}
