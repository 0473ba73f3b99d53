//! Countdown and auto-submit timer.
//!
//! [`Countdown`] is the pure counter; [`CountdownTimer`] owns a tokio task
//! that ticks it once per interval and publishes the remaining seconds on a
//! `watch` channel. The timer never pauses. It stops either by reaching zero
//! or by an explicit [`CountdownTimer::cancel`].

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u64),
    Expired,
}

/// Seconds remaining out of a fixed total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: u64,
    remaining: u64,
}

impl Countdown {
    pub fn new(total_seconds: u64) -> Self {
        Self {
            total: total_seconds,
            remaining: total_seconds,
        }
    }

    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(u64::from(minutes) * 60)
    }

    /// Decrement by one second.
    pub fn tick(&mut self) -> Tick {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn elapsed(&self) -> u64 {
        self.total - self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

/// A running countdown owned by one session.
pub struct CountdownTimer {
    remaining: watch::Receiver<u64>,
    handle: Option<JoinHandle<()>>,
    cancelled: bool,
}

impl CountdownTimer {
    /// Spawn the ticking task. Must be called from within a tokio runtime.
    pub fn start(countdown: Countdown, tick_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(countdown.remaining());

        let handle = if countdown.is_expired() {
            None
        } else {
            Some(tokio::spawn(async move {
                let mut countdown = countdown;
                let mut interval = interval_at(Instant::now() + tick_interval, tick_interval);
                loop {
                    interval.tick().await;
                    match countdown.tick() {
                        Tick::Running(remaining) => {
                            if tx.send(remaining).is_err() {
                                break;
                            }
                        }
                        Tick::Expired => {
                            let _ = tx.send(0);
                            tracing::debug!(total = countdown.total(), "countdown expired");
                            break;
                        }
                    }
                }
            }))
        };

        Self {
            remaining: rx,
            handle,
            cancelled: false,
        }
    }

    /// Stop ticking. Idempotent; after this, [`expired`](Self::expired) never resolves.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Seconds left, as of the last tick.
    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// A receiver that observes every published remaining-seconds value.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    /// Resolves once the countdown reaches zero. Cancel-safe.
    ///
    /// Pending forever if the timer was cancelled first.
    pub async fn expired(&mut self) {
        loop {
            if self.cancelled {
                return std::future::pending().await;
            }
            if *self.remaining.borrow_and_update() == 0 {
                return;
            }
            if self.remaining.changed().await.is_err() {
                // sender gone without reaching zero: aborted
                return std::future::pending().await;
            }
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("remaining", &self.remaining())
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_ticks_to_expiry() {
        let mut c = Countdown::new(3);
        assert_eq!(c.tick(), Tick::Running(2));
        assert_eq!(c.tick(), Tick::Running(1));
        assert_eq!(c.tick(), Tick::Expired);
        assert!(c.is_expired());
        assert_eq!(c.elapsed(), 3);
        assert_eq!(c.tick(), Tick::Expired);
    }

    #[test]
    fn countdown_from_minutes() {
        let c = Countdown::from_minutes(2);
        assert_eq!(c.remaining(), 120);
        assert_eq!(c.total(), 120);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_publishes_remaining_and_expires() {
        let mut timer = CountdownTimer::start(Countdown::new(5), Duration::from_secs(1));
        assert_eq!(timer.remaining(), 5);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(timer.remaining(), 3);

        let start = Instant::now();
        timer.expired().await;
        assert_eq!(timer.remaining(), 0);
        assert_eq!(start.elapsed(), Duration::from_millis(2_500));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_expires() {
        let mut timer = CountdownTimer::start(Countdown::new(2), Duration::from_secs(1));
        timer.cancel();
        timer.cancel();
        assert!(timer.is_cancelled());

        let waited = tokio::time::timeout(Duration::from_secs(10), timer.expired()).await;
        assert!(waited.is_err(), "cancelled timer must not fire");
        assert_eq!(timer.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_length_countdown_is_already_expired() {
        let mut timer = CountdownTimer::start(Countdown::new(0), Duration::from_secs(1));
        timer.expired().await;
        assert_eq!(timer.remaining(), 0);
    }
}
