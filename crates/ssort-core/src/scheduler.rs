use std::time::Duration;

use tokio::time::{Instant, sleep_until};

use crate::error::SetupError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed(Instant),
}

/// Recurring flush timer whose phase restarts after every real flush
#[derive(Debug)]
pub struct FlushScheduler {
    period: Duration,
    state: TimerState,
}

impl FlushScheduler {
    /// Create an idle scheduler; call [`FlushScheduler::rearm`] to start it
    pub fn new(period: Duration) -> Result<Self, SetupError> {
        if period.is_zero() {
            return Err(SetupError::ZeroTimeout);
        }
        Ok(Self {
            period,
            state: TimerState::Idle,
        })
    }

    /// Next tick, or `None` while idle
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Idle => None,
            TimerState::Armed(deadline) => Some(deadline),
        }
    }

    /// Restart the phase so the next tick is one full period from now
    pub fn rearm(&mut self) {
        self.state = TimerState::Armed(Instant::now() + self.period);
    }

    pub fn disarm(&mut self) {
        self.state = TimerState::Idle;
    }

    /// Wait for the next tick. Never resolves while idle.
    ///
    /// Cancel safe: the state only advances once the deadline has passed.
    pub async fn fired(&mut self) {
        let TimerState::Armed(deadline) = self.state else {
            return std::future::pending().await;
        };

        sleep_until(deadline).await;

        // Keep the fixed schedule, skipping ticks we were too slow to observe
        let now = Instant::now();
        let mut next = deadline + self.period;
        if next <= now {
            next = now + self.period;
        }
        self.state = TimerState::Armed(next);
    }
}
