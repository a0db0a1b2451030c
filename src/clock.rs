//! Wall-clock sources.
//!
//! Anchors are reconciled against wall time, so every component reads "now"
//! through a [`Clock`] instead of calling `Utc::now()` directly.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock. Used in production, where a restart must observe
/// the time that actually passed while the process was down.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall time derived from tokio's clock: `base` plus the tokio time elapsed
/// since construction.
///
/// Under `#[tokio::test(start_paused = true)]` this advances exactly as far
/// as `tokio::time::advance` / auto-advance moves the runtime, which keeps
/// interval ticks and anchor arithmetic on the same timeline.
#[derive(Debug, Clone)]
pub struct RuntimeClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl RuntimeClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for RuntimeClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.origin.elapsed();
        let elapsed = chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero());
        self.base + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn runtime_clock_follows_paused_time() {
        let base = Utc::now();
        let clock = RuntimeClock::new(base);
        assert_eq!(clock.now(), base);

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), base + chrono::Duration::seconds(90));
    }
}
