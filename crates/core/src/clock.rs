//! Time source used by the transfer monitor and the deletion scheduler.
//!
//! Deadlines are measured on a monotonic [`Instant`]; fire times for deferred
//! jobs use wall-clock UTC. Tests substitute `testing::ManualClock` so polling
//! loops run against virtual time.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic now, for deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock now, for scheduling.
    fn utc_now(&self) -> DateTime<Utc>;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock;
        let start = clock.now();
        clock.sleep(Duration::from_secs(30)).await;
        assert!(clock.now().duration_since(start) >= Duration::from_secs(30));
    }
}
