//! Virtual clock for tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::clock::Clock;

/// A clock that only moves when slept on or advanced.
///
/// `sleep` advances virtual time by the full duration and yields once, so a
/// task racing a sleep gets a chance to complete first.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    utc_origin: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock whose wall time starts at 2026-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::starting_at(Utc.timestamp_opt(1_767_225_600, 0).single().unwrap_or_default())
    }

    pub fn starting_at(utc: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            utc_origin: utc,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Virtual time passed since creation.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += duration;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.utc_origin + offset
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}
