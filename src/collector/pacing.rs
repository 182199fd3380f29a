//! Waiting between requests
//!
//! Every suspension point of a collection run (retry backoff, inter-page and
//! inter-item delays) goes through a [`Sleeper`], so the schedule can be
//! observed without actually waiting.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Capability to wait for a duration
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// Records requested waits and returns immediately
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order
    pub fn durations(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .map(|slept| slept.clone())
            .unwrap_or_default()
    }

    /// Sum of every wait requested so far
    pub fn total(&self) -> Duration {
        self.durations().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
        std::future::ready(())
    }
}
