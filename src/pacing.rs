//! Politeness delay between consecutive requests.
//!
//! The delay is unconditional: it does not react to server responses. It is
//! inserted after one attempt finishes and before the next one starts, so
//! the very first request of a run goes out immediately.

use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Something that waits between requests.
pub trait Pacer {
    async fn pause(&mut self);
}

/// Uniformly random delay in `[min, max]`.
#[derive(Debug, Clone)]
pub struct RandomPacer {
    min: Duration,
    max: Duration,
    started: bool,
}

impl RandomPacer {
    /// Create a pacer drawing delays from `[min, max]`.
    ///
    /// # Arguments
    ///
    /// * `min` - Shortest wait between two requests
    /// * `max` - Longest wait between two requests
    ///
    /// # Returns
    ///
    /// A pacer whose first [`Pacer::pause`] returns immediately. Bounds
    /// are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            started: false,
        }
    }

    /// Draw one delay from the configured range.
    pub fn next_delay(&self) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rng().random_range(lo..=hi))
    }
}

impl Pacer for RandomPacer {
    async fn pause(&mut self) {
        if !self.started {
            self.started = true;
            return;
        }
        let delay = self.next_delay();
        debug!(?delay, "Pacing before next request");
        sleep(delay).await;
    }
}
