//! Randomized delay applied before each outbound request.

use std::time::Duration;

use rand::Rng;

use super::constants::{DEFAULT_COURTESY_MAX_MS, DEFAULT_COURTESY_MIN_MS};

/// Uniformly random pause between `min` and `max`, spacing requests to remote hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourtesyDelay {
    min: Duration,
    max: Duration,
}

impl Default for CourtesyDelay {
    fn default() -> Self {
        Self::from_millis(DEFAULT_COURTESY_MIN_MS, DEFAULT_COURTESY_MAX_MS)
    }
}

impl CourtesyDelay {
    /// Creates a delay range; bounds are swapped if given in reverse.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// No delay at all.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.max.is_zero()
    }

    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a delay within the configured range.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(min_ms..=max_ms))
    }

    /// Sleeps for a sampled delay.
    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
