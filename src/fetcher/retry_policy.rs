//! Retry policy for failed asset fetches.
//!
//! Implements exponential backoff with a ceiling and random jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::FetchSettings;

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per asset (first try included).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Cap for exponential growth, jitter excluded.
    pub max_backoff: Duration,
    /// Upper bound of the random delay added on top of the backoff.
    pub jitter: Duration,
    /// Multiplier applied to backoff after each retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(config: &FetchSettings) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            jitter: Duration::from_millis(config.backoff_jitter_ms),
            backoff_multiplier: 2.0,
        }
    }

    /// Backoff before the attempt following failed attempt number `attempt`
    /// (1-based), without jitter.
    ///
    /// `initial_backoff * multiplier^(attempt - 1)`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let backoff_ms =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = backoff_ms.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// Backoff plus a uniform random jitter in `[0, jitter]`.
    pub fn delay_with_jitter<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rng.random_range(0..=jitter_ms)
        };
        self.backoff(attempt) + Duration::from_millis(extra)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&FetchSettings::default())
    }
}
