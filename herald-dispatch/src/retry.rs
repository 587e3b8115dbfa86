//! Retry policy for transient delivery failures.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Capped exponential backoff with jitter.
///
/// Attempt numbers are 1-based and include the first try, so
/// `max_attempts = 4` means one initial attempt plus up to three retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total delivery attempts before a request is exhausted.
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds; the delay after failed attempt
    /// `n` is `base * 2^(n - 1)`, capped at [`Self::max_delay_ms`].
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single backoff delay, in milliseconds.
    #[serde(default = "defaults::max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random scaling applied to every delay, as a fraction of the delay
    /// (`0.1` means plus or minus 10%). `0.0` disables jitter.
    #[serde(default = "defaults::jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay_ms(),
            max_delay_ms: defaults::max_delay_ms(),
            jitter_factor: defaults::jitter_factor(),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempts` have concluded.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Whether attempt number `attempt` is the last one the policy allows.
    #[must_use]
    pub const fn is_final_attempt(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// The backoff delay after failed attempt `attempt` (1-based).
    ///
    /// Saturating arithmetic throughout: pathological attempt numbers pin
    /// the delay at [`Self::max_delay_ms`] instead of overflowing.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay_ms = if exponent >= 63 {
            self.max_delay_ms
        } else {
            let multiplier = 1u64 << exponent;
            self.base_delay_ms
                .saturating_mul(multiplier)
                .min(self.max_delay_ms)
        };

        if self.jitter_factor <= 0.0 {
            return Duration::from_millis(delay_ms);
        }

        // Intentional precision loss and casting for randomization
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let jittered_ms = {
            let jitter_range = (delay_ms as f64) * self.jitter_factor;
            let mut rng = rand::rng();
            let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
            ((delay_ms as f64) + jitter).max(0.0) as u64
        };

        Duration::from_millis(jittered_ms)
    }
}

mod defaults {
    pub(super) const fn max_attempts() -> u32 {
        4
    }

    pub(super) const fn base_delay_ms() -> u64 {
        1_000
    }

    pub(super) const fn max_delay_ms() -> u64 {
        30_000
    }

    pub(super) const fn jitter_factor() -> f64 {
        0.1
    }
}
