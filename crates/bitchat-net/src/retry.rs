//! Reconnect backoff for the push channel.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with bounded random jitter.
///
/// The delay for attempt `n` is `base * 2^n`, capped at `max`, then spread by
/// up to `jitter_ratio` in either direction. `max_attempts == 0` means retry
/// forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_ratio: f64,
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms: base_delay_ms.max(1),
            max_delay_ms: max_delay_ms.max(base_delay_ms.max(1)),
            jitter_ratio: 0.2,
            max_attempts,
        }
    }

    pub fn with_jitter(mut self, jitter_ratio: f64) -> Self {
        self.jitter_ratio = jitter_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt is allowed after `attempt` consecutive failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt < self.max_attempts
    }

    /// Backoff before attempt `attempt` (0-based), without jitter.
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.min(20);
        let calculated = self.base_delay_ms.saturating_mul(1_u64 << shift);
        Duration::from_millis(calculated.min(self.max_delay_ms))
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.jittered(self.base_delay_for_attempt(attempt), &mut rand::thread_rng())
    }

    fn jittered<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        if self.jitter_ratio == 0.0 {
            return delay;
        }
        let ms = delay.as_millis() as f64;
        let spread = ms * self.jitter_ratio;
        let jittered = ms + rng.gen_range(-spread..=spread);
        Duration::from_millis(jittered.clamp(0.0, self.max_delay_ms as f64) as u64)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(500, 30_000, 0)
    }
}
