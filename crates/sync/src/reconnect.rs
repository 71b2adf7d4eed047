//! Delay schedule between reconnect attempts

use std::time::Duration;

use fresco_config::{BackoffMode, SessionConfig};

/// Doubling stops growing after this many attempts
const MAX_DOUBLINGS: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    mode: BackoffMode,
    base: Duration,
    max: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn flat(delay: Duration) -> Self {
        Self {
            mode: BackoffMode::Flat,
            base: delay,
            max: delay,
            attempts: 0,
        }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            mode: BackoffMode::Exponential,
            base,
            max: max.max(base),
            attempts: 0,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        match config.backoff {
            BackoffMode::Flat => Self::flat(config.reconnect_delay()),
            BackoffMode::Exponential => {
                Self::exponential(config.reconnect_delay(), config.reconnect_max_delay())
            }
        }
    }

    /// Delay before the next attempt. Counts the attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.mode {
            BackoffMode::Flat => self.base,
            BackoffMode::Exponential => {
                let factor = 1u32 << self.attempts.min(MAX_DOUBLINGS);
                self.base.saturating_mul(factor).min(self.max)
            }
        };
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// A connection opened; start over from the base delay
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
