//! Wait strategies between reconnect attempts.

use std::time::Duration;

/// Legacy default delay between reconnects.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Strategy for waiting between reconnect attempts.
///
/// Attempts are 1-indexed: the first reconnect after a failure is attempt 1.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitStrategy {
    /// Reconnect immediately.
    None,
    /// Fixed delay.
    Fixed(Duration),
    /// Exponential backoff.
    ExponentialBackoff {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier for each attempt.
        multiplier: f64,
    },
    /// Exponential backoff with jitter.
    ExponentialJitter {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier for each attempt.
        multiplier: f64,
        /// Jitter factor (0.0 to 1.0).
        jitter: f64,
    },
    /// Linear backoff.
    Linear {
        /// Initial delay.
        initial: Duration,
        /// Increment per attempt.
        increment: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl WaitStrategy {
    /// Exponential backoff doubling from `initial` up to `max`.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::ExponentialBackoff {
            initial,
            max,
            multiplier: 2.0,
        }
    }

    /// Exponential backoff with a jitter factor.
    pub fn exponential_jitter(initial: Duration, max: Duration, jitter: f64) -> Self {
        Self::ExponentialJitter {
            initial,
            max,
            multiplier: 2.0,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Calculate the wait before the given attempt.
    pub fn calculate(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1).saturating_sub(1).min(i32::MAX as u32) as i32;
        match self {
            WaitStrategy::None => Duration::ZERO,
            WaitStrategy::Fixed(d) => *d,
            WaitStrategy::ExponentialBackoff {
                initial,
                max,
                multiplier,
            } => {
                let delay = initial.as_secs_f64() * multiplier.powi(exponent);
                Duration::from_secs_f64(delay.min(max.as_secs_f64()))
            }
            WaitStrategy::ExponentialJitter {
                initial,
                max,
                multiplier,
                jitter,
            } => {
                let base = initial.as_secs_f64() * multiplier.powi(exponent);
                let jitter_amount = base * jitter * random_jitter();
                let delay = (base + jitter_amount).min(max.as_secs_f64());
                Duration::from_secs_f64(delay.max(0.0))
            }
            WaitStrategy::Linear {
                initial,
                increment,
                max,
            } => {
                let delay = initial.saturating_add(increment.saturating_mul(exponent as u32));
                delay.min(*max)
            }
        }
    }
}

/// Generate a random jitter factor between -1.0 and 1.0.
fn random_jitter() -> f64 {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    rng.gen_range(-1.0..1.0)
}
