//! Reconnect configuration.

use crate::backoff::WaitStrategy;
use std::time::Duration;

/// Configuration for a [`ReconnectSupervisor`](crate::ReconnectSupervisor).
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Consecutive failed attempts allowed before giving up; `None` retries
    /// forever. The count resets whenever a connection opens.
    pub max_retries: Option<u32>,
    /// Wait strategy.
    pub wait: WaitStrategy,
    /// Prefer the server's `retry:` hint over the wait strategy.
    pub honor_retry_hint: bool,
    /// Reconnect after the server ends the stream normally.
    pub reconnect_on_close: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            wait: WaitStrategy::default(),
            honor_retry_hint: true,
            reconnect_on_close: false,
        }
    }
}

impl ReconnectConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max retries.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Retry forever.
    pub fn unlimited(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Set the wait strategy.
    pub fn wait(mut self, strategy: WaitStrategy) -> Self {
        self.wait = strategy;
        self
    }

    /// Use fixed delay.
    pub fn fixed(mut self, delay: Duration) -> Self {
        self.wait = WaitStrategy::Fixed(delay);
        self
    }

    /// Use exponential backoff.
    pub fn exponential(mut self, initial: Duration, max: Duration) -> Self {
        self.wait = WaitStrategy::exponential(initial, max);
        self
    }

    /// Set whether the server's retry hint wins over the wait strategy.
    pub fn honor_retry_hint(mut self, honor: bool) -> Self {
        self.honor_retry_hint = honor;
        self
    }

    /// Set whether a normal close triggers a reconnect.
    pub fn reconnect_on_close(mut self, reconnect: bool) -> Self {
        self.reconnect_on_close = reconnect;
        self
    }

    /// Whether `failures` consecutive failures exceed the retry budget.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        self.max_retries.is_some_and(|max| failures > max)
    }

    /// Delay before reconnect attempt `attempt`, given the server's hint.
    pub fn delay_for(&self, attempt: u32, retry_hint: Option<Duration>) -> Duration {
        match retry_hint {
            Some(hint) if self.honor_retry_hint => hint,
            _ => self.wait.calculate(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_retries, None);
        assert_eq!(config.wait, WaitStrategy::Fixed(Duration::from_millis(3000)));
        assert!(config.honor_retry_hint);
        assert!(!config.reconnect_on_close);
        assert!(!config.is_exhausted(u32::MAX));
    }

    #[test]
    fn test_config_builder() {
        let config = ReconnectConfig::new()
            .max_retries(2)
            .fixed(Duration::from_secs(1))
            .honor_retry_hint(false)
            .reconnect_on_close(true);

        assert!(!config.is_exhausted(2));
        assert!(config.is_exhausted(3));
        assert!(config.reconnect_on_close);
        assert_eq!(config.unlimited().max_retries, None);
    }

    #[test]
    fn test_retry_hint_precedence() {
        let hint = Some(Duration::from_millis(250));
        let config = ReconnectConfig::new().fixed(Duration::from_secs(1));
        assert_eq!(config.delay_for(1, hint), Duration::from_millis(250));
        assert_eq!(config.delay_for(1, None), Duration::from_secs(1));

        let config = config.honor_retry_hint(false);
        assert_eq!(config.delay_for(1, hint), Duration::from_secs(1));
    }
}
