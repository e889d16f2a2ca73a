//! Pacing configuration.

use std::time::Duration;

/// Default number of characters released per tick.
pub const DEFAULT_CHUNK_SIZE: usize = 3;

/// Default delay between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30);

/// How fast a [`ChunkScheduler`](crate::ChunkScheduler) releases text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Characters released per tick, at least 1.
    pub chunk_size: usize,
    /// Delay between ticks.
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size. Zero is raised to 1.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the tick interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Apply a partial update.
    pub fn apply(&mut self, update: SpeedUpdate) {
        if let Some(chunk_size) = update.chunk_size {
            self.chunk_size = chunk_size.max(1);
        }
        if let Some(interval) = update.interval {
            self.interval = interval;
        }
    }
}

/// A partial change to the pacing; unset fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeedUpdate {
    /// New chunk size.
    pub chunk_size: Option<usize>,
    /// New tick interval.
    pub interval: Option<Duration>,
}

impl SpeedUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the chunk size.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Change the interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}
