//! # eventfeed-typewriter
//!
//! Incremental "typewriter" delivery of text payloads.
//!
//! ## Core Concepts
//!
//! - **[`ChunkScheduler`]**: FIFO job queue drained by a single timer
//! - **[`SchedulerConfig`]**: Characters per tick and tick interval
//! - **[`JobHandle`]**: Cancels one job, current or queued
//!
//! ## Example
//!
//! ```ignore
//! use eventfeed_typewriter::{ChunkScheduler, SchedulerConfig, SpeedUpdate};
//! use std::time::Duration;
//!
//! let scheduler = ChunkScheduler::new(SchedulerConfig::default());
//!
//! let job = scheduler.enqueue(
//!     "Hello from the feed",
//!     |delta, text, done| {
//!         print!("{delta}");
//!         if done {
//!             println!("\n({} chars)", text.chars().count());
//!         }
//!         Ok(())
//!     },
//!     None,
//! );
//!
//! scheduler.set_speed(SpeedUpdate::new().chunk_size(1).interval(Duration::from_millis(50)));
//! job.cancel();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod scheduler;

pub use config::{SchedulerConfig, SpeedUpdate, DEFAULT_CHUNK_SIZE, DEFAULT_INTERVAL};
pub use error::{TypewriterError, TypewriterResult};
pub use scheduler::{ChunkScheduler, JobHandle, JobId, UpdateFn};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{ChunkScheduler, JobHandle, SchedulerConfig, SpeedUpdate};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let config = SchedulerConfig::default();
        assert_eq!(config.chunk_size, 3);
        assert_eq!(SpeedUpdate::new().chunk_size(2).chunk_size, Some(2));
    }
}
