//! # eventfeed-retries
//!
//! Reconnect supervision for eventfeed clients.
//!
//! An [`EventSourceClient`](eventfeed_client::EventSourceClient) treats every
//! failure as terminal. This crate layers reconnection on top without
//! changing that: a [`ReconnectSupervisor`] re-runs `connect()` after
//! recoverable failures and the client resumes from its last event ID.
//!
//! ## Core Concepts
//!
//! - **[`WaitStrategy`]**: Fixed, exponential, jittered or linear delays
//! - **[`ReconnectConfig`]**: Retry budget, wait strategy and `retry:` hint handling
//! - **[`ReconnectSupervisor`]**: The reconnect loop
//!
//! ## Example
//!
//! ```ignore
//! use eventfeed_client::{ClientOptions, EventSourceClient};
//! use eventfeed_retries::{ReconnectConfig, ReconnectSupervisor};
//! use std::time::Duration;
//!
//! let client = EventSourceClient::new("http://localhost:3007/sse", ClientOptions::default());
//! let config = ReconnectConfig::new()
//!     .max_retries(5)
//!     .exponential(Duration::from_millis(500), Duration::from_secs(30));
//!
//! let supervisor = ReconnectSupervisor::new(client, config);
//! match supervisor.run().await {
//!     Ok(stop) => println!("stopped: {stop:?}"),
//!     Err(err) => eprintln!("gave up: {err}"),
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backoff;
pub mod config;
pub mod error;
pub mod supervisor;

// Re-exports
pub use backoff::{WaitStrategy, DEFAULT_RECONNECT_DELAY};
pub use config::ReconnectConfig;
pub use error::{ReconnectError, ReconnectResult};
pub use supervisor::{ReconnectSupervisor, SupervisorStop};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ReconnectConfig, ReconnectError, ReconnectSupervisor, SupervisorStop, WaitStrategy,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;
        use std::time::Duration;

        let config = ReconnectConfig::new().wait(WaitStrategy::None);
        assert_eq!(config.wait.calculate(1), Duration::ZERO);
    }
}
