//! # eventfeed
//!
//! Consume `text/event-stream` feeds as typed events, resume them with
//! `Last-Event-ID`, and render their payloads incrementally.
//!
//! ## Quick Start
//!
//! ```ignore
//! use eventfeed::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     eventfeed::init_tracing();
//!
//!     let client = EventSourceClient::new("http://localhost:3007/sse", ClientOptions::default());
//!     let typer = ChunkScheduler::new(SchedulerConfig::default());
//!
//!     let scheduler = typer.clone();
//!     client.on(EventName::Message, move |event| {
//!         if let Some(record) = event.record() {
//!             scheduler.enqueue(record.data.clone(), |delta, _, _| {
//!                 print!("{delta}");
//!                 Ok(())
//!             }, None);
//!         }
//!         Ok(())
//!     });
//!
//!     client.connect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! eventfeed is organized as a workspace of focused crates:
//!
//! - [`eventfeed_streaming`] - Wire-format parser and record type
//! - [`eventfeed_client`] - Connection state machine, fan-out and transports
//! - [`eventfeed_typewriter`] - Timed chunk delivery of text payloads
//! - [`eventfeed_retries`] - Reconnect supervision and backoff

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod telemetry;

pub use telemetry::{init_json_tracing, init_tracing, DEFAULT_FILTER};

pub use eventfeed_client as client;
pub use eventfeed_retries as retries;
pub use eventfeed_streaming as streaming;
pub use eventfeed_typewriter as typewriter;

pub use eventfeed_client::{
    ClientError, ClientEvent, ClientOptions, ConnectOutcome, ConnectionState, EventName,
    EventSourceClient, EventTransport, ReqwestTransport, ResponseMeta, SubscriptionId,
    TransportError,
};
pub use eventfeed_retries::{ReconnectConfig, ReconnectError, ReconnectSupervisor, WaitStrategy};
pub use eventfeed_streaming::{EventRecord, FrameParser, FrameStream, StreamError};
pub use eventfeed_typewriter::{ChunkScheduler, JobHandle, SchedulerConfig, SpeedUpdate};

/// Prelude for common imports.
pub mod prelude {
    pub use eventfeed_client::prelude::*;
    pub use eventfeed_retries::prelude::*;
    pub use eventfeed_streaming::prelude::*;
    pub use eventfeed_typewriter::prelude::*;
}
