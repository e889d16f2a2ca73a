//! # eventfeed-client
//!
//! Stateful `text/event-stream` client for eventfeed.
//!
//! ## Core Concepts
//!
//! - **[`EventSourceClient`]**: One logical connection with typed fan-out
//! - **[`ConnectionState`]**: `Idle`, `Connecting`, `Open`, `Closed`, `Errored`
//! - **[`EventName`] / [`ClientEvent`]**: Reserved lifecycle events plus named custom events
//! - **[`EventTransport`]**: Injected capability that opens the HTTP stream
//! - **[`ReqwestTransport`]**: Default transport built on `reqwest`
//!
//! ## Example
//!
//! ```ignore
//! use eventfeed_client::{ClientOptions, EventName, EventSourceClient};
//!
//! let client = EventSourceClient::new("http://localhost:3007/sse", ClientOptions::default());
//!
//! client.on(EventName::Message, |event| {
//!     if let Some(record) = event.record() {
//!         println!("{}", record.data);
//!     }
//!     Ok(())
//! });
//!
//! // Settles when the stream closes or fails; never returns an error.
//! let outcome = client.connect().await;
//!
//! // Resume later from the last seen record ID.
//! client.connect().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod events;
pub mod options;
mod registry;
pub mod state;
pub mod transport;

// Re-exports
pub use client::{ConnectFuture, ConnectOutcome, EventSourceClient};
pub use error::{ClientError, ClientResult, TransportError, TransportResult};
pub use events::{ClientEvent, EventName, ResponseMeta};
pub use options::{ClientOptions, LAST_EVENT_ID_HEADER};
pub use registry::{Handler, SubscriptionId};
pub use state::ConnectionState;
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{
    DecodedBody, EventTransport, TextStream, TransportRequest, TransportResponse, Utf8Decoder,
};

pub use eventfeed_streaming::EventRecord;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ClientError, ClientEvent, ClientOptions, ConnectOutcome, ConnectionState, EventName,
        EventRecord, EventSourceClient, EventTransport, SubscriptionId,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let options = ClientOptions::default();
        assert_eq!(options.method, "GET");
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
        assert_eq!(EventName::StateChange.as_str(), "statechange");
    }
}
