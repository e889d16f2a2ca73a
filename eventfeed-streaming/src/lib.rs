//! # eventfeed-streaming
//!
//! Frame parsing for eventfeed.
//!
//! This crate turns decoded `text/event-stream` text, delivered in
//! fragments with arbitrary split points, into discrete [`EventRecord`]s.
//!
//! ## Core Concepts
//!
//! - **[`EventRecord`]**: One parsed record (`id`, `event`, `data`, `retry`)
//! - **[`FrameParser`]**: Incremental parser carrying partial lines across fragments
//! - **[`FrameStream`]**: Async adapter from a text stream to a record stream
//! - **[`frames`]**: Lazy iterator over already-available fragments
//!
//! ## Example
//!
//! ```ignore
//! use eventfeed_streaming::FrameParser;
//!
//! let mut parser = FrameParser::new();
//! let records = parser.feed_str("event: tick\ndata: {\"n\": 1}\n\n")?;
//!
//! for record in records {
//!     println!("{:?}: {}", record.event, record.data);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod record;
pub mod sse;

// Re-exports
pub use error::{StreamError, StreamResult};
pub use record::EventRecord;
pub use sse::{frames, FrameParser, FrameStream, Frames};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{frames, EventRecord, FrameParser, FrameStream, StreamError, StreamResult};
}
