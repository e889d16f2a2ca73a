//! Typed client events.
//!
//! Reserved lifecycle events form a closed set; records carrying an
//! `event:` field are additionally fanned out under
//! [`EventName::Custom`].

use crate::error::ClientError;
use crate::state::ConnectionState;
use eventfeed_streaming::EventRecord;
use std::collections::HashMap;
use std::fmt;

/// Name under which handlers subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
    /// Response accepted.
    Open,
    /// Any record.
    Message,
    /// Connection closed.
    Close,
    /// Connection failed.
    Error,
    /// Connection state changed.
    StateChange,
    /// Record whose `event:` field equals the name.
    Custom(String),
}

impl EventName {
    /// Create a custom event name.
    ///
    /// Custom names never alias the reserved ones, even when the text is
    /// `"message"` or `"error"`.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Message => "message",
            Self::Close => "close",
            Self::Error => "error",
            Self::StateChange => "statechange",
            Self::Custom(name) => name,
        }
    }

    /// Check if this is one of the reserved lifecycle names.
    pub fn is_reserved(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of the accepted response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: HashMap<String, String>,
}

impl ResponseMeta {
    /// Create metadata with only a status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The response content type.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Check if the status is a success status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Payload delivered to subscribers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Response accepted.
    Open(ResponseMeta),
    /// A parsed record.
    Message(EventRecord),
    /// Connection closed.
    Close,
    /// Connection failed.
    Error(ClientError),
    /// New connection state.
    StateChange(ConnectionState),
    /// A record fanned out under its own event type.
    Custom(EventRecord),
}

impl ClientEvent {
    /// The name this event is delivered under.
    pub fn name(&self) -> EventName {
        match self {
            Self::Open(_) => EventName::Open,
            Self::Message(_) => EventName::Message,
            Self::Close => EventName::Close,
            Self::Error(_) => EventName::Error,
            Self::StateChange(_) => EventName::StateChange,
            Self::Custom(record) => {
                EventName::Custom(record.event.clone().unwrap_or_default())
            }
        }
    }

    /// The record carried by `Message` and `Custom` events.
    pub fn record(&self) -> Option<&EventRecord> {
        match self {
            Self::Message(record) | Self::Custom(record) => Some(record),
            _ => None,
        }
    }

    /// The failure carried by an `Error` event.
    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    /// The state carried by a `StateChange` event.
    pub fn state(&self) -> Option<ConnectionState> {
        match self {
            Self::StateChange(state) => Some(*state),
            _ => None,
        }
    }
}
