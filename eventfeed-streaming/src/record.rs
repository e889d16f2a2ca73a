//! The parsed unit of an event stream.

use crate::error::StreamResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One blank-line-terminated record of a `text/event-stream` body.
///
/// `data` holds every `data:` line of the record joined with `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Record identifier (if specified).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event type (if specified).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Record payload.
    #[serde(default)]
    pub data: String,
    /// Reconnection hint in milliseconds (if specified).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
}

impl EventRecord {
    /// Create a record with just data.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set the event type.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the record ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the retry hint.
    #[must_use]
    pub fn with_retry(mut self, retry_ms: u64) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    /// The event type, treating an empty `event:` value as absent.
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_deref().filter(|e| !e.is_empty())
    }

    /// The record ID, treating an empty `id:` value as absent.
    pub fn non_empty_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Parse the data as JSON.
    pub fn parse_data<T: DeserializeOwned>(&self) -> StreamResult<T> {
        Ok(serde_json::from_str(&self.data)?)
    }

    /// Serialize the record back to wire format, blank line included.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            let _ = writeln!(out, "id: {id}");
        }
        if let Some(event) = &self.event {
            let _ = writeln!(out, "event: {event}");
        }
        if let Some(retry) = self.retry {
            let _ = writeln!(out, "retry: {retry}");
        }
        for line in self.data.split('\n') {
            let _ = writeln!(out, "data: {line}");
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let record = EventRecord::data("hello")
            .with_event("greeting")
            .with_id("7")
            .with_retry(1500);

        assert_eq!(record.data, "hello");
        assert_eq!(record.event_type(), Some("greeting"));
        assert_eq!(record.non_empty_id(), Some("7"));
        assert_eq!(record.retry, Some(1500));
    }

    #[test]
    fn test_empty_fields_are_absent() {
        let record = EventRecord::data("x").with_event("").with_id("");
        assert_eq!(record.event_type(), None);
        assert_eq!(record.non_empty_id(), None);
    }

    #[test]
    fn test_parse_data() {
        let record = EventRecord::data(r#"{"index": 3}"#);
        let parsed: serde_json::Value = record.parse_data().unwrap();
        assert_eq!(parsed["index"], 3);
    }

    #[test]
    fn test_parse_data_rejects_plain_text() {
        let record = EventRecord::data("not json");
        let err = record.parse_data::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, crate::StreamError::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_to_wire() {
        let record = EventRecord::data("foo\nbar").with_event("end").with_id("1");
        assert_eq!(
            record.to_wire(),
            "id: 1\nevent: end\ndata: foo\ndata: bar\n\n"
        );
    }

    #[test]
    fn test_serde_skips_absent_fields() {
        let json = serde_json::to_value(EventRecord::data("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "data": "hi" }));
    }
}
