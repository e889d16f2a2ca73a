//! Request configuration for a client.

use serde::Serialize;
use std::collections::BTreeMap;

/// Header sent to request resumption after the given record ID.
pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

/// Options applied to every request a client issues.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// HTTP method.
    pub method: String,
    /// Extra headers, names lowercased. These override the defaults.
    pub headers: BTreeMap<String, String>,
    /// Request body for non-GET methods.
    pub body: Option<String>,
    /// Initial Last-Event-ID, for resuming a stream seen by another client.
    pub last_event_id: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
            last_event_id: None,
        }
    }
}

impl ClientOptions {
    /// Create default options (GET, no extra headers).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set a raw request body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize a JSON request body and set its content type.
    pub fn json_body<T: Serialize + ?Sized>(self, body: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_string(body)?;
        Ok(self.header("content-type", "application/json").body(body))
    }

    /// Seed the Last-Event-ID sent on the first connect.
    pub fn last_event_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// Headers for one request: defaults, then user headers, then the
    /// resumption header.
    pub(crate) fn request_headers(
        &self,
        last_event_id: Option<&str>,
    ) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("accept".to_string(), "text/event-stream".to_string());
        headers.insert("cache-control".to_string(), "no-cache".to_string());
        headers.extend(self.headers.clone());
        if let Some(id) = last_event_id {
            headers.insert(LAST_EVENT_ID_HEADER.to_string(), id.to_string());
        }
        headers
    }

    /// Method to send, uppercased.
    pub(crate) fn request_method(&self) -> String {
        self.method.to_ascii_uppercase()
    }

    /// Body to send; GET requests never carry one.
    pub(crate) fn request_body(&self) -> Option<String> {
        if self.method.eq_ignore_ascii_case("GET") {
            None
        } else {
            self.body.clone()
        }
    }
}
