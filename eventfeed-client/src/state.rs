//! Connection lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of an [`EventSourceClient`](crate::EventSourceClient) connection.
///
/// ```text
/// Idle --connect--> Connecting --opened--> Open --ended--> Closed
///                   Connecting --failed--> Errored
///                                 Open --failed--> Errored
/// any --disconnect--> Closed
/// Closed | Errored --connect--> Connecting
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Idle,
    /// Request issued, waiting for the response.
    Connecting,
    /// Response accepted, records are flowing.
    Open,
    /// Stream ended or was disconnected.
    Closed,
    /// Stream failed.
    Errored,
}

impl ConnectionState {
    /// Check if a connection is in flight or established.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Check if the state only changes on a new `connect()`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    /// Lowercase name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
    }

    #[test]
    fn test_predicates() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Open.is_active());
        assert!(!ConnectionState::Idle.is_active());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Errored.is_terminal());
        assert!(!ConnectionState::Open.is_terminal());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ConnectionState::Errored).unwrap();
        assert_eq!(json, "\"errored\"");
        assert_eq!(ConnectionState::Open.to_string(), "open");
    }
}
