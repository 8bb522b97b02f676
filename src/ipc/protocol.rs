//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::state::Mode;

/// Requests from a toolbar or script to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Flip the variometer on or off
    Toggle,

    /// Turn the variometer on or off explicitly
    SetEnabled { enabled: bool },

    /// Ping to check connectivity
    Ping,
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(VarioStatus),

    /// Toggle state after a change
    Enabled { enabled: bool },

    /// Pong response to ping
    Pong,

    /// Error response
    Error { code: String, message: String },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarioStatus {
    /// Daemon version
    pub version: String,

    /// Whether feedback is switched on
    pub enabled: bool,

    /// Current feedback mode
    pub mode: Mode,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for VarioStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            enabled: false,
            mode: Mode::default(),
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetEnabled { enabled: true };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_enabled"));
        assert!(json.contains("true"));
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request = serde_json::from_str(r#"{"type":"toggle"}"#).unwrap();
        assert!(matches!(req, Request::Toggle));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(VarioStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains("\"mode\":\"idle\""));
    }
}
