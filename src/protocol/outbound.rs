//! Client → server frames.
//!
//! # Format
//!
//! ```json
//! {"action": "auth", "token": "<token>"}
//! {"action": "vm.list", "params": ["--all"]}
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// ClientFrame
// ============================================================================

/// A frame sent by the client.
///
/// Ping and close are transport-level control frames and are not modelled
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ClientFrame {
    /// Authentication handshake. Always the first frame of a session.
    Auth {
        /// Always `"auth"`.
        action: &'static str,
        /// Token from the local config.
        token: String,
    },

    /// The command to execute.
    Do {
        /// `namespace.command`, e.g. `vm.list`.
        action: String,
        /// Positional arguments, forwarded verbatim.
        params: Vec<String>,
    },
}

impl ClientFrame {
    /// Action name reserved for the auth frame.
    pub const AUTH_ACTION: &'static str = "auth";

    /// Creates an auth frame.
    #[inline]
    #[must_use]
    pub fn auth(token: impl Into<String>) -> Self {
        Self::Auth {
            action: Self::AUTH_ACTION,
            token: token.into(),
        }
    }

    /// Creates a command frame.
    #[inline]
    #[must_use]
    pub fn command(action: impl Into<String>, params: &[String]) -> Self {
        Self::Do {
            action: action.into(),
            params: params.to_vec(),
        }
    }

    /// Returns the action carried by the frame.
    #[inline]
    #[must_use]
    pub fn action(&self) -> &str {
        match self {
            Self::Auth { action, .. } => action,
            Self::Do { action, .. } => action,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    #[test]
    fn test_auth_frame_shape() {
        let value = serde_json::to_value(ClientFrame::auth("secret")).expect("serialize");
        assert_eq!(value, json!({"action": "auth", "token": "secret"}));
    }

    #[test]
    fn test_command_frame_shape() {
        let params = vec!["web01".to_string(), "--force".to_string()];
        let value = serde_json::to_value(ClientFrame::command("vm.restart", &params))
            .expect("serialize");
        assert_eq!(
            value,
            json!({"action": "vm.restart", "params": ["web01", "--force"]})
        );
    }

    #[test]
    fn test_command_without_params_sends_empty_array() {
        let value: Value =
            serde_json::to_value(ClientFrame::command("vm.list", &[])).expect("serialize");
        assert_eq!(value["params"], json!([]));
    }

    #[test]
    fn test_action_accessor() {
        assert_eq!(ClientFrame::auth("t").action(), "auth");
        assert_eq!(ClientFrame::command("db.dump", &[]).action(), "db.dump");
    }
}
