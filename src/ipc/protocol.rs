//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::OverlayEvent;
use crate::settings::{KeyBindings, Settings};

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from the overlay UI to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Read the full settings record
    GetSettings,

    /// Replace the full settings record
    SaveSettings { settings: Settings },

    /// Read the nine-slot mapping
    GetBindings,

    /// Replace the nine-slot mapping
    ReplaceBindings { bindings: KeyBindings },

    /// Put text on the clipboard
    Copy { text: String },

    /// Show the overlay
    Show,

    /// Hide the overlay
    Hide,

    /// Toggle the overlay (debounced)
    Toggle,

    /// Subscribe to overlay event notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Current settings
    Settings { settings: Settings },

    /// Current bindings
    Bindings { bindings: KeyBindings },

    /// Settings or bindings stored
    Saved,

    /// Text placed on the clipboard
    Copied,

    /// Overlay visibility after a show/hide/toggle request
    Visibility { visible: bool },

    /// Subscription confirmed
    Subscribed,

    /// Pushed to subscribed clients
    Event { event: OverlayEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Whether the overlay is shown
    pub visible: bool,

    /// Whether the global hotkeys are registered
    pub hotkeys_registered: bool,

    /// Number of slots with text
    pub bound_slots: usize,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            visible: false,
            hotkeys_registered: false,
            bound_slots: 0,
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SlotId;

    #[test]
    fn test_request_serialization() {
        let req = Request::Copy {
            text: "hello@example.com".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"copy\""));
        assert!(json.contains("hello@example.com"));
    }

    #[test]
    fn test_save_settings_request() {
        let json = r#"{"type":"save_settings","settings":{"theme":"dark","keyBindings":{"2":"two"}}}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req {
            Request::SaveSettings { settings } => {
                assert_eq!(settings.key_bindings.get(SlotId::new(2).unwrap()), Some("two"));
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
    }

    #[test]
    fn test_event_frame() {
        let resp = Response::Event {
            event: OverlayEvent::KeyFlashed {
                key: SlotId::new(1).unwrap(),
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"type":"event","event":{"type":"key_flashed","key":"1"}}"#
        );
    }
}
