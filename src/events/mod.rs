//! Events pushed to the overlay UI
//!
//! Window commands are issued by the visibility state machine; key flashes
//! by the hotkey dispatcher after a quick copy.

use serde::{Deserialize, Serialize};

use crate::settings::SlotId;

/// Notifications for the external overlay process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayEvent {
    /// Make the overlay window visible
    Reveal,

    /// Raise the overlay above other windows
    BringToFront,

    /// Center the overlay on the active screen
    Center,

    /// Hide the overlay window
    Hide,

    /// A quick copy fired for this slot
    KeyFlashed {
        /// Slot whose text was copied
        key: SlotId,
    },
}

impl std::fmt::Display for OverlayEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayEvent::Reveal => write!(f, "REVEAL"),
            OverlayEvent::BringToFront => write!(f, "BRING_TO_FRONT"),
            OverlayEvent::Center => write!(f, "CENTER"),
            OverlayEvent::Hide => write!(f, "HIDE"),
            OverlayEvent::KeyFlashed { key } => write!(f, "KEY_FLASHED ({})", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = OverlayEvent::KeyFlashed {
            key: SlotId::new(5).unwrap(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"key_flashed","key":"5"}"#);
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"bring_to_front"}"#;
        let event: OverlayEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, OverlayEvent::BringToFront));
    }

    #[test]
    fn test_invalid_slot_rejected() {
        let json = r#"{"type":"key_flashed","key":"0"}"#;
        assert!(serde_json::from_str::<OverlayEvent>(json).is_err());
    }
}
