//! Global hotkey hook using macOS CGEventTap
//!
//! The tap is inserted at the head of the session event stream in active
//! (filtering) mode. The callback runs the dispatcher synchronously on the
//! listener thread and drops consumed events.

use std::cell::Cell;
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
    CGEventTapProxy, CGEventType, EventField,
};
use tracing::{debug, info, warn};

use crate::hotkey::dispatch::Disposition;
use crate::hotkey::keys::{ChordId, HotkeyChord, Key, KeyEvent, ModifierState};
use crate::hotkey::listener::{HookBackend, HotkeyError, StopToken};

/// How long one run loop slice lasts before the stop token is checked
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Key-down tap filtered against the registered chords
pub struct EventTapBackend {
    chords: Vec<HotkeyChord>,
}

impl EventTapBackend {
    pub fn new() -> Result<Self, HotkeyError> {
        Ok(Self { chords: Vec::new() })
    }
}

/// Map an ANSI virtual keycode to a chord key
fn key_from_keycode(keycode: i64) -> Key {
    match keycode {
        49 => Key::Space,
        18 => Key::Digit(1),
        19 => Key::Digit(2),
        20 => Key::Digit(3),
        21 => Key::Digit(4),
        23 => Key::Digit(5),
        22 => Key::Digit(6),
        26 => Key::Digit(7),
        28 => Key::Digit(8),
        25 => Key::Digit(9),
        other => Key::Other(other as u16),
    }
}

/// What the tap callback does with an event of a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TapAction {
    /// Match against the chords and dispatch
    Dispatch,
    /// The system switched the tap off; turn it back on
    Reenable,
    /// Not ours
    Forward,
}

fn tap_action(event_type: CGEventType) -> TapAction {
    match event_type {
        CGEventType::KeyDown => TapAction::Dispatch,
        CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
            TapAction::Reenable
        }
        _ => TapAction::Forward,
    }
}

impl HookBackend for EventTapBackend {
    fn register(&mut self, _id: ChordId, chord: HotkeyChord) -> Result<(), HotkeyError> {
        self.chords.push(chord);
        Ok(())
    }

    fn run(
        &mut self,
        handler: &dyn Fn(&KeyEvent) -> Disposition,
        ready: &dyn Fn(),
        stop: &StopToken,
    ) -> Result<(), HotkeyError> {
        let chords = &self.chords;
        let tap_disabled = Cell::new(false);
        let disabled = &tap_disabled;

        // CGEventTap callback - must be fast and non-blocking
        let callback = move |_proxy: CGEventTapProxy,
                             event_type: CGEventType,
                             event: &CGEvent|
              -> Option<CGEvent> {
            match tap_action(event_type) {
                TapAction::Dispatch => {
                    let key_event = KeyEvent {
                        modifiers: ModifierState::from_flags(event.get_flags()),
                        key: key_from_keycode(
                            event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE),
                        ),
                    };

                    if !chords.iter().any(|chord| chord.matches(&key_event)) {
                        return Some(event.clone());
                    }

                    match handler(&key_event) {
                        Disposition::Consume => None,
                        Disposition::PassThrough => Some(event.clone()),
                    }
                }
                TapAction::Reenable => {
                    warn!("event tap disabled by the system, re-enabling");
                    disabled.set(true);
                    Some(event.clone())
                }
                TapAction::Forward => Some(event.clone()),
            }
        };

        let tap = CGEventTap::new(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::Default,
            vec![CGEventType::KeyDown],
            callback,
        )
        .map_err(|_| {
            HotkeyError::HookRegistration(
                "failed to create event tap - is Accessibility permission granted?".to_string(),
            )
        })?;

        let run_loop_source = tap.mach_port.create_runloop_source(0).map_err(|_| {
            HotkeyError::HookRegistration("failed to create run loop source".to_string())
        })?;
        let run_loop = CFRunLoop::get_current();

        unsafe {
            run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
        }
        tap.enable();

        info!(chords = chords.len(), "event tap created and enabled");

        ready();

        while !stop.is_stopped() {
            unsafe {
                CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, POLL_INTERVAL, true);
            }

            // A disabled tap delivers nothing until switched back on
            if tap_disabled.replace(false) {
                tap.enable();
                debug!("event tap re-enabled");
            }
        }

        unsafe {
            run_loop.remove_source(&run_loop_source, kCFRunLoopCommonModes);
        }
        drop(tap);

        info!("event tap removed");
        Ok(())
    }

    fn release(&mut self) {
        self.chords.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycodes() {
        assert_eq!(key_from_keycode(49), Key::Space);
        assert_eq!(key_from_keycode(23), Key::Digit(5));
        assert_eq!(key_from_keycode(25), Key::Digit(9));
        assert_eq!(key_from_keycode(0), Key::Other(0));
    }

    #[test]
    fn test_tap_actions() {
        assert_eq!(tap_action(CGEventType::KeyDown), TapAction::Dispatch);
        assert_eq!(tap_action(CGEventType::TapDisabledByTimeout), TapAction::Reenable);
        assert_eq!(tap_action(CGEventType::TapDisabledByUserInput), TapAction::Reenable);
        assert_eq!(tap_action(CGEventType::KeyUp), TapAction::Forward);
    }
}
