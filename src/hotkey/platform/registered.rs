//! Global hotkey hook using OS hotkey registration (`global-hotkey`)
//!
//! Registered combinations are grabbed by the OS and never reach the
//! focused application; every other key passes through untouched.

use std::collections::HashMap;
use std::time::Duration;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tracing::{debug, info, warn};

use crate::hotkey::dispatch::Disposition;
use crate::hotkey::keys::{ChordId, HotkeyChord, Key, KeyEvent};
use crate::hotkey::listener::{HookBackend, HotkeyError, StopToken};

/// How long to wait for a hotkey event before checking the stop token
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chords registered with the OS hotkey manager
pub struct RegisteredHotkeyBackend {
    manager: GlobalHotKeyManager,
    /// Maps hotkey ID -> chord
    registered: HashMap<u32, (ChordId, HotkeyChord)>,
    hotkeys: Vec<HotKey>,
}

impl RegisteredHotkeyBackend {
    pub fn new() -> Result<Self, HotkeyError> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| HotkeyError::HookRegistration(e.to_string()))?;

        Ok(Self {
            manager,
            registered: HashMap::new(),
            hotkeys: Vec::new(),
        })
    }
}

fn to_hotkey(chord: &HotkeyChord) -> Result<HotKey, HotkeyError> {
    let mut modifiers = Modifiers::empty();
    if chord.modifiers.control {
        modifiers |= Modifiers::CONTROL;
    }
    if chord.modifiers.option {
        modifiers |= Modifiers::ALT;
    }
    if chord.modifiers.command {
        modifiers |= Modifiers::SUPER;
    }
    if chord.modifiers.shift {
        modifiers |= Modifiers::SHIFT;
    }

    let code = match chord.key {
        Key::Space => Code::Space,
        Key::Digit(1) => Code::Digit1,
        Key::Digit(2) => Code::Digit2,
        Key::Digit(3) => Code::Digit3,
        Key::Digit(4) => Code::Digit4,
        Key::Digit(5) => Code::Digit5,
        Key::Digit(6) => Code::Digit6,
        Key::Digit(7) => Code::Digit7,
        Key::Digit(8) => Code::Digit8,
        Key::Digit(9) => Code::Digit9,
        other => {
            return Err(HotkeyError::HookRegistration(format!(
                "no OS key code for {}",
                other
            )))
        }
    };

    Ok(HotKey::new(Some(modifiers), code))
}

impl HookBackend for RegisteredHotkeyBackend {
    fn register(&mut self, id: ChordId, chord: HotkeyChord) -> Result<(), HotkeyError> {
        let hotkey = to_hotkey(&chord)?;
        let hotkey_id = hotkey.id();

        self.manager
            .register(hotkey)
            .map_err(|e| HotkeyError::HookRegistration(format!("{}: {}", chord, e)))?;

        self.registered.insert(hotkey_id, (id, chord));
        self.hotkeys.push(hotkey);
        Ok(())
    }

    fn run(
        &mut self,
        handler: &dyn Fn(&KeyEvent) -> Disposition,
        ready: &dyn Fn(),
        stop: &StopToken,
    ) -> Result<(), HotkeyError> {
        let receiver = GlobalHotKeyEvent::receiver();
        info!(chords = self.registered.len(), "listening for registered hotkeys");
        ready();

        while !stop.is_stopped() {
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    // Only respond to key PRESS, not release
                    if event.state != HotKeyState::Pressed {
                        continue;
                    }

                    match self.registered.get(&event.id) {
                        Some((id, chord)) => {
                            // The OS grab already swallowed the key, whatever the disposition
                            let disposition = handler(&chord.as_event());
                            debug!(%id, ?disposition, "registered hotkey pressed");
                        }
                        None => debug!(id = event.id, "event for unknown hotkey"),
                    }
                }
                Err(e) if e.is_timeout() => continue,
                Err(_) => {
                    return Err(HotkeyError::EventLoop(
                        "hotkey event channel disconnected".to_string(),
                    ))
                }
            }
        }

        Ok(())
    }

    fn release(&mut self) {
        if self.hotkeys.is_empty() {
            return;
        }

        if let Err(e) = self.manager.unregister_all(&self.hotkeys) {
            warn!(error = %e, "failed to unregister hotkeys");
        }
        self.hotkeys.clear();
        self.registered.clear();
    }
}
