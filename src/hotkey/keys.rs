//! Modifier state, keys and the fixed chord table
//!
//! Two chord families are registered: Control+Shift+Space toggles the
//! overlay and Command+Shift+1..9 quick-copies a slot. On non-Apple
//! keyboards Command is the Super/Windows key.

use std::fmt;

use crate::settings::SlotId;

/// Modifier flag masks from macOS CGEventFlags
#[cfg(target_os = "macos")]
pub mod flags {
    use core_graphics::event::CGEventFlags;

    /// Control key modifier flag
    pub const CONTROL: CGEventFlags = CGEventFlags::CGEventFlagControl;
    /// Option/Alt key modifier flag
    pub const OPTION: CGEventFlags = CGEventFlags::CGEventFlagAlternate;
    /// Command key modifier flag
    pub const COMMAND: CGEventFlags = CGEventFlags::CGEventFlagCommand;
    /// Shift key modifier flag
    pub const SHIFT: CGEventFlags = CGEventFlags::CGEventFlagShift;
}

/// Tracks which modifier keys are held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command/Super key is held
    pub command: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    /// Control+Shift
    pub const CONTROL_SHIFT: Self = Self {
        control: true,
        option: false,
        command: false,
        shift: true,
    };

    /// Command+Shift
    pub const COMMAND_SHIFT: Self = Self {
        control: false,
        option: false,
        command: true,
        shift: true,
    };

    /// Create a new ModifierState from CGEventFlags
    #[cfg(target_os = "macos")]
    pub fn from_flags(event_flags: core_graphics::event::CGEventFlags) -> Self {
        Self {
            control: event_flags.contains(flags::CONTROL),
            option: event_flags.contains(flags::OPTION),
            command: event_flags.contains(flags::COMMAND),
            shift: event_flags.contains(flags::SHIFT),
        }
    }
}

impl fmt::Display for ModifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.control, "Control"),
            (self.option, "Option"),
            (self.command, "Command"),
            (self.shift, "Shift"),
        ];
        for (_, name) in names.iter().filter(|(held, _)| *held) {
            write!(f, "{}+", name)?;
        }
        Ok(())
    }
}

/// Primary (non-modifier) key of a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    /// Top-row digit `1`..`9`
    Digit(u8),
    /// Any key the daemon has no chord for, by platform keycode
    Other(u16),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Space => write!(f, "Space"),
            Key::Digit(d) => write!(f, "{}", d),
            Key::Other(code) => write!(f, "<{}>", code),
        }
    }
}

/// A raw key-down event as seen by the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub modifiers: ModifierState,
    pub key: Key,
}

/// Modifier set plus primary key, matched as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyChord {
    pub modifiers: ModifierState,
    pub key: Key,
}

impl HotkeyChord {
    /// Modifiers must match exactly; extra held modifiers do not match
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key && self.modifiers == event.modifiers
    }

    /// The key-down event this chord stands for
    pub fn as_event(&self) -> KeyEvent {
        KeyEvent {
            modifiers: self.modifiers,
            key: self.key,
        }
    }
}

impl fmt::Display for HotkeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.modifiers, self.key)
    }
}

/// Which registered chord fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordId {
    Toggle,
    QuickCopy(SlotId),
}

impl ChordId {
    pub fn chord(self) -> HotkeyChord {
        match self {
            ChordId::Toggle => HotkeyChord {
                modifiers: ModifierState::CONTROL_SHIFT,
                key: Key::Space,
            },
            ChordId::QuickCopy(slot) => HotkeyChord {
                modifiers: ModifierState::COMMAND_SHIFT,
                key: Key::Digit(slot.digit()),
            },
        }
    }

    /// Resolve a key-down event to the chord it triggers, if any
    pub fn match_event(event: &KeyEvent) -> Option<ChordId> {
        registered_chords()
            .find(|(_, chord)| chord.matches(event))
            .map(|(id, _)| id)
    }
}

impl fmt::Display for ChordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordId::Toggle => write!(f, "toggle"),
            ChordId::QuickCopy(slot) => write!(f, "quick-copy {}", slot),
        }
    }
}

/// Number of chords the listener registers
pub const CHORD_COUNT: usize = 1 + SlotId::COUNT;

/// The toggle chord followed by the nine quick-copy chords
pub fn registered_chords() -> impl Iterator<Item = (ChordId, HotkeyChord)> {
    std::iter::once(ChordId::Toggle)
        .chain(SlotId::all().map(ChordId::QuickCopy))
        .map(|id| (id, id.chord()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn event(modifiers: ModifierState, key: Key) -> KeyEvent {
        KeyEvent { modifiers, key }
    }

    #[test]
    fn test_modifier_display() {
        assert_eq!(ModifierState::default().to_string(), "");
        assert_eq!(ModifierState::CONTROL_SHIFT.to_string(), "Control+Shift+");
    }

    #[test]
    fn test_chord_table() {
        let chords: Vec<_> = registered_chords().collect();
        assert_eq!(chords.len(), CHORD_COUNT);
        assert_eq!(chords[0].0, ChordId::Toggle);

        let distinct: HashSet<_> = chords.iter().map(|(_, chord)| *chord).collect();
        assert_eq!(distinct.len(), CHORD_COUNT);
    }

    #[test]
    fn test_toggle_match() {
        let e = event(ModifierState::CONTROL_SHIFT, Key::Space);
        assert_eq!(ChordId::match_event(&e), Some(ChordId::Toggle));
    }

    #[test]
    fn test_quick_copy_match() {
        let e = event(ModifierState::COMMAND_SHIFT, Key::Digit(5));
        assert_eq!(
            ChordId::match_event(&e),
            Some(ChordId::QuickCopy(SlotId::new(5).unwrap()))
        );
    }

    #[test]
    fn test_modifiers_match_exactly() {
        let extra_option = ModifierState {
            option: true,
            ..ModifierState::COMMAND_SHIFT
        };
        assert_eq!(ChordId::match_event(&event(extra_option, Key::Digit(1))), None);

        let no_shift = ModifierState {
            shift: false,
            ..ModifierState::CONTROL_SHIFT
        };
        assert_eq!(ChordId::match_event(&event(no_shift, Key::Space)), None);
    }

    #[test]
    fn test_unrelated_keys_do_not_match() {
        assert_eq!(ChordId::match_event(&event(ModifierState::COMMAND_SHIFT, Key::Digit(0))), None);
        assert_eq!(ChordId::match_event(&event(ModifierState::default(), Key::Digit(3))), None);
        assert_eq!(ChordId::match_event(&event(ModifierState::CONTROL_SHIFT, Key::Other(12))), None);
    }

    #[test]
    fn test_chord_display() {
        assert_eq!(ChordId::Toggle.chord().to_string(), "Control+Shift+Space");
        assert_eq!(
            ChordId::QuickCopy(SlotId::new(9).unwrap()).chord().to_string(),
            "Command+Shift+9"
        );
    }
}
