//! Nine-slot key binding table
//!
//! Slots are addressed by the digits `1` through `9`. A slot whose text is
//! empty is unbound.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a quick-copy slot, `1` through `9`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotId(u8);

impl SlotId {
    /// Number of slots
    pub const COUNT: usize = 9;

    /// Create a slot id from its digit
    pub fn new(digit: u8) -> Option<Self> {
        (1..=9).contains(&digit).then_some(Self(digit))
    }

    /// All slot ids in ascending order
    pub fn all() -> impl Iterator<Item = SlotId> {
        (1..=9).map(SlotId)
    }

    /// The digit this slot is bound to
    pub fn digit(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A string that is not one of the digits `1`..`9`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid slot id {0:?}, expected a digit from 1 to 9")]
pub struct InvalidSlot(pub String);

impl FromStr for SlotId {
    type Err = InvalidSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [digit @ b'1'..=b'9'] => Ok(Self(digit - b'0')),
            _ => Err(InvalidSlot(s.to_string())),
        }
    }
}

impl TryFrom<String> for SlotId {
    type Error = InvalidSlot;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotId> for String {
    fn from(slot: SlotId) -> Self {
        slot.to_string()
    }
}

/// Text bound to each of the nine slots
///
/// Serialized as a JSON object keyed by slot digit. Missing slots read as
/// unbound and unknown keys are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct KeyBindings {
    slots: [String; SlotId::COUNT],
}

impl KeyBindings {
    /// Bound text for a slot, `None` when the slot is unbound
    pub fn get(&self, slot: SlotId) -> Option<&str> {
        let text = self.slots[slot.index()].as_str();
        (!text.is_empty()).then_some(text)
    }

    /// Bind (or with an empty string, unbind) a slot
    pub fn set(&mut self, slot: SlotId, text: impl Into<String>) {
        self.slots[slot.index()] = text.into();
    }

    /// Builder form of [`KeyBindings::set`]
    pub fn with(mut self, slot: SlotId, text: impl Into<String>) -> Self {
        self.set(slot, text);
        self
    }

    /// Iterate over all nine slots, bound or not
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str)> {
        SlotId::all().map(move |slot| (slot, self.slots[slot.index()].as_str()))
    }

    /// Number of slots carrying text
    pub fn bound_count(&self) -> usize {
        self.iter().filter(|(_, text)| !text.is_empty()).count()
    }
}

impl From<BTreeMap<String, String>> for KeyBindings {
    fn from(map: BTreeMap<String, String>) -> Self {
        let mut bindings = Self::default();
        for (key, text) in map {
            if let Ok(slot) = key.parse::<SlotId>() {
                bindings.set(slot, text);
            }
        }
        bindings
    }
}

impl From<KeyBindings> for BTreeMap<String, String> {
    fn from(bindings: KeyBindings) -> Self {
        SlotId::all()
            .zip(bindings.slots)
            .map(|(slot, text)| (slot.to_string(), text))
            .collect()
    }
}
