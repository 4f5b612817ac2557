//! Native hook backends
//!
//! macOS uses an active CGEventTap so the daemon decides per event whether
//! to swallow it. Elsewhere the chords are registered as OS hotkeys, which
//! grabs exactly those combinations and leaves every other key alone.

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod registered;

#[cfg(target_os = "macos")]
use macos::EventTapBackend as NativeBackend;
#[cfg(not(target_os = "macos"))]
use registered::RegisteredHotkeyBackend as NativeBackend;

use super::listener::{HookBackend, HotkeyError};

/// Open the platform hook
pub fn open() -> Result<Box<dyn HookBackend>, HotkeyError> {
    Ok(Box::new(NativeBackend::new()?))
}
