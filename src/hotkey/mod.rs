//! Hotkey module for global keyboard event listening
//!
//! Registers the toggle chord and the nine quick-copy chords with the
//! platform hook and dispatches matched key-downs.

mod dispatch;
mod keys;
mod listener;
mod platform;

#[cfg(test)]
pub(crate) use listener::testing;

pub use dispatch::Dispatcher;
pub use listener::HotkeyListener;
