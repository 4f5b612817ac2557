//! Overlay module: visibility state and the host window seam
//!
//! The overlay panel itself is rendered by a separate process; this side
//! only decides when it should be shown and tells the host.

mod host;
mod machine;

#[cfg(test)]
pub(crate) use host::testing;
pub use host::{BroadcastHost, HostWindow};
pub use machine::{VisibilityStateMachine, DEFAULT_DEBOUNCE};
