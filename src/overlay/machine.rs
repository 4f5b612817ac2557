//! Overlay visibility state machine
//!
//! Two states, Hidden and Shown. `show`/`hide` are idempotent; `toggle` is
//! debounced because global key hooks can report one physical press as
//! several events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::host::HostWindow;

/// Minimum spacing between accepted toggles
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Whether the overlay is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Shown,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Hidden => write!(f, "Hidden"),
            Visibility::Shown => write!(f, "Shown"),
        }
    }
}

struct Inner {
    visibility: Visibility,
    /// Time of the last accepted toggle
    last_toggle: Option<Instant>,
}

/// Owns the overlay visibility and drives the host window
pub struct VisibilityStateMachine {
    inner: Mutex<Inner>,
    host: Arc<dyn HostWindow>,
    debounce: Duration,
}

impl VisibilityStateMachine {
    pub fn new(host: Arc<dyn HostWindow>, debounce: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                visibility: Visibility::Hidden,
                last_toggle: None,
            }),
            host,
            debounce,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.inner.lock().visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility() == Visibility::Shown
    }

    /// Show the overlay. Returns whether a transition happened.
    pub fn show(&self) -> bool {
        let mut inner = self.inner.lock();
        self.show_locked(&mut inner)
    }

    /// Hide the overlay. Returns whether a transition happened.
    pub fn hide(&self) -> bool {
        let mut inner = self.inner.lock();
        self.hide_locked(&mut inner)
    }

    /// Flip visibility unless the previous toggle was too recent
    pub fn toggle(&self) -> bool {
        self.toggle_at(Instant::now())
    }

    pub(crate) fn toggle_at(&self, now: Instant) -> bool {
        let mut inner = self.inner.lock();

        if let Some(last) = inner.last_toggle {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.debounce {
                debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "toggle ignored - too rapid"
                );
                return false;
            }
        }

        inner.last_toggle = Some(now);

        match inner.visibility {
            Visibility::Shown => self.hide_locked(&mut inner),
            Visibility::Hidden => self.show_locked(&mut inner),
        }
    }

    fn show_locked(&self, inner: &mut Inner) -> bool {
        if inner.visibility == Visibility::Shown {
            return false;
        }

        self.host.reveal();
        self.host.bring_to_front();
        self.host.center();
        self.transition_to(inner, Visibility::Shown);
        true
    }

    fn hide_locked(&self, inner: &mut Inner) -> bool {
        if inner.visibility == Visibility::Hidden {
            return false;
        }

        self.host.hide();
        self.transition_to(inner, Visibility::Hidden);
        true
    }

    fn transition_to(&self, inner: &mut Inner, new_state: Visibility) {
        info!(from = %inner.visibility, to = %new_state, "overlay transition");
        inner.visibility = new_state;
    }
}
