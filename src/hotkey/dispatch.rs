//! Chord dispatch
//!
//! A single entry point receives every key-down the hook reports, resolves
//! it against the chord table and runs the matching action against the
//! current binding store. Runs on the hook thread, so actions stay short:
//! one clipboard write plus in-memory state changes.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use crate::app::AppContext;
use crate::events::OverlayEvent;
use crate::settings::SlotId;

use super::keys::{ChordId, KeyEvent};

/// What the hook should do with a key event after dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled; do not forward to the focused application
    Consume,
    /// Not ours; deliver normally
    PassThrough,
}

/// Routes matched chords to the overlay and clipboard
pub struct Dispatcher {
    context: AppContext,
}

impl Dispatcher {
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    /// Handle one raw key-down event
    pub fn dispatch(&self, event: &KeyEvent) -> Disposition {
        let Some(chord) = ChordId::match_event(event) else {
            return Disposition::PassThrough;
        };

        // A panic must not unwind into the platform event loop
        if panic::catch_unwind(AssertUnwindSafe(|| self.handle(chord))).is_err() {
            error!(%chord, "hotkey handler panicked");
        }

        Disposition::Consume
    }

    /// Run the action for a matched chord
    pub fn handle(&self, chord: ChordId) {
        match chord {
            ChordId::Toggle => {
                info!("toggle hotkey triggered");
                self.context.overlay.toggle();
            }
            ChordId::QuickCopy(slot) => self.quick_copy(slot),
        }
    }

    fn quick_copy(&self, slot: SlotId) {
        match self.context.bindings.text(slot) {
            Some(text) => {
                info!(%slot, "quick copy triggered");
                if let Err(e) = self.context.clipboard.write(&text) {
                    warn!(%slot, error = %e, "quick copy did not reach the clipboard");
                }
                self.flash(slot);
            }
            None => {
                debug!(%slot, "quick copy on unbound slot");
            }
        }

        self.context.overlay.hide();
    }

    fn flash(&self, slot: SlotId) {
        if self
            .context
            .event_tx
            .send(OverlayEvent::KeyFlashed { key: slot })
            .is_err()
        {
            debug!(%slot, "no overlay subscribed for flash");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::clipboard::testing::RecordingClipboard;
    use crate::clipboard::ClipboardGateway;
    use crate::hotkey::keys::{Key, ModifierState};
    use crate::overlay::testing::RecordingHost;
    use crate::overlay::DEFAULT_DEBOUNCE;
    use crate::settings::persistence::PersistenceSink;
    use crate::settings::{BindingStore, KeyBindings, Settings};

    struct NullSink;

    impl PersistenceSink for NullSink {
        fn submit(&self, _settings: Settings) {}
    }

    struct Fixture {
        dispatcher: Dispatcher,
        context: AppContext,
        clipboard: Arc<RecordingClipboard>,
        host: Arc<RecordingHost>,
        events: broadcast::Receiver<OverlayEvent>,
    }

    fn fixture_with(clipboard: RecordingClipboard) -> Fixture {
        let clipboard = Arc::new(clipboard);
        let host = Arc::new(RecordingHost::default());
        let (event_tx, events) = broadcast::channel(16);
        let bindings = Arc::new(BindingStore::new(Arc::new(NullSink)));
        bindings.replace(KeyBindings::default().with(slot(5), "hello@example.com"));

        let context = AppContext::new(
            bindings,
            ClipboardGateway::new(clipboard.clone()),
            host.clone(),
            DEFAULT_DEBOUNCE,
            event_tx,
        );

        Fixture {
            dispatcher: Dispatcher::new(context.clone()),
            context,
            clipboard,
            host,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingClipboard::default())
    }

    fn slot(digit: u8) -> SlotId {
        SlotId::new(digit).unwrap()
    }

    fn quick_copy(digit: u8) -> KeyEvent {
        KeyEvent {
            modifiers: ModifierState::COMMAND_SHIFT,
            key: Key::Digit(digit),
        }
    }

    #[test]
    fn test_bound_quick_copy() {
        let mut f = fixture();
        f.context.overlay.show();

        let disposition = f.dispatcher.dispatch(&quick_copy(5));

        assert_eq!(disposition, Disposition::Consume);
        assert_eq!(*f.clipboard.writes.lock(), vec!["hello@example.com".to_string()]);
        assert_eq!(f.events.try_recv().unwrap(), OverlayEvent::KeyFlashed { key: slot(5) });
        assert!(!f.context.overlay.is_visible());
        assert_eq!(f.host.count("hide"), 1);
    }

    #[test]
    fn test_bound_quick_copy_while_hidden() {
        let mut f = fixture();

        f.dispatcher.dispatch(&quick_copy(5));

        assert_eq!(f.clipboard.writes.lock().len(), 1);
        assert_eq!(f.events.try_recv().unwrap(), OverlayEvent::KeyFlashed { key: slot(5) });
        assert_eq!(f.host.count("hide"), 0);
    }

    #[test]
    fn test_unbound_quick_copy() {
        let mut f = fixture();
        f.context.overlay.show();

        let disposition = f.dispatcher.dispatch(&quick_copy(3));

        assert_eq!(disposition, Disposition::Consume);
        assert!(f.clipboard.writes.lock().is_empty());
        assert!(f.events.try_recv().is_err());
        assert!(!f.context.overlay.is_visible());
    }

    #[test]
    fn test_clipboard_failure_still_flashes() {
        let mut f = fixture_with(RecordingClipboard {
            fail: true,
            ..Default::default()
        });

        let disposition = f.dispatcher.dispatch(&quick_copy(5));

        assert_eq!(disposition, Disposition::Consume);
        assert_eq!(f.events.try_recv().unwrap(), OverlayEvent::KeyFlashed { key: slot(5) });
    }

    #[test]
    fn test_bindings_read_at_dispatch_time() {
        let f = fixture();
        f.context
            .bindings
            .replace(KeyBindings::default().with(slot(5), "updated"));

        f.dispatcher.dispatch(&quick_copy(5));

        assert_eq!(*f.clipboard.writes.lock(), vec!["updated".to_string()]);
    }

    #[test]
    fn test_toggle_chord() {
        let f = fixture();
        let toggle = KeyEvent {
            modifiers: ModifierState::CONTROL_SHIFT,
            key: Key::Space,
        };

        assert_eq!(f.dispatcher.dispatch(&toggle), Disposition::Consume);
        assert!(f.context.overlay.is_visible());

        // Bounce from the same physical press
        assert_eq!(f.dispatcher.dispatch(&toggle), Disposition::Consume);
        assert!(f.context.overlay.is_visible());
        assert_eq!(f.host.count("reveal"), 1);
    }

    #[test]
    fn test_other_keys_pass_through() {
        let mut f = fixture();
        let plain_five = KeyEvent {
            modifiers: ModifierState::default(),
            key: Key::Digit(5),
        };

        assert_eq!(f.dispatcher.dispatch(&plain_five), Disposition::PassThrough);
        assert!(f.clipboard.writes.lock().is_empty());
        assert!(f.events.try_recv().is_err());
    }
}
