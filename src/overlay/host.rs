//! Host window primitives driven by the visibility state machine

use tokio::sync::broadcast;
use tracing::trace;

use crate::events::OverlayEvent;

/// Window operations the overlay host exposes
pub trait HostWindow: Send + Sync {
    fn reveal(&self);
    fn hide(&self);
    fn bring_to_front(&self);
    fn center(&self);
}

/// Host window living in the overlay UI process
///
/// Each primitive is published as an [`OverlayEvent`]; the IPC server
/// forwards them to subscribed clients.
pub struct BroadcastHost {
    event_tx: broadcast::Sender<OverlayEvent>,
}

impl BroadcastHost {
    pub fn new(event_tx: broadcast::Sender<OverlayEvent>) -> Self {
        Self { event_tx }
    }

    fn publish(&self, event: OverlayEvent) {
        // No subscribers just means no overlay is attached yet
        if self.event_tx.send(event.clone()).is_err() {
            trace!(%event, "no overlay subscribed");
        }
    }
}

impl HostWindow for BroadcastHost {
    fn reveal(&self) {
        self.publish(OverlayEvent::Reveal);
    }

    fn hide(&self) {
        self.publish(OverlayEvent::Hide);
    }

    fn bring_to_front(&self) {
        self.publish(OverlayEvent::BringToFront);
    }

    fn center(&self) {
        self.publish(OverlayEvent::Center);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::HostWindow;

    /// Records every primitive call in order
    #[derive(Default)]
    pub struct RecordingHost {
        pub calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingHost {
        pub fn count(&self, call: &str) -> usize {
            self.calls.lock().iter().filter(|c| **c == call).count()
        }
    }

    impl HostWindow for RecordingHost {
        fn reveal(&self) {
            self.calls.lock().push("reveal");
        }

        fn hide(&self) {
            self.calls.lock().push("hide");
        }

        fn bring_to_front(&self) {
            self.calls.lock().push("bring_to_front");
        }

        fn center(&self) {
            self.calls.lock().push("center");
        }
    }
}
