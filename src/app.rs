//! Shared daemon context
//!
//! The hotkey dispatcher and the IPC server drive the same binding store,
//! clipboard gateway and overlay state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::clipboard::ClipboardGateway;
use crate::events::OverlayEvent;
use crate::overlay::{HostWindow, VisibilityStateMachine};
use crate::settings::BindingStore;

#[derive(Clone)]
pub struct AppContext {
    pub bindings: Arc<BindingStore>,
    pub clipboard: Arc<ClipboardGateway>,
    pub overlay: Arc<VisibilityStateMachine>,
    pub event_tx: broadcast::Sender<OverlayEvent>,
}

impl AppContext {
    pub fn new(
        bindings: Arc<BindingStore>,
        clipboard: ClipboardGateway,
        host: Arc<dyn HostWindow>,
        toggle_debounce: Duration,
        event_tx: broadcast::Sender<OverlayEvent>,
    ) -> Self {
        Self {
            bindings,
            clipboard: Arc::new(clipboard),
            overlay: Arc::new(VisibilityStateMachine::new(host, toggle_debounce)),
            event_tx,
        }
    }
}
