//! In-memory binding store shared by the hotkey thread and the IPC server

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::bindings::{KeyBindings, SlotId};
use super::persistence::{PersistenceSink, Settings};

/// Holds the current settings record
///
/// Reads clone a snapshot. Replacements swap the whole record under the
/// write lock, then hand the snapshot to the persistence sink.
pub struct BindingStore {
    settings: RwLock<Option<Settings>>,
    sink: Arc<dyn PersistenceSink>,
}

impl BindingStore {
    /// Create a store that initializes to all-unbound defaults on first access
    pub fn new(sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            settings: RwLock::new(None),
            sink,
        }
    }

    /// Create a store seeded with previously loaded settings
    pub fn with_settings(settings: Settings, sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
            sink,
        }
    }

    /// Current nine-slot mapping
    pub fn get(&self) -> KeyBindings {
        self.settings().key_bindings
    }

    /// Current full settings record
    pub fn settings(&self) -> Settings {
        if let Some(settings) = self.settings.read().as_ref() {
            return settings.clone();
        }
        self.settings
            .write()
            .get_or_insert_with(Settings::default)
            .clone()
    }

    /// Bound text for a slot, `None` when unbound
    pub fn text(&self, slot: SlotId) -> Option<String> {
        if let Some(settings) = self.settings.read().as_ref() {
            return settings.key_bindings.get(slot).map(str::to_owned);
        }
        None
    }

    /// Swap the whole mapping and schedule a flush
    pub fn replace(&self, bindings: KeyBindings) {
        let mut guard = self.settings.write();
        let settings = guard.get_or_insert_with(Settings::default);
        settings.key_bindings = bindings;
        self.publish(settings.clone());
    }

    /// Swap the whole settings record and schedule a flush
    pub fn replace_settings(&self, settings: Settings) {
        let mut guard = self.settings.write();
        *guard = Some(settings.clone());
        self.publish(settings);
    }

    /// Runs under the write guard so snapshots reach the sink in swap order
    fn publish(&self, snapshot: Settings) {
        info!(
            bound = snapshot.key_bindings.bound_count(),
            theme = ?snapshot.theme,
            "settings replaced"
        );
        self.sink.submit(snapshot);
    }
}
