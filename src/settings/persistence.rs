//! Settings file persistence
//!
//! Settings live in a single pretty-printed JSON file. Saves from the
//! running daemon go through [`SettingsWriter`], a background thread that
//! flushes the newest snapshot and logs failures instead of returning them.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::bindings::KeyBindings;

/// Overlay colour scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// The persisted settings record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub key_bindings: KeyBindings,
}

/// Errors reading or writing the settings file
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Storage for the settings record
pub trait SettingsRepository: Send + Sync {
    fn load(&self) -> Result<Settings, PersistenceError>;
    fn save(&self, settings: &Settings) -> Result<(), PersistenceError>;
}

/// JSON file backed repository
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsRepository for JsonFileRepository {
    fn load(&self) -> Result<Settings, PersistenceError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_slice(&data).map_err(PersistenceError::Parse)
    }

    fn save(&self, settings: &Settings) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let data = serde_json::to_vec_pretty(settings).map_err(PersistenceError::Serialize)?;

        // Write-then-rename so a crash never leaves a truncated file behind
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "settings written");
        Ok(())
    }
}

/// Load settings, falling back to defaults on any failure
pub fn load_or_default(repository: &dyn SettingsRepository) -> Settings {
    match repository.load() {
        Ok(settings) => {
            info!(
                bound = settings.key_bindings.bound_count(),
                "settings loaded"
            );
            settings
        }
        Err(PersistenceError::NotFound(path)) => {
            info!(path = %path.display(), "no settings file yet, using defaults");
            Settings::default()
        }
        Err(e) => {
            warn!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        }
    }
}

/// Receives settings snapshots to persist without waiting on the result
pub trait PersistenceSink: Send + Sync {
    fn submit(&self, settings: Settings);
}

/// Background thread that writes submitted settings snapshots
pub struct SettingsWriter {
    tx: Mutex<Option<mpsc::Sender<Settings>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SettingsWriter {
    /// Spawn the writer thread
    pub fn spawn(repository: Arc<dyn SettingsRepository>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Settings>();

        let handle = thread::Builder::new()
            .name("settings-writer".to_string())
            .spawn(move || {
                while let Ok(mut settings) = rx.recv() {
                    // Only the newest snapshot matters
                    while let Ok(newer) = rx.try_recv() {
                        settings = newer;
                    }

                    if let Err(e) = repository.save(&settings) {
                        error!(error = %e, "failed to persist settings");
                    }
                }
                debug!("settings writer stopped");
            })?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Flush pending snapshots and stop the writer thread
    pub fn close(&self) {
        drop(self.tx.lock().take());

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("settings writer thread panicked");
            }
        }
    }
}

impl PersistenceSink for SettingsWriter {
    fn submit(&self, settings: Settings) {
        match self.tx.lock().as_ref() {
            Some(tx) => {
                if tx.send(settings).is_err() {
                    warn!("settings writer is gone, snapshot dropped");
                }
            }
            None => warn!("settings writer closed, snapshot dropped"),
        }
    }
}

impl Drop for SettingsWriter {
    fn drop(&mut self) {
        self.close();
    }
}
