//! copyman-daemon: background daemon for number-key text snippets
//!
//! This daemon provides:
//! - Global hotkeys: Control+Shift+Space toggles the overlay, and
//!   Command+Shift+1..9 copies the text bound to that digit
//! - A debounced visibility state machine for the overlay panel
//! - IPC server the overlay UI uses to read/save bindings, copy text
//!   and receive window commands and key flashes
//!
//! The overlay panel itself is a separate process.

mod app;
mod clipboard;
mod config;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod overlay;
mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::AppContext;
use crate::clipboard::ClipboardGateway;
use crate::config::Config;
use crate::events::OverlayEvent;
use crate::hotkey::{Dispatcher, HotkeyListener};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::overlay::BroadcastHost;
use crate::settings::persistence::{self, JsonFileRepository, SettingsRepository, SettingsWriter};
use crate::settings::BindingStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "copyman-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        settings = ?config.settings_path,
        socket = ?config.socket_path,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::install().context("failed to install signal handlers")?;

    // A second launch brings up the overlay of the running instance
    if ipc::client::show_running_instance(&config.socket_path).await {
        info!("copyman-daemon already running, asked it to show the overlay");
        return Ok(());
    }

    // Settings: load once, then persist in the background
    let repository: Arc<dyn SettingsRepository> =
        Arc::new(JsonFileRepository::new(&config.settings_path));
    let loaded = persistence::load_or_default(repository.as_ref());
    let writer = Arc::new(SettingsWriter::spawn(Arc::clone(&repository))?);
    let bindings = Arc::new(BindingStore::with_settings(loaded, writer.clone()));

    // Overlay events: window commands and key flashes for the overlay UI
    let (event_tx, _event_rx) = broadcast::channel::<OverlayEvent>(64);

    let clipboard = ClipboardGateway::system().context("failed to start clipboard owner")?;

    let context = AppContext::new(
        bindings,
        clipboard,
        Arc::new(BroadcastHost::new(event_tx.clone())),
        config.toggle_debounce,
        event_tx,
    );

    // Start the hotkey listener (runs on dedicated thread)
    let listener = Arc::new(HotkeyListener::new(Dispatcher::new(context.clone())));
    let listener_thread = match listener.spawn() {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "failed to start hotkey listener");
            warn!("continuing without hotkey support");
            None
        }
    };

    let server = Server::new(&config.socket_path, context.clone(), Arc::clone(&listener))?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        reason = shutdown.recv() => {
            info!(%reason, "shutdown signal received");
        }
    }

    // Cleanup: release the input hook before anything else goes away
    info!("shutting down...");

    let stopping = Arc::clone(&listener);
    let stopped = tokio::task::spawn_blocking(move || {
        stopping.stop();
        if let Some(handle) = listener_thread {
            if handle.join().is_err() {
                error!("hotkey listener thread panicked");
            }
        }
    })
    .await;
    if let Err(e) = stopped {
        error!(?e, "failed to stop hotkey listener");
    }

    server.shutdown().await;

    let final_settings = context.bindings.settings();
    let flushed = tokio::task::spawn_blocking(move || {
        writer.close();
        if let Err(e) = repository.save(&final_settings) {
            error!(error = %e, "failed to save settings on shutdown");
        }
    })
    .await;
    if let Err(e) = flushed {
        error!(?e, "failed to flush settings");
    }

    info!("copyman-daemon stopped");

    Ok(())
}
