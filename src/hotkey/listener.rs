//! Global hotkey listener
//!
//! Owns the platform hook for its lifetime. `start()` registers the chord
//! table and blocks the calling thread in the hook's event loop until
//! `stop()` is called from another thread. `stop()` returns only after the
//! loop has exited and the hook has been released.
//!
//! The lifecycle reads `Running` only once the backend reports its hook is
//! live, so a hook that fails to come up never shows as running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use super::dispatch::{Dispatcher, Disposition};
use super::keys::{self, ChordId, HotkeyChord, KeyEvent, CHORD_COUNT};
use super::platform;

/// Listener lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Stopped,
    Starting,
    Running,
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("failed to register global hotkeys: {0} - check Accessibility/input permissions")]
    HookRegistration(String),

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("hotkey event loop failed: {0}")]
    EventLoop(String),
}

/// Cooperative cancellation flag checked by the hook event loop
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Platform hook handle
///
/// Created, driven and released on the thread that calls `start()`.
pub trait HookBackend {
    /// Register one chord with the platform
    fn register(&mut self, id: ChordId, chord: HotkeyChord) -> Result<(), HotkeyError>;

    /// Deliver key-down events to `handler` until `stop` is set
    ///
    /// `ready` is called once the hook is live and delivering events.
    fn run(
        &mut self,
        handler: &dyn Fn(&KeyEvent) -> Disposition,
        ready: &dyn Fn(),
        stop: &StopToken,
    ) -> Result<(), HotkeyError>;

    /// Unregister every chord and release the platform handle
    fn release(&mut self);
}

/// Opens a fresh platform hook
pub type BackendFactory =
    Box<dyn Fn() -> Result<Box<dyn HookBackend>, HotkeyError> + Send + Sync>;

/// Global hotkey listener feeding key events to the dispatcher
pub struct HotkeyListener {
    dispatcher: Arc<Dispatcher>,
    open_backend: BackendFactory,
    lifecycle: Mutex<Lifecycle>,
    lifecycle_changed: Condvar,
    stop_token: StopToken,
}

impl HotkeyListener {
    /// Create a listener over the native platform hook
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_backend(dispatcher, Box::new(platform::open))
    }

    /// Create a listener over a custom hook backend
    pub fn with_backend(dispatcher: Dispatcher, open_backend: BackendFactory) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            open_backend,
            lifecycle: Mutex::new(Lifecycle::Stopped),
            lifecycle_changed: Condvar::new(),
            stop_token: StopToken::default(),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Run the listener on a dedicated thread
    ///
    /// The lifecycle leaves `Stopped` before this returns, so a `stop()`
    /// issued right after always waits for the thread. Returns `None` when
    /// the listener is already active.
    pub fn spawn(self: &Arc<Self>) -> Result<Option<thread::JoinHandle<()>>, HotkeyError> {
        if !self.begin_start() {
            return Ok(None);
        }

        let listener = Arc::clone(self);
        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");

                if let Err(e) = listener.finish_start() {
                    error!(error = %e, "hotkey listener error");
                }

                info!("hotkey listener thread stopped");
            })
            .map(Some)
            .map_err(|e| {
                self.set_lifecycle(Lifecycle::Stopped);
                HotkeyError::ThreadSpawn(e.to_string())
            })
    }

    /// Register the chords and block in the hook event loop
    ///
    /// Returns immediately when the listener is already starting or running.
    pub fn start(&self) -> Result<(), HotkeyError> {
        if !self.begin_start() {
            return Ok(());
        }
        self.finish_start()
    }

    /// Stop the event loop and wait until the hook is released
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle == Lifecycle::Stopped {
            debug!("hotkey listener not running");
            return;
        }

        self.stop_token.stop();
        while *lifecycle != Lifecycle::Stopped {
            self.lifecycle_changed.wait(&mut lifecycle);
        }

        info!("hotkey listener stopped");
    }

    fn begin_start(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle != Lifecycle::Stopped {
            debug!(state = ?*lifecycle, "hotkey listener already active");
            return false;
        }
        *lifecycle = Lifecycle::Starting;
        self.stop_token.reset();
        true
    }

    fn finish_start(&self) -> Result<(), HotkeyError> {
        info!("starting hotkey listener...");
        let result = self.run_until_stopped();
        self.set_lifecycle(Lifecycle::Stopped);
        result
    }

    fn run_until_stopped(&self) -> Result<(), HotkeyError> {
        let mut backend = (self.open_backend)()?;

        for (id, chord) in keys::registered_chords() {
            if let Err(e) = backend.register(id, chord) {
                error!(%chord, error = %e, "failed to register hotkey");
                backend.release();
                return Err(e);
            }
            debug!(%id, %chord, "hotkey registered");
        }

        info!(chords = CHORD_COUNT, "hotkeys registered");

        let handler = |event: &KeyEvent| self.dispatcher.dispatch(event);
        let ready = || {
            self.set_lifecycle(Lifecycle::Running);
            info!("hotkey listener running - Control+Shift+Space to toggle, Command+Shift+1-9 for quick copy");
        };
        let result = backend.run(&handler, &ready, &self.stop_token);

        backend.release();
        result
    }

    fn set_lifecycle(&self, state: Lifecycle) {
        *self.lifecycle.lock() = state;
        self.lifecycle_changed.notify_all();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    /// Counts registrations and replays scripted events
    #[derive(Default)]
    pub struct ProbeState {
        pub registrations: AtomicUsize,
        pub releases: AtomicUsize,
        pub script: Mutex<Vec<KeyEvent>>,
        pub dispositions: Mutex<Vec<Disposition>>,
        pub fail_on_register: Option<usize>,
        /// Keeps `run` from reporting ready until cleared
        pub hold_ready: AtomicBool,
        /// Makes `run` fail before the hook comes up
        pub fail_in_run: bool,
    }

    pub struct ProbeBackend {
        state: Arc<ProbeState>,
        registered: usize,
    }

    impl HookBackend for ProbeBackend {
        fn register(&mut self, _id: ChordId, _chord: HotkeyChord) -> Result<(), HotkeyError> {
            if self.state.fail_on_register == Some(self.registered) {
                return Err(HotkeyError::HookRegistration("grab denied".to_string()));
            }
            self.registered += 1;
            self.state.registrations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn run(
            &mut self,
            handler: &dyn Fn(&KeyEvent) -> Disposition,
            ready: &dyn Fn(),
            stop: &StopToken,
        ) -> Result<(), HotkeyError> {
            if self.state.fail_in_run {
                return Err(HotkeyError::HookRegistration("tap refused".to_string()));
            }
            while self.state.hold_ready.load(Ordering::SeqCst) && !stop.is_stopped() {
                thread::sleep(Duration::from_millis(5));
            }
            ready();

            let script = std::mem::take(&mut *self.state.script.lock());
            for event in script {
                let disposition = handler(&event);
                self.state.dispositions.lock().push(disposition);
            }
            while !stop.is_stopped() {
                thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        }

        fn release(&mut self) {
            self.state.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn probe_factory(state: Arc<ProbeState>) -> BackendFactory {
        Box::new(move || {
            Ok(Box::new(ProbeBackend {
                state: Arc::clone(&state),
                registered: 0,
            }) as Box<dyn HookBackend>)
        })
    }
}
