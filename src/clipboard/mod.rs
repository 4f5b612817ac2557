//! Plain-text clipboard gateway
//!
//! Isolates the rest of the daemon from the platform clipboard API.

use std::io;
use std::sync::mpsc;
use std::thread;

use parking_lot::Mutex;
use tracing::debug;

/// Errors that can occur writing to the clipboard
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("refusing to copy empty text")]
    EmptyInput,

    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write clipboard: {0}")]
    Write(String),
}

/// Platform clipboard access
pub trait ClipboardBackend: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// A platform clipboard handle that stays open between writes
pub trait ClipboardHandle {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

impl ClipboardHandle for arboard::Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        arboard::Clipboard::set_text(self, text).map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

type WriteJob = (String, mpsc::Sender<Result<(), ClipboardError>>);

/// The system clipboard, owned by a dedicated `clipboard-owner` thread
///
/// On X11 and Wayland the owning process serves the selection for as long
/// as its handle lives, so the handle is opened once and kept until the
/// daemon exits. Pinning it to one thread also keeps platform handles that
/// are not `Send` off the hotkey and IPC threads.
pub struct SystemClipboard {
    jobs: Mutex<mpsc::Sender<WriteJob>>,
}

impl SystemClipboard {
    /// Start the owner thread over the `arboard` clipboard
    pub fn spawn() -> io::Result<Self> {
        Self::with_opener(|| {
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))
        })
    }

    /// Start the owner thread; `open` runs on first write and again after an open failure
    pub fn with_opener<H, F>(mut open: F) -> io::Result<Self>
    where
        H: ClipboardHandle + 'static,
        F: FnMut() -> Result<H, ClipboardError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<WriteJob>();

        thread::Builder::new()
            .name("clipboard-owner".to_string())
            .spawn(move || {
                let mut handle: Option<H> = None;

                while let Ok((text, reply)) = rx.recv() {
                    let result = match handle.as_mut() {
                        Some(h) => h.set_text(&text),
                        None => open().and_then(|mut h| {
                            let written = h.set_text(&text);
                            handle = Some(h);
                            written
                        }),
                    };
                    // The caller may have given up waiting
                    let _ = reply.send(result);
                }
                debug!("clipboard owner stopped");
            })?;

        Ok(Self {
            jobs: Mutex::new(tx),
        })
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.jobs
            .lock()
            .send((text.to_string(), reply_tx))
            .map_err(|_| ClipboardError::Unavailable("clipboard owner thread is gone".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| ClipboardError::Unavailable("clipboard owner thread is gone".to_string()))?
    }
}

/// Writes text to the clipboard after checking it is non-empty
pub struct ClipboardGateway {
    backend: Box<dyn ClipboardBackend>,
}

impl ClipboardGateway {
    pub fn new(backend: impl ClipboardBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Gateway over the system clipboard
    pub fn system() -> io::Result<Self> {
        Ok(Self::new(SystemClipboard::spawn()?))
    }

    /// Replace the clipboard contents with `text`
    pub fn write(&self, text: &str) -> Result<(), ClipboardError> {
        if text.is_empty() {
            return Err(ClipboardError::EmptyInput);
        }

        self.backend.set_text(text)?;
        debug!(chars = text.chars().count(), "text copied to clipboard");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::testing::RecordingClipboard;
    use super::*;

    #[test]
    fn test_empty_input_never_reaches_backend() {
        let backend = Arc::new(RecordingClipboard::default());
        let gateway = ClipboardGateway::new(backend.clone());

        assert!(matches!(gateway.write(""), Err(ClipboardError::EmptyInput)));
        assert!(backend.writes.lock().is_empty());
    }

    #[test]
    fn test_write_is_verbatim() {
        let backend = Arc::new(RecordingClipboard::default());
        let gateway = ClipboardGateway::new(backend.clone());

        gateway.write("  spaced\ttext\n").unwrap();
        assert_eq!(*backend.writes.lock(), vec!["  spaced\ttext\n".to_string()]);
    }

    /// Counts opens and drops of the underlying handle
    #[derive(Default)]
    struct HandleStats {
        opens: AtomicUsize,
        drops: AtomicUsize,
        writes: parking_lot::Mutex<Vec<String>>,
    }

    struct CountingHandle(Arc<HandleStats>);

    impl ClipboardHandle for CountingHandle {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.writes.lock().push(text.to_string());
            Ok(())
        }
    }

    impl Drop for CountingHandle {
        fn drop(&mut self) {
            self.0.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_system_handle_stays_open_across_writes() {
        let stats = Arc::new(HandleStats::default());
        let opener_stats = Arc::clone(&stats);
        let clipboard = SystemClipboard::with_opener(move || {
            opener_stats.opens.fetch_add(1, Ordering::SeqCst);
            Ok(CountingHandle(Arc::clone(&opener_stats)))
        })
        .unwrap();

        ClipboardBackend::set_text(&clipboard, "first").unwrap();
        ClipboardBackend::set_text(&clipboard, "second").unwrap();

        assert_eq!(stats.opens.load(Ordering::SeqCst), 1);
        assert_eq!(stats.drops.load(Ordering::SeqCst), 0);
        assert_eq!(*stats.writes.lock(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_system_open_failure_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let stats = Arc::new(HandleStats::default());
        let opener_stats = Arc::clone(&stats);
        let clipboard = SystemClipboard::with_opener(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ClipboardError::Unavailable("no display".to_string()));
            }
            Ok(CountingHandle(Arc::clone(&opener_stats)))
        })
        .unwrap();

        assert!(matches!(
            ClipboardBackend::set_text(&clipboard, "text"),
            Err(ClipboardError::Unavailable(_))
        ));
        ClipboardBackend::set_text(&clipboard, "text").unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(*stats.writes.lock(), vec!["text".to_string()]);
    }

    #[test]
    fn test_backend_failure_is_reported() {
        let backend = Arc::new(RecordingClipboard {
            fail: true,
            ..Default::default()
        });
        let gateway = ClipboardGateway::new(backend);

        assert!(matches!(gateway.write("text"), Err(ClipboardError::Write(_))));
    }
}
