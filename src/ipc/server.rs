//! Unix domain socket server for IPC
//!
//! Provides request-response access to the bindings, clipboard and overlay
//! visibility, and pushes overlay events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::AppContext;
use crate::clipboard::ClipboardError;
use crate::events::OverlayEvent;
use crate::hotkey::HotkeyListener;

use super::protocol::{DaemonStatus, Request, Response, MAX_MESSAGE_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    context: AppContext,
    hotkeys: Arc<HotkeyListener>,
    start_time: Instant,
}

/// Aborts a spawned task when the owning connection goes away
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, context: AppContext, hotkeys: Arc<HotkeyListener>) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            state: Arc::new(ServerState {
                context,
                hotkeys,
                start_time: Instant::now(),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, state: Arc<ServerState>) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let (out_tx, out_rx) = mpsc::channel::<Response>(64);
        let writer_task = tokio::spawn(Self::write_loop(writer, out_rx));
        let mut forwarder: Option<AbortOnDrop> = None;

        let result = loop {
            let body = match read_frame(&mut reader).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    debug!("client disconnected");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };

            let request: Request = match serde_json::from_slice(&body) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "malformed request");
                    if out_tx.send(Response::error("bad_request", e.to_string())).await.is_err() {
                        break Ok(());
                    }
                    continue;
                }
            };

            debug!(?request, "received request");

            // Subscribe before answering so no event slips between the two
            let event_rx = match (&request, &forwarder) {
                (Request::Subscribe, None) => Some(state.context.event_tx.subscribe()),
                _ => None,
            };

            let response = Self::process_request(request, &state).await;
            if out_tx.send(response).await.is_err() {
                break Ok(());
            }

            if let Some(event_rx) = event_rx {
                debug!("client subscribed to notifications");
                forwarder = Some(AbortOnDrop(tokio::spawn(Self::forward_events(
                    event_rx,
                    out_tx.clone(),
                ))));
            }
        };

        drop(forwarder);
        drop(out_tx);
        match writer_task.await {
            Ok(Err(e)) => warn!(?e, "client writer error"),
            Err(e) => warn!(?e, "client writer task failed"),
            Ok(Ok(())) => {}
        }

        result
    }

    async fn write_loop(mut writer: OwnedWriteHalf, mut out_rx: mpsc::Receiver<Response>) -> Result<()> {
        while let Some(response) = out_rx.recv().await {
            write_frame(&mut writer, &response).await?;
        }
        Ok(())
    }

    async fn forward_events(
        mut event_rx: broadcast::Receiver<OverlayEvent>,
        out_tx: mpsc::Sender<Response>,
    ) {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    if out_tx.send(Response::Event { event }).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "overlay event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Process a request and return a response
    async fn process_request(request: Request, state: &ServerState) -> Response {
        let context = &state.context;

        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(DaemonStatus {
                visible: context.overlay.is_visible(),
                hotkeys_registered: state.hotkeys.is_running(),
                bound_slots: context.bindings.get().bound_count(),
                uptime_secs: state.start_time.elapsed().as_secs(),
                ..DaemonStatus::default()
            }),

            Request::GetSettings => Response::Settings {
                settings: context.bindings.settings(),
            },

            Request::SaveSettings { settings } => {
                context.bindings.replace_settings(settings);
                Response::Saved
            }

            Request::GetBindings => Response::Bindings {
                bindings: context.bindings.get(),
            },

            Request::ReplaceBindings { bindings } => {
                context.bindings.replace(bindings);
                Response::Saved
            }

            Request::Copy { text } => {
                let clipboard = Arc::clone(&context.clipboard);
                match tokio::task::spawn_blocking(move || clipboard.write(&text)).await {
                    Ok(Ok(())) => Response::Copied,
                    Ok(Err(e @ ClipboardError::EmptyInput)) => {
                        Response::error("empty_input", e.to_string())
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "clipboard write via IPC failed");
                        Response::error("clipboard", e.to_string())
                    }
                    Err(e) => Response::error("internal", e.to_string()),
                }
            }

            Request::Show => {
                context.overlay.show();
                Response::Visibility {
                    visible: context.overlay.is_visible(),
                }
            }

            Request::Hide => {
                context.overlay.hide();
                Response::Visibility {
                    visible: context.overlay.is_visible(),
                }
            }

            Request::Toggle => {
                context.overlay.toggle();
                Response::Visibility {
                    visible: context.overlay.is_visible(),
                }
            }

            Request::Subscribe => Response::Subscribed,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Read one length-prefixed frame; `None` on a clean disconnect
pub(super) async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];

    // Read message length (4-byte little-endian)
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        bail!("message too large ({len} bytes)");
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Send a length-prefixed JSON message
pub(super) async fn write_frame<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = u32::try_from(msg_bytes.len())
        .context("message too large")?
        .to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}
