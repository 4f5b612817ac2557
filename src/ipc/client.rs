//! Minimal IPC client used on startup to detect a running daemon

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::protocol::{Request, Response};
use super::server::{read_frame, write_frame};

/// How long a running daemon gets to answer
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Send one request and wait for its response
pub async fn request<S>(stream: &mut S, request: &Request) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_frame(stream, request).await?;
    let body = read_frame(stream)
        .await?
        .context("daemon closed the connection")?;
    serde_json::from_slice(&body).context("failed to parse response")
}

/// Ask an already running daemon to show its overlay
///
/// Returns `false` when nothing is listening on the socket.
pub async fn show_running_instance(socket_path: &Path) -> bool {
    let attempt = async {
        let mut stream = UnixStream::connect(socket_path).await?;
        request(&mut stream, &Request::Show).await
    };

    match tokio::time::timeout(REQUEST_TIMEOUT, attempt).await {
        Ok(Ok(Response::Visibility { .. })) => true,
        Ok(Ok(other)) => {
            warn!(?other, "unexpected response from running daemon");
            true
        }
        Ok(Err(e)) => {
            debug!(error = %e, "no running daemon");
            false
        }
        Err(_) => {
            warn!("running daemon did not answer in time");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_daemon_listening() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");

        assert!(!tokio_test::block_on(show_running_instance(&socket_path)));
    }

    #[test]
    fn test_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        std::fs::write(&socket_path, b"").unwrap();

        assert!(!tokio_test::block_on(show_running_instance(&socket_path)));
    }
}
