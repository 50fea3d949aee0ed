//! Unix-socket listener plumbing
//!
//! Socket lifecycle helpers plus line framing shared by the daemon and
//! the client.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, warn};

use super::messages::{Request, Response};

/// Upper bound on one request line; a custom entry list fits comfortably.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Create and bind the daemon's listener, cleaning up a stale socket file
/// from a previous run.
pub fn create_listener(socket_path: &Path) -> Result<UnixListener> {
    debug!(path = %socket_path.display(), "create_listener: binding IPC socket");

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }
    if socket_path.exists() {
        debug!(path = %socket_path.display(), "create_listener: removing stale socket");
        std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
    }

    UnixListener::bind(socket_path).context("Failed to bind IPC socket")
}

/// Remove the socket file on shutdown.
pub fn cleanup_socket(socket_path: &PathBuf) {
    if socket_path.exists() {
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(path = %socket_path.display(), error = %e, "Failed to remove socket file");
        }
    }
}

/// Read one request line. `None` means the peer closed the connection.
pub async fn read_line<R>(reader: &mut BufReader<R>) -> Result<Option<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let bytes_read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read IPC message")?;

    if bytes_read == 0 {
        return Ok(None);
    }
    if bytes_read > MAX_MESSAGE_SIZE {
        return Err(eyre::eyre!("Message too large: {} bytes", bytes_read));
    }
    Ok(Some(line.trim().to_string()))
}

/// Send one response line.
pub async fn send_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response).context("Failed to serialize response")?;
    writer
        .write_all(json.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.write_all(b"\n").await.context("Failed to write newline")?;
    writer.flush().await.context("Failed to flush response")?;
    debug!(id = %response.id, ok = response.result.ok, "send_response: sent");
    Ok(())
}

/// Send one request line (client side).
pub async fn send_request_line<W>(writer: &mut W, request: &Request) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(request).context("Failed to serialize request")?;
    writer
        .write_all(json.as_bytes())
        .await
        .context("Failed to write request")?;
    writer.write_all(b"\n").await.context("Failed to write newline")?;
    writer.flush().await.context("Failed to flush request")?;
    Ok(())
}
