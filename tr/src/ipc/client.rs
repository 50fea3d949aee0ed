//! IPC client for the CLI and control surfaces

use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tracing::debug;
use uuid::Uuid;

use super::listener::{read_line, send_request_line};
use super::messages::{Command, CommandResult, Request, Response};

/// One-connection client. A plain CLI command opens a connection, sends a
/// single request, and drops it; a control surface keeps the connection
/// alive for its whole lifetime so the daemon can observe the close.
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one command on a fresh connection and await its response.
    pub async fn request(&self, command: Command) -> Result<CommandResult> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .context("Failed to connect to daemon socket")?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let id = Uuid::now_v7().to_string();
        debug!(%id, "DaemonClient::request: sending");
        send_request_line(
            &mut write_half,
            &Request {
                id: id.clone(),
                command,
            },
        )
        .await?;

        let line = read_line(&mut reader)
            .await?
            .ok_or_else(|| eyre!("Daemon closed connection without responding"))?;
        let response: Response = serde_json::from_str(&line).context("Failed to parse daemon response")?;
        if response.id != id {
            return Err(eyre!(
                "Response id mismatch: sent {}, got {}",
                id,
                response.id
            ));
        }
        Ok(response.result)
    }
}
