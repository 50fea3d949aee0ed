//! Daemon wiring
//!
//! Accepts control-surface connections on the Unix socket and forwards
//! commands to the engine actor. Surface lifetime is tied to the
//! connection: a peer that sent `SurfaceOpen` and then vanishes counts as
//! a close, so suspension can never leak.

use std::path::PathBuf;

use eyre::{Context, Result};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tracing::{debug, info, warn};

use crate::ipc::listener::{cleanup_socket, create_listener, read_line, send_response};
use crate::ipc::messages::{Command, CommandResult, ErrorCode, Request, Response, classify_bad_request};
use crate::rotation::{EngineError, EngineHandle, StartOutcome};

pub struct Daemon {
    engine: EngineHandle,
    socket_path: PathBuf,
}

impl Daemon {
    pub fn new(engine: EngineHandle, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            socket_path: socket_path.into(),
        }
    }

    /// Bind the socket, run the boot-time restore, then serve until
    /// interrupted.
    pub async fn run(self) -> Result<()> {
        let listener = create_listener(&self.socket_path)?;
        self.engine
            .restore()
            .await
            .map_err(|e| eyre::eyre!("Boot restore failed: {e}"))?;
        info!(socket = %self.socket_path.display(), "daemon listening");

        let result = self.accept_loop(&listener).await;
        cleanup_socket(&self.socket_path);
        result
    }

    async fn accept_loop(&self, listener: &tokio::net::UnixListener) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = accepted.context("Failed to accept IPC connection")?;
                    debug!("accepted control connection");
                    tokio::spawn(handle_connection(stream, self.engine.clone()));
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                    let _ = self.engine.shutdown().await;
                    return Ok(());
                }
            }
        }
    }
}

/// Serve one connection until the peer goes away.
pub async fn handle_connection(stream: UnixStream, engine: EngineHandle) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut surface_open = false;

    loop {
        match read_line(&mut reader).await {
            Ok(Some(line)) => {
                if line.is_empty() {
                    continue;
                }
                let response = dispatch(&engine, &mut surface_open, &line).await;
                if let Err(e) = send_response(&mut write_half, &response).await {
                    warn!(error = %e, "could not send response, dropping connection");
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "connection read failed");
                break;
            }
        }
    }

    if surface_open {
        debug!("connection dropped with surface still open, treating as closed");
        let _ = engine.surface_closed().await;
    }
}

async fn dispatch(engine: &EngineHandle, surface_open: &mut bool, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            debug!(id = %request.id, "dispatch: command received");
            let result = execute(engine, surface_open, request.command).await;
            Response {
                id: request.id,
                result,
            }
        }
        Err(_) => {
            let (id, code) = classify_bad_request(line);
            debug!(%id, ?code, "dispatch: rejected request line");
            Response {
                id,
                result: CommandResult::error(code),
            }
        }
    }
}

async fn execute(engine: &EngineHandle, surface_open: &mut bool, command: Command) -> CommandResult {
    match command {
        Command::Start { options } => match engine.start(options).await {
            Ok(StartOutcome::Started) => CommandResult::ok(),
            Ok(StartOutcome::Deferred) => CommandResult::deferred(),
            Err(EngineError::InvalidInterval) => CommandResult::error(ErrorCode::InvalidInterval),
            Err(e) => {
                warn!(error = %e, "start command failed");
                CommandResult::error(ErrorCode::InternalError)
            }
        },
        Command::Stop => match engine.stop().await {
            Ok(()) => CommandResult::ok(),
            Err(e) => {
                warn!(error = %e, "stop command failed");
                CommandResult::error(ErrorCode::InternalError)
            }
        },
        Command::Status => match engine.status().await {
            Ok(status) => CommandResult::status(status.running, status.interval_sec, status.targets),
            Err(e) => {
                warn!(error = %e, "status command failed");
                CommandResult::error(ErrorCode::InternalError)
            }
        },
        Command::Ping => CommandResult::pong(),
        Command::SurfaceOpen => {
            if !*surface_open {
                *surface_open = true;
                if engine.surface_opened().await.is_err() {
                    return CommandResult::error(ErrorCode::InternalError);
                }
            }
            CommandResult::ok()
        }
        Command::SurfaceClose => {
            if *surface_open {
                *surface_open = false;
                if engine.surface_closed().await.is_err() {
                    return CommandResult::error(ErrorCode::InternalError);
                }
            }
            CommandResult::ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::io::AsyncWriteExt;

    use crate::browser::SimBrowser;
    use crate::ipc::DaemonClient;
    use crate::ipc::listener::send_request_line;
    use crate::rotation::{RotationEngine, StartOptions};
    use crate::store::MemoryStore;

    async fn serve_once(sim: &SimBrowser, store: &MemoryStore) -> (EngineHandle, DaemonClient) {
        let engine = RotationEngine::spawn(Arc::new(sim.clone()), Arc::new(store.clone()));

        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("tr.sock");
        let listener = create_listener(&socket_path).unwrap();
        let accept_engine = engine.clone();
        tokio::spawn(async move {
            // Keep the tempdir alive with the task.
            let _dir = dir;
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(handle_connection(stream, accept_engine.clone()));
            }
        });

        (engine, DaemonClient::new(socket_path))
    }

    #[tokio::test]
    async fn test_start_and_stop_over_socket() {
        let sim = SimBrowser::new();
        sim.open_window(&["https://a.test/", "https://b.test/"]).await;
        let store = MemoryStore::new();
        let (_engine, client) = serve_once(&sim, &store).await;

        let result = client
            .request(Command::Start {
                options: StartOptions {
                    interval_sec: Some(5.0),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert!(result.ok);
        assert_eq!(result.deferred, None);

        let status = client.request(Command::Status).await.unwrap();
        assert_eq!(status.running, Some(true));

        let result = client.request(Command::Stop).await.unwrap();
        assert!(result.ok);
        let status = client.request(Command::Status).await.unwrap();
        assert_eq!(status.running, Some(false));
    }

    #[tokio::test]
    async fn test_invalid_interval_rejected() {
        let sim = SimBrowser::new();
        let store = MemoryStore::new();
        let (_engine, client) = serve_once(&sim, &store).await;

        let result = client
            .request(Command::Start {
                options: StartOptions {
                    interval_sec: Some(0.0),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert!(!result.ok);
        assert_eq!(result.error, Some(ErrorCode::InvalidInterval));

        // Rejected start left the engine stopped.
        let status = client.request(Command::Status).await.unwrap();
        assert_eq!(status.running, Some(false));
    }

    #[tokio::test]
    async fn test_unknown_command_code() {
        let sim = SimBrowser::new();
        let store = MemoryStore::new();
        let (_engine, client) = serve_once(&sim, &store).await;

        let stream = UnixStream::connect(client.socket_path()).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        write_half
            .write_all(b"{\"id\":\"x\",\"command\":{\"type\":\"Reboot\"}}\n")
            .await
            .unwrap();
        let line = read_line(&mut reader).await.unwrap().unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(response.id, "x");
        assert_eq!(response.result.error, Some(ErrorCode::UnknownCommand));
    }

    #[tokio::test]
    async fn test_ping_reports_version() {
        let sim = SimBrowser::new();
        let store = MemoryStore::new();
        let (_engine, client) = serve_once(&sim, &store).await;

        let result = client.request(Command::Ping).await.unwrap();
        assert!(result.ok);
        assert_eq!(result.version.as_deref(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[tokio::test]
    async fn test_dropped_surface_connection_counts_as_close() {
        let sim = SimBrowser::new();
        sim.open_window(&["https://a.test/", "https://b.test/"]).await;
        let store = MemoryStore::new();
        let (engine, client) = serve_once(&sim, &store).await;

        engine
            .start(StartOptions {
                interval_sec: Some(5.0),
                ..Default::default()
            })
            .await
            .unwrap();

        // Open a surface on a persistent connection, then just drop it.
        let stream = UnixStream::connect(client.socket_path()).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        send_request_line(
            &mut write_half,
            &Request {
                id: "s-1".to_string(),
                command: Command::SurfaceOpen,
            },
        )
        .await
        .unwrap();
        let _ = read_line(&mut reader).await.unwrap();

        // Engine paused while the surface is open.
        let status = engine.status().await.unwrap();
        assert!(!status.running);
        assert!(status.surface_connected);

        drop(write_half);
        drop(reader);

        // The dropped connection resumes the engine.
        let mut running = false;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if engine.status().await.unwrap().running {
                running = true;
                break;
            }
        }
        assert!(running, "engine did not resume after surface connection drop");
    }
}
