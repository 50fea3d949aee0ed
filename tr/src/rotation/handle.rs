//! EngineHandle - client interface to the engine actor
//!
//! Cloneable; every daemon connection and the boot path talk to the one
//! engine task through this.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use super::messages::{EngineCommand, EngineError, EngineEvent, EngineResponse, EngineStatus, StartOutcome};
use super::settings::StartOptions;

#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::Sender<EngineCommand>, event_tx: broadcast::Sender<EngineEvent>) -> Self {
        Self { tx, event_tx }
    }

    /// Subscribe to engine state-change events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Request a start. `Deferred` means the start is queued behind an
    /// open control surface and will execute when it closes.
    pub async fn start(&self, options: StartOptions) -> EngineResponse<StartOutcome> {
        debug!("EngineHandle::start: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Start {
                options,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn stop(&self) -> EngineResponse<()> {
        debug!("EngineHandle::stop: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Stop { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn surface_opened(&self) -> EngineResponse<()> {
        debug!("EngineHandle::surface_opened: called");
        self.tx
            .send(EngineCommand::SurfaceOpened)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn surface_closed(&self) -> EngineResponse<()> {
        debug!("EngineHandle::surface_closed: called");
        self.tx
            .send(EngineCommand::SurfaceClosed)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Run the boot-time restore; resolves once it finished (or was
    /// skipped because the engine is busy or already running).
    pub async fn restore(&self) -> EngineResponse<()> {
        debug!("EngineHandle::restore: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Restore { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn status(&self) -> EngineResponse<EngineStatus> {
        debug!("EngineHandle::status: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Status { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Tear the engine task down.
    pub async fn shutdown(&self) -> EngineResponse<()> {
        debug!("EngineHandle::shutdown: called");
        self.tx
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}
