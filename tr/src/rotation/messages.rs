//! Engine commands, responses, and events
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::browser::{TabId, WindowId};

use super::settings::StartOptions;

/// Errors surfaced to command callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("interval must be a finite number of seconds >= 1")]
    InvalidInterval,

    #[error("internal engine failure: {0}")]
    Internal(String),

    #[error("engine channel closed")]
    ChannelClosed,
}

pub type EngineResponse<T> = Result<T, EngineError>;

/// How a START request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The cycle is running.
    Started,
    /// Queued behind an open control surface; executes on disconnect.
    Deferred,
}

/// Observable engine state, for status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub running: bool,
    pub interval_sec: f64,
    pub targets: usize,
    pub dedicated_window: Option<WindowId>,
    pub surface_connected: bool,
}

/// Commands sent to the engine actor.
#[derive(Debug)]
pub enum EngineCommand {
    Start {
        options: StartOptions,
        reply: oneshot::Sender<EngineResponse<StartOutcome>>,
    },
    Stop {
        reply: oneshot::Sender<EngineResponse<()>>,
    },
    /// A control surface connected.
    SurfaceOpened,
    /// A control surface disconnected (or dropped its connection).
    SurfaceClosed,
    /// Boot-time restore from the durable store.
    Restore {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
    Shutdown,
}

/// Broadcast whenever the engine changes observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Started,
    Stopped,
    Rotated { tab: TabId },
}
