//! tabrotor - periodic tab rotation
//!
//! A timer-driven engine that cycles the active browser tab: either across
//! all open tabs or a curated entry list, with per-entry reload and
//! interval overrides, an optional dedicated window, and automatic
//! suspension while a control surface is open.
//!
//! # Core Concepts
//!
//! - **Host behind a trait**: the engine only sees [`browser::BrowserHost`],
//!   so tests (and simulation mode) drive an in-memory browser.
//! - **One actor, no overlap**: all mutable state lives in a single task;
//!   start, stop, and tick are serialized by construction.
//! - **Self-healing ticks**: every tick re-derives its candidates from the
//!   live tab set; failures are logged and the next tick starts clean.
//! - **Durable by transition**: state is persisted after every start and
//!   stop, with a versioned backup snapshot for recovery.
//!
//! # Modules
//!
//! - [`browser`] - host capability trait and the in-memory sim
//! - [`urlmatch`] - address normalization and loose matching
//! - [`rotation`] - the engine, resolver, window, and suspension logic
//! - [`store`] - durable state bridge
//! - [`ipc`] - control-surface protocol over a Unix socket
//! - [`daemon`] - socket serving and command dispatch

pub mod browser;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod ipc;
pub mod rotation;
pub mod store;
pub mod urlmatch;

// Re-export commonly used types
pub use browser::{BrowserHost, HostError, IconState, SimBrowser, TabId, TabInfo, TabScope, WindowId};
pub use config::DaemonConfig;
pub use daemon::Daemon;
pub use ipc::{Command, CommandResult, DaemonClient, ErrorCode, Request, Response};
pub use rotation::{
    Entry, EntrySpec, EngineError, EngineEvent, EngineHandle, EngineStatus, RotationEngine,
    RotationSettings, RotationTarget, StartOptions, StartOutcome,
};
pub use store::{ConfigBackup, FileStore, MemoryStore, PersistedState, StateStore, StoreError};
