//! Tab rotation
//!
//! The timer-driven state machine that advances the active tab, plus the
//! pieces it is built from: configuration normalization, candidate
//! resolution, the dedicated window, and control-surface suspension.

pub mod engine;
pub mod handle;
pub mod messages;
pub mod resolver;
pub mod settings;
pub mod suspend;
pub mod window;

pub use engine::RotationEngine;
pub use handle::EngineHandle;
pub use messages::{EngineCommand, EngineError, EngineEvent, EngineResponse, EngineStatus, StartOutcome};
pub use resolver::{Candidate, RotationTarget};
pub use settings::{Entry, EntrySpec, RotationSettings, StartOptions};
pub use suspend::{ResumeAction, SurfaceState, SuspensionCoordinator};
pub use window::{DedicatedWindow, WindowEnsure};
