//! Control-surface suspension
//!
//! The control surface and the engine both want to decide which tab is
//! active; while the surface is open the engine yields. The bookkeeping is
//! a single three-state machine instead of loose flags, so a deferred
//! start and an auto-pause snapshot can never both fire on disconnect.

use tracing::debug;

use super::settings::{RotationSettings, StartOptions};

/// What is pending for the moment the surface goes away.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SurfaceState {
    /// Nothing pending.
    #[default]
    Idle,
    /// An explicit start arrived while the surface was open; it executes
    /// on disconnect and wins over any auto-resume.
    Deferred(StartOptions),
    /// The engine was auto-paused on connect; this exact configuration is
    /// restarted on disconnect.
    Paused(RotationSettings),
}

/// Action the engine must take when the surface disconnects.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeAction {
    None,
    /// Run the deferred start.
    Start(StartOptions),
    /// Restart from the pause snapshot.
    Resume(RotationSettings),
}

/// Tracks surface connection state and the pending action.
#[derive(Debug, Default)]
pub struct SuspensionCoordinator {
    connected: bool,
    state: SurfaceState,
}

impl SuspensionCoordinator {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Surface connected. Returns true when the engine must pause (it is
    /// running and coexistence is disabled); the snapshot is taken here.
    pub fn on_connect(&mut self, running: bool, settings: &RotationSettings) -> bool {
        self.connected = true;
        if running && !settings.allow_rotation_while_surface_open {
            debug!("surface connected while running, taking pause snapshot");
            self.state = SurfaceState::Paused(settings.clone());
            return true;
        }
        false
    }

    /// Surface disconnected. Consumes whatever was pending, exactly once.
    pub fn on_disconnect(&mut self) -> ResumeAction {
        if !self.connected {
            return ResumeAction::None;
        }
        self.connected = false;
        match std::mem::take(&mut self.state) {
            SurfaceState::Idle => ResumeAction::None,
            SurfaceState::Deferred(opts) => {
                debug!("surface disconnected, executing deferred start");
                ResumeAction::Start(opts)
            }
            SurfaceState::Paused(snapshot) => {
                debug!("surface disconnected, resuming from pause snapshot");
                ResumeAction::Resume(snapshot)
            }
        }
    }

    /// Record a start that must wait for the surface to close. Replaces
    /// any previous deferred start and discards any pause snapshot: the
    /// user's explicit intent supersedes automatic resume.
    pub fn defer_start(&mut self, opts: StartOptions) {
        self.state = SurfaceState::Deferred(opts);
    }

    /// An explicit command executed; automatic bookkeeping is void.
    pub fn clear_pending(&mut self) {
        self.state = SurfaceState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_settings() -> RotationSettings {
        RotationSettings {
            interval_sec: 9.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_connect_pauses_only_when_running_without_coexistence() {
        let mut coord = SuspensionCoordinator::default();
        assert!(coord.on_connect(true, &running_settings()));
        assert!(coord.is_connected());

        let mut coord = SuspensionCoordinator::default();
        assert!(!coord.on_connect(false, &running_settings()));

        let mut coord = SuspensionCoordinator::default();
        let coexist = RotationSettings {
            allow_rotation_while_surface_open: true,
            ..running_settings()
        };
        assert!(!coord.on_connect(true, &coexist));
    }

    #[test]
    fn test_disconnect_resumes_snapshot_exactly_once() {
        let mut coord = SuspensionCoordinator::default();
        coord.on_connect(true, &running_settings());

        match coord.on_disconnect() {
            ResumeAction::Resume(snapshot) => assert_eq!(snapshot, running_settings()),
            other => panic!("expected resume, got {other:?}"),
        }
        // Snapshot was consumed; a second disconnect has nothing.
        assert_eq!(coord.on_disconnect(), ResumeAction::None);
    }

    #[test]
    fn test_deferred_start_wins_over_snapshot() {
        let mut coord = SuspensionCoordinator::default();
        coord.on_connect(true, &running_settings());

        let opts = StartOptions {
            interval_sec: Some(2.0),
            ..Default::default()
        };
        coord.defer_start(opts.clone());

        assert_eq!(coord.on_disconnect(), ResumeAction::Start(opts));
    }

    #[test]
    fn test_explicit_command_clears_pending() {
        let mut coord = SuspensionCoordinator::default();
        coord.on_connect(true, &running_settings());
        coord.clear_pending();
        assert_eq!(coord.on_disconnect(), ResumeAction::None);
    }

    #[test]
    fn test_disconnect_without_connect_is_noop() {
        let mut coord = SuspensionCoordinator::default();
        assert_eq!(coord.on_disconnect(), ResumeAction::None);
    }
}
