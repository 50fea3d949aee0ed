//! Rotation engine actor
//!
//! One spawned task owns every piece of mutable rotation state and
//! multiplexes three wake sources: the command channel, the rotation
//! deadline, and the 500 ms badge sub-tick. Start, stop, and tick can
//! therefore never overlap; each await point inside a tick re-validates
//! live state instead of trusting earlier queries.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::{BrowserHost, HostError, IconState, TabScope};
use crate::store::{PersistedState, StateStore};

use super::handle::EngineHandle;
use super::messages::{EngineCommand, EngineError, EngineEvent, EngineStatus, StartOutcome};
use super::resolver::{self, Candidate, RotationTarget};
use super::settings::{RotationSettings, StartOptions, normalize_entries};
use super::suspend::{ResumeAction, SuspensionCoordinator};
use super::window::DedicatedWindow;

/// Badge background used while a countdown is showing.
const BADGE_COLOR: &str = "#4f46e5";

/// Floor applied to every scheduled delay.
const MIN_TICK_DELAY: Duration = Duration::from_millis(50);

/// Badge sub-tick period.
const BADGE_PERIOD: Duration = Duration::from_millis(500);

/// Active badge countdown toward the next rotation.
#[derive(Debug)]
struct BadgeCountdown {
    end: Instant,
    next_sub: Instant,
}

/// All mutable engine state. Exactly one instance, owned by the actor.
struct EngineContext {
    settings: RotationSettings,
    running: bool,
    interval: Duration,
    targets: Vec<RotationTarget>,
    window: DedicatedWindow,
    suspension: SuspensionCoordinator,
    restoring: bool,
    next_tick: Option<Instant>,
    badge: Option<BadgeCountdown>,
}

pub struct RotationEngine {
    host: Arc<dyn BrowserHost>,
    store: Arc<dyn StateStore>,
    rx: mpsc::Receiver<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
    ctx: EngineContext,
}

impl RotationEngine {
    /// Spawn the engine actor and return its handle.
    pub fn spawn(host: Arc<dyn BrowserHost>, store: Arc<dyn StateStore>) -> EngineHandle {
        let (tx, rx) = mpsc::channel(64);
        let (event_tx, _) = broadcast::channel(64);

        let engine = RotationEngine {
            host,
            store,
            rx,
            event_tx: event_tx.clone(),
            ctx: EngineContext {
                settings: RotationSettings::default(),
                running: false,
                interval: Duration::from_secs_f64(RotationSettings::default().interval_sec),
                targets: Vec::new(),
                window: DedicatedWindow::default(),
                suspension: SuspensionCoordinator::default(),
                restoring: false,
                next_tick: None,
                badge: None,
            },
        };
        tokio::spawn(engine.run());
        info!("rotation engine spawned");

        EngineHandle::new(tx, event_tx)
    }

    async fn run(mut self) {
        debug!("engine actor started");
        loop {
            // Far-future stand-ins keep the select arms total; the guards
            // make sure they never actually fire.
            let far = Instant::now() + Duration::from_secs(86_400);
            let tick_at = self.ctx.next_tick.unwrap_or(far);
            let badge_at = self.ctx.badge.as_ref().map(|b| b.next_sub).unwrap_or(far);

            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(tick_at), if self.ctx.next_tick.is_some() => {
                    self.on_tick().await;
                }
                _ = tokio::time::sleep_until(badge_at), if self.ctx.badge.is_some() => {
                    self.on_badge_tick().await;
                }
            }
        }
        debug!("engine actor stopped");
    }

    /// Returns true when the actor should exit.
    async fn handle_command(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::Start { options, reply } => {
                debug!("engine: Start command");
                let _ = reply.send(self.on_start(options).await);
            }
            EngineCommand::Stop { reply } => {
                debug!("engine: Stop command");
                self.ctx.suspension.clear_pending();
                self.stop_rotation(true).await;
                let _ = reply.send(Ok(()));
            }
            EngineCommand::SurfaceOpened => {
                debug!("engine: SurfaceOpened command");
                let should_pause = self
                    .ctx
                    .suspension
                    .on_connect(self.ctx.running, &self.ctx.settings);
                if should_pause {
                    info!("control surface open, pausing rotation");
                    // Not persisted: durable state keeps saying "running"
                    // so a later boot restores the cycle.
                    self.stop_rotation(false).await;
                }
            }
            EngineCommand::SurfaceClosed => {
                debug!("engine: SurfaceClosed command");
                match self.ctx.suspension.on_disconnect() {
                    ResumeAction::None => {}
                    ResumeAction::Start(options) => {
                        if let Err(e) = self.start_rotation(options).await {
                            warn!(error = %e, "deferred start failed");
                        }
                    }
                    ResumeAction::Resume(snapshot) => {
                        if let Err(e) = self.start_rotation(StartOptions::from(snapshot)).await {
                            warn!(error = %e, "auto-resume failed");
                        }
                    }
                }
            }
            EngineCommand::Restore { reply } => {
                debug!("engine: Restore command");
                self.on_restore().await;
                let _ = reply.send(());
            }
            EngineCommand::Status { reply } => {
                let _ = reply.send(EngineStatus {
                    running: self.ctx.running,
                    interval_sec: self.ctx.settings.interval_sec,
                    targets: self.ctx.targets.len(),
                    dedicated_window: self.ctx.window.id(),
                    surface_connected: self.ctx.suspension.is_connected(),
                });
            }
            EngineCommand::Shutdown => {
                debug!("engine: Shutdown command");
                return true;
            }
        }
        false
    }

    // === start / stop ===

    async fn on_start(&mut self, options: StartOptions) -> Result<StartOutcome, EngineError> {
        // Validation first: a rejected start must leave state untouched.
        match options.interval_sec {
            Some(v) if v.is_finite() && v >= 1.0 => {}
            _ => return Err(EngineError::InvalidInterval),
        }

        self.ctx.suspension.clear_pending();

        let allow_coexist = options
            .allow_rotation_while_popup_open
            .unwrap_or(self.ctx.settings.allow_rotation_while_surface_open);
        if self.ctx.suspension.is_connected() && !allow_coexist {
            info!("start deferred behind open control surface");
            self.ctx.suspension.defer_start(options);
            return Ok(StartOutcome::Deferred);
        }

        self.start_rotation(options).await?;
        Ok(StartOutcome::Started)
    }

    async fn start_rotation(&mut self, options: StartOptions) -> Result<(), EngineError> {
        // Idempotent: any prior cycle is fully torn down first.
        self.stop_rotation(false).await;

        let settings = options.apply(&self.ctx.settings);
        self.ctx.interval = Duration::from_secs_f64(settings.interval_sec);
        self.ctx.settings = settings;

        if self.ctx.settings.use_dedicated_window && self.ctx.settings.use_custom_list {
            let settings = self.ctx.settings.clone();
            self.ctx
                .window
                .ensure(&*self.host, &settings, &settings.custom_entries)
                .await
                .map_err(internal)?;
        } else {
            // Policy changed away from the dedicated window: drop it.
            self.ctx.window.close(&*self.host).await;
        }

        self.ctx.targets = if self.ctx.settings.use_custom_list {
            resolver::resolve_targets(
                &*self.host,
                &self.ctx.settings.custom_entries,
                self.ctx.window.id(),
                self.ctx.settings.open_custom_tabs,
            )
            .await
            .map_err(internal)?
        } else {
            Vec::new()
        };

        if self.ctx.settings.use_custom_list && self.ctx.targets.len() < 2 {
            // A requested custom rotation must not run with a pool of one:
            // force a second pass that opens whatever is missing.
            self.ctx.targets = resolver::resolve_targets(
                &*self.host,
                &self.ctx.settings.custom_entries,
                self.ctx.window.id(),
                true,
            )
            .await
            .map_err(internal)?;
            self.ctx.settings.open_custom_tabs = true;
        }

        self.ctx.running = true;
        self.host.set_icon(IconState::Active).await;
        let first_delay = self.ctx.interval;
        self.schedule_next(first_delay).await;
        self.persist(true).await;
        self.emit(EngineEvent::Started);
        info!(
            interval_sec = self.ctx.settings.interval_sec,
            custom = self.ctx.settings.use_custom_list,
            targets = self.ctx.targets.len(),
            "rotation started"
        );
        Ok(())
    }

    async fn stop_rotation(&mut self, persist: bool) {
        let was_running = self.ctx.running;
        self.ctx.next_tick = None;
        self.ctx.badge = None;
        self.ctx.running = false;
        self.ctx.targets.clear();
        self.host.set_badge_text(String::new()).await;
        self.host.set_icon(IconState::Inactive).await;

        if persist {
            self.persist(false).await;
        }
        if was_running {
            self.emit(EngineEvent::Stopped);
            info!("rotation stopped");
        }
    }

    // === tick ===

    async fn on_tick(&mut self) {
        self.ctx.next_tick = None;
        let mut next_delay = self.ctx.interval;

        if let Err(e) = self.rotate_once(&mut next_delay).await {
            // Transient by definition: the next tick re-derives everything.
            warn!(error = %e, "rotation tick failed");
        }
        if self.ctx.running {
            self.schedule_next(next_delay).await;
        }
    }

    async fn rotate_once(&mut self, next_delay: &mut Duration) -> Result<(), HostError> {
        let settings = self.ctx.settings.clone();

        if settings.use_dedicated_window && settings.use_custom_list {
            if self.ctx.window.id().is_some() {
                // Closed externally? This tick falls back to the current
                // window; recreation waits for the next tick's ensure.
                if !self.ctx.window.probe(&*self.host).await {
                    debug!("dedicated window lost, using current window this tick");
                }
            } else {
                let ensured = self
                    .ctx
                    .window
                    .ensure(&*self.host, &settings, &settings.custom_entries)
                    .await?;
                if ensured.created {
                    // Freshly created window: its tabs are still settling,
                    // so take the simplified resolution instead of opening
                    // anything further.
                    self.ctx.targets = resolver::resolve_targets(
                        &*self.host,
                        &settings.custom_entries,
                        self.ctx.window.id(),
                        false,
                    )
                    .await?;
                }
            }
        }

        let mut tabs = self.host.query_tabs(self.query_scope()).await?;
        if !self.ctx.running || tabs.len() < 2 {
            return Ok(());
        }
        let Some(active) = tabs.iter().find(|t| t.active).cloned() else {
            return Ok(());
        };

        let excluded = settings.excluded_domains();
        let mut candidates = if settings.use_custom_list {
            resolver::build_candidates(&settings.custom_entries, &tabs, &excluded, &self.ctx.targets)
        } else {
            Vec::new()
        };

        if settings.use_custom_list && candidates.len() < 2 {
            // One re-resolution attempt; missing tabs open only when the
            // policy allows.
            self.ctx.targets = resolver::resolve_targets(
                &*self.host,
                &settings.custom_entries,
                self.ctx.window.id(),
                settings.open_custom_tabs,
            )
            .await?;
            if !self.ctx.targets.is_empty() {
                tabs = self.host.query_tabs(self.query_scope()).await?;
                candidates = resolver::build_candidates(
                    &settings.custom_entries,
                    &tabs,
                    &excluded,
                    &self.ctx.targets,
                );
            }
        }

        if candidates.len() < 2 {
            // Last resort: rotate across every non-excluded open tab with
            // no refresh policy.
            candidates = tabs
                .iter()
                .filter(|t| !crate::urlmatch::is_excluded(t.match_url(), &excluded))
                .map(|t| Candidate {
                    tab: t.clone(),
                    refresh: false,
                    interval_sec: None,
                    refresh_delay_sec: 0.0,
                    name: String::new(),
                })
                .collect();
            if candidates.len() < 2 {
                return Ok(());
            }
        }

        let active_index = candidates.iter().position(|c| c.tab.id == active.id);
        let next_index = if settings.shuffle {
            let pool: Vec<usize> = (0..candidates.len())
                .filter(|i| Some(*i) != active_index)
                .collect();
            pool[rand::rng().random_range(0..pool.len())]
        } else {
            let start = active_index.unwrap_or(0);
            (start + 1) % candidates.len()
        };
        let chosen = candidates[next_index].clone();

        self.host.activate_tab(chosen.tab.id).await?;
        debug!(tab = %chosen.tab.id, name = %chosen.name, "rotated to next tab");
        self.emit(EngineEvent::Rotated { tab: chosen.tab.id });

        if settings.enable_refresh_flags && chosen.refresh {
            // The wait happens before the next schedule is computed, so
            // the rest period stacks on top of the interval.
            if chosen.refresh_delay_sec > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(chosen.refresh_delay_sec)).await;
            }
            self.host.reload_tab(chosen.tab.id).await?;
        }

        *next_delay =
            match resolver::find_entry_for_tab(&settings.custom_entries, chosen.tab.match_url()) {
                Some(entry) => match entry.interval_sec {
                    Some(v) if v.is_finite() && v >= 1.0 => Duration::from_secs_f64(v),
                    _ => self.ctx.interval,
                },
                None => self.ctx.interval,
            };
        Ok(())
    }

    fn query_scope(&self) -> TabScope {
        if self.ctx.settings.use_dedicated_window {
            if let Some(id) = self.ctx.window.id() {
                return TabScope::Window(id);
            }
        }
        TabScope::CurrentWindow
    }

    // === scheduling / badge ===

    async fn schedule_next(&mut self, delay: Duration) {
        if !self.ctx.running {
            return;
        }
        let safe = delay.max(MIN_TICK_DELAY);
        let now = Instant::now();
        self.ctx.next_tick = Some(now + safe);

        // The old countdown is always superseded before a new one starts.
        self.ctx.badge = None;
        if self.ctx.settings.badge_countdown {
            self.host.set_badge_color(BADGE_COLOR.to_string()).await;
            self.ctx.badge = Some(BadgeCountdown {
                end: now + safe,
                next_sub: now,
            });
            self.update_badge().await;
        } else {
            self.host.set_badge_text(String::new()).await;
        }
        debug!(delay_ms = safe.as_millis() as u64, "next rotation scheduled");
    }

    async fn on_badge_tick(&mut self) {
        self.update_badge().await;
    }

    async fn update_badge(&mut self) {
        let Some(badge) = self.ctx.badge.as_mut() else {
            return;
        };
        let now = Instant::now();
        let remaining = badge.end.saturating_duration_since(now);
        let secs = remaining.as_secs_f64().ceil() as u64;

        if secs == 0 {
            self.ctx.badge = None;
            self.host.set_badge_text(String::new()).await;
        } else {
            badge.next_sub = now + BADGE_PERIOD;
            self.host.set_badge_text(secs.to_string()).await;
        }
    }

    // === restore / persist ===

    async fn on_restore(&mut self) {
        // Mutually exclusive with command handling by construction; the
        // flag additionally skips re-entry and running engines outright.
        if self.ctx.restoring || self.ctx.running {
            debug!("restore skipped: busy or already running");
            return;
        }
        self.ctx.restoring = true;
        if let Err(e) = self.restore_inner().await {
            warn!(error = %e, "restore from durable state failed");
        }
        self.ctx.restoring = false;
    }

    async fn restore_inner(&mut self) -> Result<(), EngineError> {
        let Some(mut data) = self.store.load().await.map_err(internal)? else {
            debug!("nothing persisted, staying stopped");
            self.host.set_icon(IconState::Inactive).await;
            return Ok(());
        };

        // Entry-list fallback chain: entries -> legacy URLs -> backup.
        if data.settings.custom_entries.is_empty() {
            if !data.custom_urls.is_empty() {
                let specs: Vec<_> = data
                    .custom_urls
                    .iter()
                    .cloned()
                    .map(super::settings::EntrySpec::Url)
                    .collect();
                data.settings.custom_entries = normalize_entries(&specs);
            } else if let Some(backup) = &data.config_backup {
                data.settings.custom_entries = backup.settings.custom_entries.clone();
            }
        }
        if data.settings.custom_raw_text.is_empty() && !data.settings.custom_entries.is_empty() {
            data.settings.custom_raw_text = data
                .settings
                .custom_entries
                .iter()
                .map(|e| e.url.as_str())
                .collect::<Vec<_>>()
                .join("\n");
        }

        self.ctx.window = DedicatedWindow::new(data.window_id());

        let surface_blocks = self.ctx.suspension.is_connected()
            && !data.settings.allow_rotation_while_surface_open;
        if (data.is_running || data.settings.auto_start) && !surface_blocks {
            info!("restoring running rotation from durable state");
            self.start_rotation(StartOptions::from(data.settings)).await?;
        } else {
            self.ctx.settings = data.settings;
            self.host.set_icon(IconState::Inactive).await;
        }
        Ok(())
    }

    async fn persist(&self, is_running: bool) {
        let state = PersistedState::snapshot(&self.ctx.settings, is_running, self.ctx.window.id());
        if let Err(e) = self.store.save(&state).await {
            // In-memory state stays authoritative.
            warn!(error = %e, "could not persist engine state");
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}

fn internal(e: impl std::fmt::Display) -> EngineError {
    EngineError::Internal(e.to_string())
}
