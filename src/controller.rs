use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::domain::catalog::StationCatalog;
use crate::domain::events::{ControllerEvent, EventBus, SubscriptionId};
use crate::domain::models::{PlaybackState, Station};
use crate::error::{BackendError, ControllerError};
use crate::integrations::playback::{BackendEvent, BackendEventKind, BackendHandle, MediaBackend};
use crate::integrations::scheduler::{Scheduler, TimerHandle};
use crate::storage::settings::{clamp_volume, Settings, SettingsStore, DEFAULT_VOLUME};

/// Fixed delay between a stream error and the next connection attempt. No backoff, no cap.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// The only tag field inspected for now-playing updates.
pub const TITLE_TAG: &str = "title";

/// Owns the single backend handle and the reconnect timer.
///
/// Invariants kept by every transition:
/// - a backend handle exists iff the state is `Connecting` or `Playing`
/// - a reconnect timer is armed iff the state is `ErrorRecovering`
/// - volume stays within `[0, 1]`
pub struct PlaybackController<B: MediaBackend, S: Scheduler> {
    catalog: StationCatalog,
    backend: B,
    scheduler: S,
    settings: Box<dyn SettingsStore>,
    events: EventBus,
    station: &'static Station,
    volume: f64,
    pre_mute_volume: f64,
    state: PlaybackState,
    handle: Option<BackendHandle>,
    reconnect_timer: Option<TimerHandle>,
    last_track_title: Option<String>,
    shut_down: bool,
}

impl<B: MediaBackend, S: Scheduler> PlaybackController<B, S> {
    pub fn new(
        catalog: StationCatalog,
        backend: B,
        scheduler: S,
        settings: Box<dyn SettingsStore>,
    ) -> Result<Self> {
        let stored = settings
            .load()
            .context("load settings on startup")?
            .sanitized(&catalog);
        let station = stored
            .station
            .as_deref()
            .and_then(|key| catalog.lookup(key))
            .unwrap_or_else(|| catalog.default_station());
        let pre_mute_volume = if stored.volume > 0.0 {
            stored.volume
        } else {
            DEFAULT_VOLUME
        };

        info!(station = station.key, volume = stored.volume, "playback controller ready");

        Ok(Self {
            catalog,
            backend,
            scheduler,
            settings,
            events: EventBus::new(),
            station,
            volume: stored.volume,
            pre_mute_volume,
            state: PlaybackState::Idle,
            handle: None,
            reconnect_timer: None,
            last_track_title: None,
            shut_down: false,
        })
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<ControllerEvent>) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_station(&self) -> &'static Station {
        self.station
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn pre_mute_volume(&self) -> f64 {
        self.pre_mute_volume
    }

    pub fn last_track_title(&self) -> Option<&str> {
        self.last_track_title.as_deref()
    }

    pub fn has_backend(&self) -> bool {
        self.handle.is_some()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    /// Time until the earliest armed timer; lets the event loop sleep precisely.
    pub fn next_timer_delay(&self) -> Option<Duration> {
        self.scheduler.next_delay()
    }

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Idle => self.connect(),
            PlaybackState::ErrorRecovering => {
                self.cancel_reconnect();
                self.connect();
            }
            PlaybackState::Connecting | PlaybackState::Playing => {
                debug!(state = ?self.state, "play ignored, already active");
            }
        }
    }

    pub fn stop(&mut self) {
        if self.state == PlaybackState::Idle {
            return;
        }
        self.cancel_reconnect();
        self.dispose();
        self.set_state(PlaybackState::Idle);
        self.clear_title();
        info!(station = self.station.key, "playback stopped");
    }

    pub fn select_station(&mut self, key: &str) -> Result<(), ControllerError> {
        let station = self
            .catalog
            .lookup(key)
            .ok_or_else(|| ControllerError::InvalidCommand(format!("unknown station '{key}'")))?;

        let previous = self.state;
        match previous {
            PlaybackState::Idle => {}
            PlaybackState::Connecting | PlaybackState::Playing => self.dispose(),
            PlaybackState::ErrorRecovering => self.cancel_reconnect(),
        }

        self.station = station;
        self.persist();
        self.events
            .emit(ControllerEvent::StationChanged(station.key.to_string()));
        self.clear_title();
        info!(station = station.key, "station selected");

        if previous != PlaybackState::Idle {
            self.connect();
        }
        Ok(())
    }

    pub fn set_volume(&mut self, value: f64) {
        let volume = clamp_volume(value);
        if volume > 0.0 {
            self.pre_mute_volume = volume;
        }
        self.apply_volume(volume);
    }

    pub fn toggle_mute(&mut self) {
        if self.volume > 0.0 {
            self.pre_mute_volume = self.volume;
            self.apply_volume(0.0);
        } else {
            self.apply_volume(self.pre_mute_volume);
        }
    }

    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        if self.handle != Some(event.handle) {
            debug!(handle = %event.handle, "dropping event from disposed backend");
            return;
        }
        match event.kind {
            BackendEventKind::Error(message) => self.on_stream_error(&message),
            BackendEventKind::Tag { field, value } => self.on_tag(&field, &value),
        }
    }

    pub fn handle_timer(&mut self, timer: TimerHandle) {
        if self.reconnect_timer != Some(timer) {
            debug!(?timer, "ignoring stale timer");
            return;
        }
        self.reconnect_timer = None;
        if self.state == PlaybackState::ErrorRecovering {
            info!(station = self.station.key, "reconnecting");
            self.connect();
        }
    }

    /// Fires every timer whose deadline has passed.
    pub fn run_due_timers(&mut self) {
        for timer in self.scheduler.take_due() {
            self.handle_timer(timer);
        }
    }

    /// Releases the backend and the reconnect timer. Safe to call repeatedly.
    /// Afterwards no command creates a backend.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.stop();
        self.shut_down = true;
        debug!("playback controller shut down");
    }

    fn on_stream_error(&mut self, message: &str) {
        if !self.state.is_active() {
            return;
        }
        warn!(station = self.station.key, error = message, "stream error");
        self.enter_error_recovery();
    }

    fn on_tag(&mut self, field: &str, value: &str) {
        if field != TITLE_TAG {
            return;
        }
        let title = value.trim();
        if title.is_empty() || self.last_track_title.as_deref() == Some(title) {
            return;
        }
        debug!(title, "track changed");
        self.last_track_title = Some(title.to_string());
        self.events
            .emit(ControllerEvent::TrackChanged(self.last_track_title.clone()));
    }

    fn connect(&mut self) {
        if self.shut_down {
            debug!("connect ignored, controller is shut down");
            return;
        }
        let handle = match self.backend.create() {
            Ok(handle) => handle,
            Err(err) => {
                warn!(station = self.station.key, error = %err, "could not create media backend");
                self.set_state(PlaybackState::Idle);
                return;
            }
        };
        self.handle = Some(handle);
        self.set_state(PlaybackState::Connecting);

        if let Err(err) = self.configure_and_start(handle) {
            warn!(station = self.station.key, error = %err, "could not start stream");
            self.enter_error_recovery();
            return;
        }

        info!(station = self.station.key, %handle, "stream started");
        self.set_state(PlaybackState::Playing);
    }

    fn configure_and_start(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        self.backend.set_uri(handle, self.station.stream_url)?;
        self.backend.set_volume(handle, self.volume)?;
        self.backend.start(handle)
    }

    fn enter_error_recovery(&mut self) {
        self.dispose();
        self.cancel_reconnect();
        self.reconnect_timer = Some(self.scheduler.schedule(RECONNECT_DELAY));
        self.set_state(PlaybackState::ErrorRecovering);
        info!(
            station = self.station.key,
            delay_secs = RECONNECT_DELAY.as_secs(),
            "reconnect scheduled"
        );
    }

    fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.stop(handle);
            debug!(%handle, "backend disposed");
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    fn apply_volume(&mut self, volume: f64) {
        self.volume = volume;
        self.persist();
        if let Some(handle) = self.handle {
            if let Err(err) = self.backend.set_volume(handle, volume) {
                warn!(error = %err, "could not apply volume to backend");
            }
        }
        self.events.emit(ControllerEvent::VolumeChanged(volume));
    }

    fn clear_title(&mut self) {
        self.last_track_title = None;
        self.events.emit(ControllerEvent::TrackChanged(None));
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.events.emit(ControllerEvent::StateChanged(state));
    }

    fn persist(&mut self) {
        let settings = Settings {
            volume: self.volume,
            station: Some(self.station.key.to_string()),
        };
        if let Err(err) = self.settings.save(&settings) {
            warn!(error = ?err, "could not persist settings");
        }
    }
}

impl<B: MediaBackend, S: Scheduler> Drop for PlaybackController<B, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
