#![allow(dead_code)]

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use nightride::controller::PlaybackController;
use nightride::domain::catalog::StationCatalog;
use nightride::domain::events::ControllerEvent;
use nightride::domain::models::PlaybackState;
use nightride::error::BackendError;
use nightride::integrations::playback::{BackendEvent, BackendHandle, MediaBackend};
use nightride::integrations::scheduler::{ManualClock, TimerQueue};
use nightride::storage::settings::{Settings, SettingsStore};

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: String) {
        self.0.lock().expect("lock calls").push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().expect("lock calls").clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.0.lock().expect("lock calls").clear();
    }
}

/// Switches shared between a test and its [`RecordingBackend`].
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub create: Arc<Mutex<bool>>,
    pub start: Arc<Mutex<bool>>,
}

impl Faults {
    pub fn fail_create(&self, fails: bool) {
        *self.create.lock().expect("lock create flag") = fails;
    }

    pub fn fail_start(&self, fails: bool) {
        *self.start.lock().expect("lock start flag") = fails;
    }
}

pub struct RecordingBackend {
    calls: CallLog,
    faults: Faults,
    next_id: u64,
}

impl RecordingBackend {
    pub fn new(calls: CallLog, faults: Faults) -> Self {
        Self {
            calls,
            faults,
            next_id: 0,
        }
    }
}

impl MediaBackend for RecordingBackend {
    fn create(&mut self) -> Result<BackendHandle, BackendError> {
        if *self.faults.create.lock().expect("lock create flag") {
            self.calls.push("create-failed".to_string());
            return Err(BackendError::Unavailable("no playbin".to_string()));
        }
        self.next_id += 1;
        self.calls.push(format!("create:{}", self.next_id));
        Ok(BackendHandle(self.next_id))
    }

    fn set_uri(&mut self, handle: BackendHandle, uri: &str) -> Result<(), BackendError> {
        self.calls.push(format!("uri:{}:{uri}", handle.0));
        Ok(())
    }

    fn set_volume(&mut self, handle: BackendHandle, volume: f64) -> Result<(), BackendError> {
        self.calls.push(format!("volume:{}:{volume}", handle.0));
        Ok(())
    }

    fn start(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        if *self.faults.start.lock().expect("lock start flag") {
            self.calls.push(format!("start-failed:{}", handle.0));
            return Err(BackendError::Unavailable("pipeline refused to start".to_string()));
        }
        self.calls.push(format!("start:{}", handle.0));
        Ok(())
    }

    fn stop(&mut self, handle: BackendHandle) {
        self.calls.push(format!("stop:{}", handle.0));
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    initial: Settings,
    saves: Arc<Mutex<Vec<Settings>>>,
}

impl RecordingStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            initial,
            saves: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn saves(&self) -> Vec<Settings> {
        self.saves.lock().expect("lock saves").clone()
    }

    pub fn last(&self) -> Option<Settings> {
        self.saves().last().cloned()
    }
}

impl SettingsStore for RecordingStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.initial.clone())
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        self.saves.lock().expect("lock saves").push(settings.clone());
        Ok(())
    }
}

pub type TestController = PlaybackController<RecordingBackend, TimerQueue<ManualClock>>;

pub struct Harness {
    pub controller: TestController,
    pub calls: CallLog,
    pub clock: ManualClock,
    pub store: RecordingStore,
    pub faults: Faults,
    pub events: Receiver<ControllerEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let calls = CallLog::default();
        let faults = Faults::default();
        let clock = ManualClock::new();
        let store = RecordingStore::new(settings);
        let mut controller = PlaybackController::new(
            StationCatalog::new(),
            RecordingBackend::new(calls.clone(), faults.clone()),
            TimerQueue::with_clock(clock.clone()),
            Box::new(store.clone()),
        )
        .expect("create controller");
        let (_, events) = controller.subscribe();

        Self {
            controller,
            calls,
            clock,
            store,
            faults,
            events,
        }
    }

    pub fn set_create_fails(&self, fails: bool) {
        self.faults.fail_create(fails);
    }

    pub fn set_start_fails(&self, fails: bool) {
        self.faults.fail_start(fails);
    }

    pub fn drain_events(&self) -> Vec<ControllerEvent> {
        self.events.try_iter().collect()
    }

    pub fn states(&self) -> Vec<PlaybackState> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                ControllerEvent::StateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Handle most recently returned by `create`.
    pub fn last_handle(&self) -> BackendHandle {
        let id = self
            .calls
            .calls()
            .iter()
            .rev()
            .find_map(|call| call.strip_prefix("create:").map(str::to_string))
            .expect("a backend was created");
        BackendHandle(id.parse().expect("numeric handle"))
    }

    pub fn fail_stream(&mut self, message: &str) {
        let handle = self.last_handle();
        self.controller
            .handle_backend_event(BackendEvent::error(handle, message));
    }

    pub fn send_tag(&mut self, field: &str, value: &str) {
        let handle = self.last_handle();
        self.controller
            .handle_backend_event(BackendEvent::tag(handle, field, value));
    }

    pub fn advance(&mut self, by: std::time::Duration) {
        self.clock.advance(by);
        self.controller.run_due_timers();
    }

    /// Creates minus stops; zero means no leaked backend handles.
    pub fn live_backends(&self) -> isize {
        self.calls.count("create:") as isize - self.calls.count("stop:") as isize
    }
}
