use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::controller::{PlaybackController, RECONNECT_DELAY};
use crate::domain::catalog::StationCatalog;
use crate::domain::commands::{Command, HELP_TEXT};
use crate::domain::events::{ControllerEvent, SubscriptionId};
use crate::domain::models::{PlaybackState, Station};
use crate::domain::palette::resolve_station;
use crate::integrations::playback::{BackendEvent, MediaBackend};
use crate::integrations::scheduler::{Scheduler, TimerQueue};
use crate::integrations::vlc_process::VlcBackend;
use crate::storage::config::RuntimeConfig;
use crate::storage::settings::JsonSettingsStore;
use crate::ui::Tui;

const VOLUME_STEP: f64 = 0.05;
const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Stations,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    Muted,
    Low,
    Medium,
    High,
}

impl VolumeLevel {
    pub fn from_volume(volume: f64) -> Self {
        if volume <= 0.0 {
            Self::Muted
        } else if volume < 0.33 {
            Self::Low
        } else if volume < 0.66 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Muted => "muted",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// What the presentation last heard from the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub state: PlaybackState,
    pub station_key: String,
    pub title: Option<String>,
    pub volume: f64,
}

pub struct App<B: MediaBackend, S: Scheduler> {
    pub running: bool,
    pub status_message: String,
    pub selected_index: usize,
    pub focus: Focus,
    pub command_input: String,
    now_playing: NowPlaying,
    controller: PlaybackController<B, S>,
    subscription: SubscriptionId,
    controller_events: Receiver<ControllerEvent>,
    backend_events: Receiver<BackendEvent>,
    pending_events: Vec<ControllerEvent>,
}

impl<B: MediaBackend, S: Scheduler> App<B, S> {
    pub fn new(
        mut controller: PlaybackController<B, S>,
        backend_events: Receiver<BackendEvent>,
    ) -> Self {
        let (subscription, controller_events) = controller.subscribe();
        let station = controller.current_station();
        let now_playing = NowPlaying {
            state: controller.state(),
            station_key: station.key.to_string(),
            title: controller.last_track_title().map(ToString::to_string),
            volume: controller.volume(),
        };
        let selected_index = controller.catalog().position(station.key).unwrap_or(0);

        Self {
            running: true,
            status_message: format!("Ready: {}", station.label),
            selected_index,
            focus: Focus::Stations,
            command_input: String::new(),
            now_playing,
            controller,
            subscription,
            controller_events,
            backend_events,
            pending_events: Vec::new(),
        }
    }

    pub fn now_playing(&self) -> &NowPlaying {
        &self.now_playing
    }

    pub fn catalog(&self) -> &StationCatalog {
        self.controller.catalog()
    }

    pub fn current_station(&self) -> &'static Station {
        self.catalog()
            .lookup(&self.now_playing.station_key)
            .unwrap_or_else(|| self.catalog().default_station())
    }

    pub fn selected_station(&self) -> Option<&'static Station> {
        self.catalog().stations().get(self.selected_index)
    }

    pub fn volume_level(&self) -> VolumeLevel {
        VolumeLevel::from_volume(self.now_playing.volume)
    }

    /// Feeds pending backend events and due timers to the controller, then
    /// returns every controller event applied since the last call, including
    /// those caused by commands.
    pub fn pump(&mut self) -> Vec<ControllerEvent> {
        while let Ok(event) = self.backend_events.try_recv() {
            self.controller.handle_backend_event(event);
        }
        self.controller.run_due_timers();
        self.take_events()
    }

    /// Controller events applied since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<ControllerEvent> {
        self.drain_controller_events();
        std::mem::take(&mut self.pending_events)
    }

    /// Blocks for at most `timeout` (shortened to the next timer deadline) waiting
    /// for backend activity, then pumps.
    pub fn wait_and_pump(&mut self, timeout: Duration) -> Vec<ControllerEvent> {
        let wait = self
            .controller
            .next_timer_delay()
            .map_or(timeout, |delay| delay.min(timeout));
        match self.backend_events.recv_timeout(wait) {
            Ok(event) => self.controller.handle_backend_event(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
        self.pump()
    }

    pub fn toggle_playback(&mut self) -> Result<String> {
        match self.now_playing.state {
            PlaybackState::Idle | PlaybackState::ErrorRecovering => self.execute(Command::Play),
            PlaybackState::Connecting | PlaybackState::Playing => self.execute(Command::Stop),
        }
    }

    pub fn select_next(&mut self) {
        let len = self.catalog().len();
        if len == 0 {
            return;
        }
        self.selected_index = (self.selected_index + 1) % len;
    }

    pub fn select_previous(&mut self) {
        let len = self.catalog().len();
        if len == 0 {
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = len - 1;
        } else {
            self.selected_index -= 1;
        }
    }

    pub fn activate_selected(&mut self) -> Result<String> {
        let station = self
            .selected_station()
            .ok_or_else(|| anyhow!("no station selected"))?;
        self.execute(Command::Station(station.key.to_string()))
    }

    pub fn volume_up(&mut self) {
        self.controller
            .set_volume(self.now_playing.volume + VOLUME_STEP);
        self.refresh_status();
    }

    pub fn volume_down(&mut self) {
        self.controller
            .set_volume(self.now_playing.volume - VOLUME_STEP);
        self.refresh_status();
    }

    pub fn open_command_input(&mut self) {
        self.focus = Focus::Command;
        if self.command_input.is_empty() {
            self.command_input.push('/');
        }
    }

    pub fn close_command_input(&mut self) {
        self.focus = Focus::Stations;
        self.command_input.clear();
    }

    pub fn push_char(&mut self, c: char) {
        if self.focus == Focus::Command {
            self.command_input.push(c);
        }
    }

    pub fn backspace_input(&mut self) {
        if self.focus == Focus::Command {
            self.command_input.pop();
        }
    }

    pub fn submit_command_input(&mut self) -> Result<String> {
        let input = std::mem::take(&mut self.command_input);
        self.focus = Focus::Stations;
        let command = Command::parse(&input)?;
        self.execute(command)
    }

    pub fn request_quit(&mut self) -> Result<String> {
        self.execute(Command::Quit)
    }

    /// Runs one command and returns the human-readable reply, also kept as the status line.
    pub fn execute(&mut self, command: Command) -> Result<String> {
        let reply = match command {
            Command::Play => {
                self.controller.play();
                self.drain_controller_events();
                match self.now_playing.state {
                    PlaybackState::Idle => "Playback unavailable; see log for details".to_string(),
                    _ => format!("Playing {}", self.current_station().label),
                }
            }
            Command::Stop => {
                self.controller.stop();
                self.drain_controller_events();
                "Playback stopped".to_string()
            }
            Command::Station(query) => {
                let key = resolve_station(self.catalog(), &query)
                    .map(|station| station.key.to_string())
                    .unwrap_or(query);
                self.controller.select_station(&key)?;
                self.drain_controller_events();
                let station = self.current_station();
                if let Some(idx) = self.catalog().position(station.key) {
                    self.selected_index = idx;
                }
                format!("Station: {}", station.label)
            }
            Command::Volume(percent) => {
                self.controller.set_volume(f64::from(percent) / 100.0);
                self.drain_controller_events();
                self.volume_status()
            }
            Command::Mute => {
                self.controller.toggle_mute();
                self.drain_controller_events();
                self.volume_status()
            }
            Command::Status => self.status_line(),
            Command::Stations => self
                .catalog()
                .stations()
                .iter()
                .map(|station| {
                    let marker = if station.key == self.now_playing.station_key {
                        '*'
                    } else {
                        ' '
                    };
                    format!("{marker} {:<12} {}", station.key, station.label)
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Quit => {
                self.shutdown();
                self.running = false;
                "Bye".to_string()
            }
            Command::Help => HELP_TEXT.to_string(),
        };

        self.status_message = reply.lines().next().unwrap_or_default().to_string();
        Ok(reply)
    }

    pub fn status_line(&self) -> String {
        let station = self.current_station();
        let mut line = format!(
            "{} | {} | volume {}%",
            self.now_playing.state.label(),
            station.label,
            (self.now_playing.volume * 100.0).round() as u8
        );
        if let Some(title) = &self.now_playing.title {
            line.push_str(&format!(" | {title}"));
        }
        line
    }

    /// Tears the controller down; later calls are no-ops.
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
        self.controller.unsubscribe(self.subscription);
        self.drain_controller_events();
    }

    fn volume_status(&self) -> String {
        format!(
            "Volume {}% ({})",
            (self.now_playing.volume * 100.0).round() as u8,
            self.volume_level().label()
        )
    }

    fn refresh_status(&mut self) {
        self.drain_controller_events();
        self.status_message = self.volume_status();
    }

    fn drain_controller_events(&mut self) {
        let events: Vec<ControllerEvent> = self.controller_events.try_iter().collect();
        for event in &events {
            self.apply_event(event);
        }
        self.pending_events.extend(events);
    }

    fn apply_event(&mut self, event: &ControllerEvent) {
        match event {
            ControllerEvent::StateChanged(state) => {
                self.now_playing.state = *state;
                if *state == PlaybackState::ErrorRecovering {
                    self.status_message = format!(
                        "Stream lost, reconnecting in {}s",
                        RECONNECT_DELAY.as_secs()
                    );
                }
            }
            ControllerEvent::StationChanged(key) => self.now_playing.station_key = key.clone(),
            ControllerEvent::TrackChanged(title) => self.now_playing.title = title.clone(),
            ControllerEvent::VolumeChanged(volume) => self.now_playing.volume = *volume,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub debug: bool,
    pub headless: bool,
    pub config_path: Option<PathBuf>,
}

pub fn run(options: RunOptions) -> Result<()> {
    let config = match &options.config_path {
        Some(path) => RuntimeConfig::load_from_path(path),
        None => RuntimeConfig::load(),
    }
    .context("load runtime config")?;
    init_tracing(&config, &options)?;

    let (backend_tx, backend_rx) = mpsc::channel();
    let backend = VlcBackend::new_with_program(
        config.player.program.clone(),
        config.player.metadata_poll(),
        backend_tx,
    );
    let store = JsonSettingsStore::new(&config.settings_path);
    info!(
        settings = %store.path().display(),
        player = %config.player.program,
        "nightride starting"
    );
    let controller = PlaybackController::new(
        StationCatalog::new(),
        backend,
        TimerQueue::new(),
        Box::new(store),
    )?;
    let mut app = App::new(controller, backend_rx);

    let result = if options.headless {
        run_headless(&mut app)
    } else {
        Tui::new().and_then(|mut tui| tui.run(&mut app))
    };

    if let Err(err) = &result {
        warn!(error = ?err, "front end exited with error");
    }
    app.shutdown();
    result
}

fn run_headless<B: MediaBackend, S: Scheduler>(app: &mut App<B, S>) -> Result<()> {
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    run_command_stream(app, &line_rx, &mut io::stdout())
}

/// Headless loop: executes each received command line, writes its reply, then
/// writes every controller event as one JSON object per line. Ends on `/quit`
/// or when the line source disconnects.
pub fn run_command_stream<B: MediaBackend, S: Scheduler, W: Write>(
    app: &mut App<B, S>,
    lines: &Receiver<String>,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", app.status_line())?;

    while app.running {
        loop {
            match lines.try_recv() {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => {
                    let reply = Command::parse_line(&line).and_then(|command| app.execute(command));
                    match reply {
                        Ok(reply) => writeln!(out, "{reply}")?,
                        Err(err) => writeln!(out, "error: {err}")?,
                    }
                    if !app.running {
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    app.execute(Command::Quit)?;
                    break;
                }
            }
        }
        write_events(out, app.take_events())?;
        if !app.running {
            break;
        }

        let events = app.wait_and_pump(IDLE_POLL);
        write_events(out, events)?;
        out.flush()?;
    }

    out.flush()?;
    Ok(())
}

fn write_events<W: Write>(out: &mut W, events: Vec<ControllerEvent>) -> Result<()> {
    for event in events {
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
    }
    Ok(())
}

fn init_tracing(config: &RuntimeConfig, options: &RunOptions) -> Result<()> {
    let default_filter = if options.debug {
        "nightride=debug"
    } else {
        "nightride=info"
    };
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into())
    };

    if options.headless {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(io::stderr)
            .try_init();
        return Ok(());
    }

    // The terminal belongs to the TUI, so logs go to a file.
    if let Some(parent) = config.log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory: {}", parent.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("failed to open log file: {}", config.log_file.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
