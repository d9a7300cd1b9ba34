use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::playback::{volume_to_vlc_scale, BackendEvent, BackendHandle, MediaBackend};
use crate::error::BackendError;

const SHUTDOWN_WAIT: Duration = Duration::from_millis(500);
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);
const RC_ARGS: [&str; 6] = [
    "--intf",
    "rc",
    "--rc-fake-tty",
    "--no-video",
    "--play-and-exit",
    "--quiet",
];

/// Drives one `cvlc` child process per backend handle over VLC's RC interface.
///
/// Stream errors and ICY metadata are read from the child's stdout on a helper
/// thread and forwarded as [`BackendEvent`]s.
pub struct VlcBackend {
    program: String,
    metadata_poll: Duration,
    events: Sender<BackendEvent>,
    next_id: u64,
    sessions: HashMap<BackendHandle, VlcSession>,
}

struct VlcSession {
    child: Child,
    stdin: Arc<Mutex<ChildStdin>>,
    uri: Option<String>,
    stopping: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    poller: Option<(Sender<()>, JoinHandle<()>)>,
}

impl VlcBackend {
    pub fn new(events: Sender<BackendEvent>) -> Self {
        Self::new_with_program("cvlc", Duration::from_secs(5), events)
    }

    pub fn new_with_program(
        program: impl Into<String>,
        metadata_poll: Duration,
        events: Sender<BackendEvent>,
    ) -> Self {
        Self {
            program: program.into(),
            metadata_poll,
            events,
            next_id: 0,
            sessions: HashMap::new(),
        }
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn spawn(&self) -> Result<Child, BackendError> {
        Command::new(&self.program)
            .args(RC_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    BackendError::Unavailable(format!(
                        "'{}' not found on PATH; install VLC (e.g. apt install vlc)",
                        self.program
                    ))
                } else {
                    BackendError::Unavailable(format!(
                        "failed to start '{} {}': {err}",
                        self.program,
                        RC_ARGS.join(" ")
                    ))
                }
            })
    }

    fn session(&mut self, handle: BackendHandle) -> Result<&mut VlcSession, BackendError> {
        self.sessions.get_mut(&handle).ok_or_else(|| {
            BackendError::Unavailable(format!("backend handle {handle} is not live"))
        })
    }

    fn validate_stream_url(url: &str) -> Result<&str, BackendError> {
        if url.is_empty() || url.trim() != url || url.chars().any(|ch| ch.is_ascii_control()) {
            return Err(BackendError::Unavailable(
                "invalid stream URL characters detected; remove control characters and leading/trailing whitespace"
                    .to_string(),
            ));
        }
        Ok(url)
    }
}

impl MediaBackend for VlcBackend {
    fn create(&mut self) -> Result<BackendHandle, BackendError> {
        let mut child = self.spawn()?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackendError::Unavailable(
                    "failed to capture VLC stdio for RC commands".to_string(),
                ));
            }
        };

        self.next_id += 1;
        let handle = BackendHandle(self.next_id);
        let stopping = Arc::new(AtomicBool::new(false));
        let reader = spawn_reader(handle, stdout, stopping.clone(), self.events.clone());

        self.sessions.insert(
            handle,
            VlcSession {
                child,
                stdin: Arc::new(Mutex::new(stdin)),
                uri: None,
                stopping,
                reader: Some(reader),
                poller: None,
            },
        );
        debug!(%handle, program = %self.program, "vlc process spawned");
        Ok(handle)
    }

    fn set_uri(&mut self, handle: BackendHandle, uri: &str) -> Result<(), BackendError> {
        let validated = Self::validate_stream_url(uri)?;
        self.session(handle)?.uri = Some(validated.to_string());
        Ok(())
    }

    fn set_volume(&mut self, handle: BackendHandle, volume: f64) -> Result<(), BackendError> {
        let session = self.session(handle)?;
        send_command(&session.stdin, &format!("volume {}", volume_to_vlc_scale(volume)))
    }

    fn start(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        let poll = self.metadata_poll;
        let session = self.session(handle)?;
        let uri = session.uri.clone().ok_or_else(|| {
            BackendError::Unavailable(format!("no stream URI set on backend handle {handle}"))
        })?;
        send_command(&session.stdin, &format!("add {uri}"))?;

        if session.poller.is_none() {
            let (stop_tx, stop_rx) = mpsc::channel::<()>();
            let stdin = session.stdin.clone();
            let poller = thread::spawn(move || loop {
                match stop_rx.recv_timeout(poll) {
                    Err(RecvTimeoutError::Timeout) => {
                        if send_command(&stdin, "info").is_err() {
                            break;
                        }
                    }
                    _ => break,
                }
            });
            session.poller = Some((stop_tx, poller));
        }
        Ok(())
    }

    fn stop(&mut self, handle: BackendHandle) {
        let Some(mut session) = self.sessions.remove(&handle) else {
            return;
        };
        session.stopping.store(true, Ordering::SeqCst);

        if let Some((stop_tx, poller)) = session.poller.take() {
            drop(stop_tx);
            let _ = poller.join();
        }

        let _ = send_command(&session.stdin, "quit");
        let deadline = Instant::now() + SHUTDOWN_WAIT;
        loop {
            match session.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(SHUTDOWN_POLL),
                Ok(None) | Err(_) => {
                    if let Err(err) = session.child.kill() {
                        warn!(%handle, error = %err, "failed to force-kill VLC process");
                    }
                    let _ = session.child.wait();
                    break;
                }
            }
        }

        if let Some(reader) = session.reader.take() {
            let _ = reader.join();
        }
        debug!(%handle, "vlc process released");
    }
}

impl Drop for VlcBackend {
    fn drop(&mut self) {
        let handles: Vec<BackendHandle> = self.sessions.keys().copied().collect();
        for handle in handles {
            self.stop(handle);
        }
    }
}

fn send_command(stdin: &Mutex<ChildStdin>, command: &str) -> Result<(), BackendError> {
    let mut stdin = stdin
        .lock()
        .map_err(|_| BackendError::Unavailable("VLC command channel poisoned".to_string()))?;
    stdin.write_all(format!("{command}\n").as_bytes())?;
    stdin.flush()?;
    Ok(())
}

fn spawn_reader(
    handle: BackendHandle,
    stdout: ChildStdout,
    stopping: Arc<AtomicBool>,
    events: Sender<BackendEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut failed = false;
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            match parse_rc_line(&line) {
                Some(RcLine::Meta { field, value }) => {
                    let _ = events.send(BackendEvent::tag(handle, field, value));
                }
                Some(RcLine::Stopped) if !stopping.load(Ordering::SeqCst) && !failed => {
                    failed = true;
                    let _ = events.send(BackendEvent::error(handle, "stream stopped"));
                }
                _ => {}
            }
        }
        if !stopping.load(Ordering::SeqCst) && !failed {
            let _ = events.send(BackendEvent::error(handle, "player process exited"));
        }
    })
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine {
    Meta { field: &'static str, value: String },
    Stopped,
}

/// Interprets one line of RC output. `info` answers carry `| key: value` rows.
fn parse_rc_line(line: &str) -> Option<RcLine> {
    let mut line = line.trim();
    while let Some(rest) = line.strip_prefix('>') {
        line = rest.trim_start();
    }

    if line.contains("( stop state:") || line.contains("end of playlist") {
        return Some(RcLine::Stopped);
    }

    let (key, value) = line.strip_prefix('|')?.split_once(':')?;
    let field = match key.trim() {
        "now_playing" => "title",
        "genre" => "genre",
        "icy-name" | "Station" => "station",
        _ => return None,
    };
    Some(RcLine::Meta {
        field,
        value: value.trim().to_string(),
    })
}
