//! ExifTool-backed metadata gateway.
//!
//! Runs `exiftool -stay_open True -@ -` worker processes and feeds them one request at a time.
//! Lifecycle: Idle -> Running (first read spawns a worker) -> ShuttingDown -> Stopped.
//! A failed first spawn moves the gateway to Failed and every later read reports it. Once a
//! worker has run, a failed respawn only fails the read that needed it.
//!
//! Notes:
//! - At most `max_workers` processes run; readers beyond that wait on a condvar.
//! - Each worker's stdout/stderr are drained by reader threads into one channel so a read can
//!   be bounded with `recv_timeout`. A worker that times out is killed, never reused.
//! - Only one gateway may be live per process (see `LIVE`).

use serde::Deserialize;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::{MetadataError, MetadataRecord, MetadataSource};
use crate::date::CaptureDate;

static LIVE: AtomicBool = AtomicBool::new(false);

const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("another metadata gateway is already running in this process")]
    AlreadyLive,
}

/// Settings for `ExifToolGateway`.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// exiftool executable (name on PATH or absolute path)
    pub program: PathBuf,
    /// upper bound on concurrently running exiftool processes
    pub max_workers: usize,
    /// per-read deadline
    pub read_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from("exiftool"),
            max_workers: 1,
            read_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Failed(String),
    ShuttingDown,
    Stopped,
}

struct State {
    phase: Phase,
    idle: Vec<Worker>,
    spawned: usize,
    /// a worker has started at least once
    started: bool,
    capacity: usize,
    in_flight: usize,
}

/// Process-wide handle to exiftool. Dropping it shuts the workers down.
pub struct ExifToolGateway {
    options: GatewayOptions,
    state: Mutex<State>,
    changed: Condvar,
}

impl ExifToolGateway {
    /// Create the gateway. No process is started until the first `read`.
    pub fn new(options: GatewayOptions) -> Result<Self, GatewayError> {
        if LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GatewayError::AlreadyLive);
        }
        let capacity = options.max_workers.max(1);
        Ok(Self {
            options,
            state: Mutex::new(State {
                phase: Phase::Idle,
                idle: Vec::new(),
                spawned: 0,
                started: false,
                capacity,
                in_flight: 0,
            }),
            changed: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Take an idle worker, spawn a new one, or wait for one to come back.
    fn checkout(&self) -> Result<Worker, MetadataError> {
        let mut st = self.lock();
        loop {
            match &st.phase {
                Phase::Failed(msg) => return Err(MetadataError::Startup(msg.clone())),
                Phase::ShuttingDown | Phase::Stopped => return Err(MetadataError::Closed),
                Phase::Idle | Phase::Running => {}
            }

            if let Some(worker) = st.idle.pop() {
                st.in_flight += 1;
                return Ok(worker);
            }

            if st.spawned < st.capacity {
                // Reserve the slot, then spawn outside the lock.
                st.spawned += 1;
                st.in_flight += 1;
                drop(st);

                let spawned = Worker::spawn(&self.options.program);
                st = self.lock();
                match spawned {
                    Ok(worker) => {
                        st.started = true;
                        if st.phase == Phase::Idle {
                            st.phase = Phase::Running;
                        }
                        debug!(pid = worker.pid, workers = st.spawned, "exiftool worker started");
                        return Ok(worker);
                    }
                    Err(e) => {
                        st.spawned -= 1;
                        st.in_flight -= 1;
                        let msg = format!("{}: {}", self.options.program.display(), e);
                        self.changed.notify_all();
                        if st.spawned == 0 && !st.started {
                            st.phase = Phase::Failed(msg.clone());
                            return Err(MetadataError::Startup(msg));
                        }
                        if st.spawned == 0 {
                            // Earlier workers were killed after timeouts; the next read retries.
                            warn!(error = %msg, "could not restart exiftool worker");
                            return Err(MetadataError::Read(format!(
                                "could not restart exiftool: {msg}"
                            )));
                        }
                        // Other workers are alive; run with what we have.
                        warn!(error = %msg, workers = st.spawned, "could not start extra worker");
                        st.capacity = st.spawned;
                        continue;
                    }
                }
            }

            st = self.wait(st);
        }
    }

    /// Return a worker after a read. Broken workers are discarded.
    fn checkin(&self, worker: Worker, healthy: bool) {
        let mut st = self.lock();
        st.in_flight -= 1;
        if healthy {
            st.idle.push(worker);
            self.changed.notify_all();
            return;
        }
        st.spawned -= 1;
        self.changed.notify_all();
        drop(st);
        worker.kill();
    }
}

impl MetadataSource for ExifToolGateway {
    fn read(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        // Requests are newline-separated argfile lines.
        if path.as_os_str().to_string_lossy().contains(['\n', '\r']) {
            return Err(MetadataError::Read("file name contains a line break".into()));
        }
        let mut worker = self.checkout()?;
        let result = worker.request(path, self.options.read_timeout);
        let healthy = !matches!(result, Err(MetadataError::Timeout(_))) && !worker.broken;
        self.checkin(worker, healthy);
        result
    }

    fn shutdown(&self) {
        let mut st = self.lock();
        loop {
            let phase = st.phase.clone();
            match phase {
                Phase::Stopped => return,
                Phase::ShuttingDown => {
                    // Another caller is closing the workers; wait for it to finish.
                    st = self.wait(st);
                }
                Phase::Idle | Phase::Failed(_) if st.spawned == 0 => {
                    st.phase = Phase::Stopped;
                    self.changed.notify_all();
                    return;
                }
                _ => break,
            }
        }

        st.phase = Phase::ShuttingDown;
        self.changed.notify_all();
        while st.in_flight > 0 {
            st = self.wait(st);
        }
        let workers = std::mem::take(&mut st.idle);
        st.spawned = 0;
        drop(st);

        debug!(workers = workers.len(), "stopping exiftool workers");
        for worker in workers {
            worker.close(CLOSE_GRACE);
        }

        let mut st = self.lock();
        st.phase = Phase::Stopped;
        self.changed.notify_all();
    }
}

impl Drop for ExifToolGateway {
    fn drop(&mut self) {
        self.shutdown();
        LIVE.store(false, Ordering::Release);
    }
}

enum Line {
    Out(String),
    Err(String),
}

struct Worker {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<Line>,
    pid: u32,
    seq: u64,
    broken: bool,
}

impl Worker {
    fn spawn(program: &Path) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let pid = child.id();
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("exiftool stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("exiftool stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("exiftool stderr unavailable"))?;

        let (tx, rx) = mpsc::channel();
        pump(stdout, tx.clone(), Line::Out);
        pump(stderr, tx, Line::Err);

        Ok(Self {
            child,
            stdin,
            lines: rx,
            pid,
            seq: 0,
            broken: false,
        })
    }

    /// Send one request and wait for both the stdout and stderr markers.
    fn request(&mut self, path: &Path, timeout: Duration) -> Result<MetadataRecord, MetadataError> {
        self.seq += 1;
        let ready_out = format!("{{ready{}}}", self.seq);
        let ready_err = format!("{{ready-err{}}}", self.seq);

        let args = format!(
            "-json\n-DateTimeOriginal\n-charset\nfilename=utf8\n{}\n-echo4\n{}\n-execute{}\n",
            path.display(),
            ready_err,
            self.seq
        );
        if let Err(e) = self
            .stdin
            .write_all(args.as_bytes())
            .and_then(|_| self.stdin.flush())
        {
            self.broken = true;
            return Err(MetadataError::Read(format!("write to exiftool failed: {e}")));
        }
        trace!(pid = self.pid, seq = self.seq, file = %path.display(), "exiftool request sent");

        let deadline = Instant::now() + timeout;
        let mut stdout = String::new();
        let mut stderr = Vec::new();
        let (mut out_done, mut err_done) = (false, false);
        while !(out_done && err_done) {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(left) {
                Ok(Line::Out(line)) if line.trim() == ready_out => out_done = true,
                Ok(Line::Err(line)) if line.trim() == ready_err => err_done = true,
                Ok(Line::Out(line)) => {
                    stdout.push_str(&line);
                    stdout.push('\n');
                }
                Ok(Line::Err(line)) => stderr.push(line),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(pid = self.pid, file = %path.display(), "exiftool read timed out");
                    return Err(MetadataError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.broken = true;
                    return Err(MetadataError::Read("exiftool exited unexpectedly".into()));
                }
            }
        }

        parse_response(&stdout, &stderr)
    }

    /// Ask exiftool to exit; kill it if it does not within `grace`.
    fn close(mut self, grace: Duration) {
        let _ = self
            .stdin
            .write_all(b"-stay_open\nFalse\n")
            .and_then(|_| self.stdin.flush());
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    trace!(pid = self.pid, %status, "exiftool exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(25)),
                _ => break,
            }
        }
        warn!(pid = self.pid, "exiftool did not exit in time; killing");
        self.kill();
    }

    fn kill(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Forward every line of `reader` into `tx` until EOF.
fn pump<R>(reader: R, tx: Sender<Line>, wrap: fn(String) -> Line)
where
    R: io::Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    });
}

#[derive(Debug, Deserialize)]
struct Tags {
    #[serde(rename = "DateTimeOriginal")]
    date_time_original: Option<serde_json::Value>,
    #[serde(rename = "Warning")]
    warning: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// Turn one exiftool `-json` response (plus stderr lines) into a record.
fn parse_response(stdout: &str, stderr: &[String]) -> Result<MetadataRecord, MetadataError> {
    let mut warnings: Vec<String> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    for line in stderr.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if let Some(w) = line.strip_prefix("Warning:") {
            warnings.push(w.trim().to_string());
        } else {
            errors.push(line.strip_prefix("Error:").unwrap_or(line).trim().to_string());
        }
    }

    if stdout.trim().is_empty() {
        let msg = if errors.is_empty() {
            "exiftool returned no output".to_string()
        } else {
            errors.join("; ")
        };
        return Err(MetadataError::Read(msg));
    }

    let parsed: Vec<Tags> = serde_json::from_str(stdout)
        .map_err(|e| MetadataError::Read(format!("invalid exiftool JSON: {e}")))?;
    let tags = parsed
        .into_iter()
        .next()
        .ok_or_else(|| MetadataError::Read("exiftool returned an empty result".into()))?;

    if let Some(err) = tags.error {
        return Err(MetadataError::Read(err));
    }
    if let Some(w) = tags.warning {
        warnings.push(w);
    }

    let capture_date = match tags.date_time_original {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(CaptureDate::from_exif(&s).ok_or_else(|| {
            MetadataError::Read(format!("invalid DateTimeOriginal value '{s}'"))
        })?),
        Some(other) => {
            return Err(MetadataError::Read(format!(
                "invalid DateTimeOriginal value '{other}'"
            )));
        }
    };

    Ok(MetadataRecord {
        capture_date,
        warnings,
    })
}
