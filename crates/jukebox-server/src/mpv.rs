//! mpv audio sink over the JSON IPC socket.
//!
//! Each call opens a short-lived connection to `--input-ipc-server`, sends one
//! or more commands, and reads replies by `request_id`, skipping event lines.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};

use crate::audio_sink::{AudioSink, SinkError, SinkState};

/// How long a freshly loaded file may report idle before it counts as ended.
const LOAD_GRACE: Duration = Duration::from_secs(10);

/// What the sink last did with media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadPhase {
    /// Nothing loaded, or explicitly stopped.
    Unloaded,
    /// `loadfile` accepted at this instant; playback not yet observed.
    Pending(Instant),
    /// mpv has been seen with media active.
    Active,
}

/// Map mpv properties onto sink states.
pub(crate) fn classify(idle: bool, paused: bool, phase: LoadPhase, now: Instant) -> SinkState {
    match (idle, phase) {
        (true, LoadPhase::Unloaded) => SinkState::Idle,
        (true, LoadPhase::Active) => SinkState::Ended,
        (true, LoadPhase::Pending(since)) if now.duration_since(since) >= LOAD_GRACE => {
            SinkState::Ended
        }
        (true, LoadPhase::Pending(_)) => SinkState::Paused,
        (false, _) if paused => SinkState::Paused,
        (false, _) => SinkState::Playing,
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    request_id: Option<u64>,
    error: Option<String>,
    #[serde(default)]
    data: Value,
    event: Option<String>,
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn open(path: &Path) -> Result<Self, SinkError> {
        let stream = UnixStream::connect(path).await.map_err(SinkError::Connect)?;
        let (read, write) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer: write,
        })
    }

    async fn request(&mut self, request_id: u64, command: Value) -> Result<Value, SinkError> {
        let mut line = json!({ "command": command, "request_id": request_id }).to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf).await? == 0 {
                return Err(SinkError::Disconnected);
            }
            let reply: Reply = serde_json::from_str(buf.trim())
                .map_err(|err| SinkError::Protocol(format!("{err}: {}", buf.trim())))?;
            if reply.event.is_some() || reply.request_id != Some(request_id) {
                continue;
            }
            return match reply.error.as_deref() {
                Some("success") => Ok(reply.data),
                Some(other) => Err(SinkError::Rejected(other.to_string())),
                None => Err(SinkError::Protocol("reply without status".to_string())),
            };
        }
    }
}

/// Audio sink driving an `mpv --idle` process.
pub struct MpvSink {
    socket_path: PathBuf,
    next_request: AtomicU64,
    phase: Mutex<LoadPhase>,
}

impl MpvSink {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            next_request: AtomicU64::new(1),
            phase: Mutex::new(LoadPhase::Unloaded),
        }
    }

    fn request_id(&self) -> u64 {
        self.next_request.fetch_add(1, Ordering::Relaxed)
    }

    fn phase(&self) -> LoadPhase {
        *self.phase.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn set_phase(&self, phase: LoadPhase) {
        *self.phase.lock().unwrap_or_else(|err| err.into_inner()) = phase;
    }

    async fn command(&self, command: Value) -> Result<Value, SinkError> {
        let mut conn = Connection::open(&self.socket_path).await?;
        conn.request(self.request_id(), command).await
    }

    async fn bool_property(&self, conn: &mut Connection, name: &str) -> Result<bool, SinkError> {
        let value = conn
            .request(self.request_id(), json!(["get_property", name]))
            .await?;
        value
            .as_bool()
            .ok_or_else(|| SinkError::Protocol(format!("{name} is not a boolean: {value}")))
    }
}

#[async_trait]
impl AudioSink for MpvSink {
    async fn load(&self, url: &str) -> Result<(), SinkError> {
        self.command(json!(["loadfile", url, "replace"])).await?;
        self.set_phase(LoadPhase::Pending(Instant::now()));
        Ok(())
    }

    async fn play(&self) -> Result<(), SinkError> {
        self.command(json!(["set_property", "pause", false])).await?;
        Ok(())
    }

    async fn pause(&self) -> Result<(), SinkError> {
        self.command(json!(["set_property", "pause", true])).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), SinkError> {
        self.set_phase(LoadPhase::Unloaded);
        self.command(json!(["stop"])).await?;
        Ok(())
    }

    async fn set_volume(&self, level: u8) -> Result<(), SinkError> {
        self.command(json!(["set_property", "volume", level.min(100)]))
            .await?;
        Ok(())
    }

    async fn state(&self) -> Result<SinkState, SinkError> {
        let mut conn = Connection::open(&self.socket_path).await?;
        let idle = self.bool_property(&mut conn, "idle-active").await?;
        let paused = self.bool_property(&mut conn, "pause").await?;
        let phase = self.phase();
        if !idle && matches!(phase, LoadPhase::Pending(_)) {
            self.set_phase(LoadPhase::Active);
        }
        Ok(classify(idle, paused, phase, Instant::now()))
    }
}

/// Settings for launching a private mpv instance.
#[derive(Debug, Clone)]
pub struct MpvSpawn {
    pub binary: PathBuf,
    pub socket_path: PathBuf,
    pub startup_timeout: Duration,
}

/// Launch `mpv --idle` with an IPC socket and wait until it accepts connections.
///
/// The child is killed when the returned handle is dropped.
pub async fn spawn_mpv(spawn: &MpvSpawn) -> Result<Child> {
    let mut ipc_arg = std::ffi::OsString::from("--input-ipc-server=");
    ipc_arg.push(&spawn.socket_path);
    let child = Command::new(&spawn.binary)
        .args(["--idle=yes", "--no-video", "--no-terminal", "--keep-open=no"])
        .arg(ipc_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawn {}", spawn.binary.display()))?;

    let deadline = Instant::now() + spawn.startup_timeout;
    loop {
        if UnixStream::connect(&spawn.socket_path).await.is_ok() {
            tracing::info!(socket = %spawn.socket_path.display(), "mpv ready");
            return Ok(child);
        }
        if Instant::now() >= deadline {
            anyhow::bail!(
                "mpv did not open {} within {:?}",
                spawn.socket_path.display(),
                spawn.startup_timeout
            );
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
