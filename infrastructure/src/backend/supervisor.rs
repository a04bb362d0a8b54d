//! Backend process supervisor.
//!
//! Owns the lifecycle of subprocess backends that speak newline-delimited
//! JSON-RPC over stdin/stdout. Per backend name the state machine is
//!
//! ```text
//! Absent → Starting → Ready ⇄ Busy → Failed → Absent
//! ```
//!
//! - **Absent → Starting**: first call for a name spawns the configured
//!   command (cwd + env applied), then waits a brief warm-up before use.
//! - **Ready → Busy**: one request is written as a single JSON line and
//!   one response line is read back under a timeout. Exactly one request
//!   is in flight per process; the per-name lock serializes concurrent
//!   callers so pipe reads and writes never interleave.
//! - **Busy → Failed**: a response timeout, an empty read (stream
//!   closed), or a parse failure kills the child and clears its slot. The
//!   current call reports the failure; the next call re-enters Starting.
//!
//! The slot table is never exposed; callers get [`call`](ProcessSupervisor::call)
//! and [`invalidate`](ProcessSupervisor::invalidate) only, so lifecycle
//! transitions stay atomic.

use crate::backend::error::{BackendError, Result};
use crate::backend::protocol::{JsonRpcRequest, JsonRpcResponse};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How a subprocess backend is launched.
#[derive(Debug, Clone)]
pub struct BackendCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, so the backend's module resolution works.
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl BackendCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// A live backend subprocess with its pipes.
struct BackendProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    last_healthy: Instant,
}

impl BackendProcess {
    /// Whether the child has exited since the last call.
    fn is_dead(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    fn kill(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Slot for one backend name. `None` while Absent/Failed.
type Slot = Option<BackendProcess>;

/// Supervisor for subprocess backends.
///
/// The outer table maps backend name → per-name slot; the table lock is
/// held only for slot lookup/insertion, while the per-name `tokio::Mutex`
/// is held for the whole call so requests to one backend are strictly
/// sequential.
pub struct ProcessSupervisor {
    commands: HashMap<String, BackendCommand>,
    slots: StdMutex<HashMap<String, Arc<Mutex<Slot>>>>,
    request_timeout: Duration,
    warmup: Duration,
}

impl ProcessSupervisor {
    pub fn new(commands: HashMap<String, BackendCommand>) -> Self {
        Self {
            commands,
            slots: StdMutex::new(HashMap::new()),
            request_timeout: Duration::from_secs(45),
            warmup: Duration::from_millis(300),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Names this supervisor can spawn.
    pub fn backend_names(&self) -> Vec<&str> {
        self.commands.keys().map(|s| s.as_str()).collect()
    }

    /// Send one request to `name` and read one response.
    ///
    /// Spawns the backend lazily on first use and respawns it after any
    /// failure. Concurrent calls for the same name queue on the per-name
    /// lock.
    pub async fn call(&self, name: &str, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let slot_arc = self.slot(name)?;
        let mut slot = slot_arc.lock().await;

        // A child that exited between calls is useless; respawn.
        if let Some(process) = slot.as_mut()
            && process.is_dead()
        {
            debug!(
                backend = name,
                idle_ms = process.last_healthy.elapsed().as_millis() as u64,
                "backend exited since last call, respawning"
            );
            *slot = None;
        }

        if slot.is_none() {
            *slot = Some(self.spawn(name).await?);
            tokio::time::sleep(self.warmup).await;
        }

        let Some(process) = slot.as_mut() else {
            return Err(BackendError::PipeClosed);
        };

        match Self::exchange(process, request, self.request_timeout).await {
            Ok(response) => {
                process.last_healthy = Instant::now();
                Ok(response)
            }
            Err(e) => {
                // Failed: the handle must never survive in the table.
                warn!(backend = name, error = %e, "backend call failed, discarding process");
                process.kill();
                *slot = None;
                Err(e)
            }
        }
    }

    /// Kill and forget the process for `name`, if any. The next call
    /// respawns it.
    pub async fn invalidate(&self, name: &str) {
        let slot_arc = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.get(name).cloned()
        };
        if let Some(slot_arc) = slot_arc {
            let mut slot = slot_arc.lock().await;
            if let Some(mut process) = slot.take() {
                info!(backend = name, "invalidating backend process");
                process.kill();
            }
        }
    }

    /// Write one request line, flush, read one response line under the
    /// timeout.
    async fn exchange(
        process: &mut BackendProcess,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> Result<JsonRpcResponse> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        process.stdin.write_all(line.as_bytes()).await?;
        process.stdin.flush().await?;

        let mut response_line = String::new();
        let read = tokio::time::timeout(timeout, process.stdout.read_line(&mut response_line))
            .await
            .map_err(|_| BackendError::Timeout)??;
        if read == 0 {
            return Err(BackendError::PipeClosed);
        }

        serde_json::from_str(response_line.trim()).map_err(|e| BackendError::ParseError {
            error: e.to_string(),
            raw: response_line.trim().to_string(),
        })
    }

    /// The per-name slot, created on first reference.
    fn slot(&self, name: &str) -> Result<Arc<Mutex<Slot>>> {
        if !self.commands.contains_key(name) {
            return Err(BackendError::NoRoute(name.to_string()));
        }
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(
            slots
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(None))),
        ))
    }

    /// Absent → Starting: spawn the configured command with piped stdio.
    async fn spawn(&self, name: &str) -> Result<BackendProcess> {
        let Some(spec) = self.commands.get(name) else {
            return Err(BackendError::NoRoute(name.to_string()));
        };

        debug!(backend = name, program = %spec.program, "spawning backend");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        // Linux: request kernel to send SIGTERM to the backend when the
        // broker dies. Catches cases where Drop doesn't run (SIGKILL, OOM).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::Io(std::io::Error::other("failed to capture stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Io(std::io::Error::other("failed to capture stdout")))?;

        info!(backend = name, "backend process started");

        Ok(BackendProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            last_healthy: Instant::now(),
        })
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        // Children were spawned with kill_on_drop; reap eagerly where the
        // slot lock is free.
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        for slot_arc in slots.values() {
            if let Ok(mut slot) = slot_arc.try_lock()
                && let Some(process) = slot.as_mut()
            {
                process.kill();
            }
        }
    }
}
