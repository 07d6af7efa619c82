//! Content API process supervisor.
//!
//! At most one child is held at a time. The child itself is owned by a
//! monitor task that waits on it and takes terminate/kill commands over a
//! channel; the supervisor keeps the control end in a slot guarded by a
//! single async mutex. Every handle carries a generation, and events for a
//! generation other than the held one are ignored, so a late exit of an old
//! child never clears a newer handle.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::probe::ReadinessProbe;
use crate::reaper::PortReaper;

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_REAP_PAUSE: Duration = Duration::from_secs(1);

/// Lifecycle state of the supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Transition inputs, each tagged with the generation it concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Spawned { generation: u64, pid: Option<u32> },
    ReadySignalObserved { generation: u64 },
    Exited { generation: u64 },
    KillTimeoutElapsed { generation: u64 },
}

impl Event {
    const fn generation(self) -> u64 {
        match self {
            Self::Spawned { generation, .. }
            | Self::ReadySignalObserved { generation }
            | Self::Exited { generation }
            | Self::KillTimeoutElapsed { generation } => generation,
        }
    }
}

/// How to launch the Content API.
#[derive(Debug, Clone)]
pub struct ChildCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl ChildCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Supervisor settings.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub command: ChildCommand,
    /// Port the Content API binds; reaped before spawning.
    pub port: u16,
    pub startup_timeout: Duration,
    /// Time between SIGTERM and a forced kill.
    pub stop_grace: Duration,
    pub probe_interval: Duration,
    /// Pause after reaping so the port is released.
    pub reap_pause: Duration,
}

impl SupervisorConfig {
    pub const fn new(command: ChildCommand, port: u16) -> Self {
        Self {
            command,
            port,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            stop_grace: DEFAULT_STOP_GRACE,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            reap_pause: DEFAULT_REAP_PAUSE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: Option<u32> },
    /// A child was already held; nothing was spawned.
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The held child was stopped, `forced` if the grace period ran out.
    Stopped { forced: bool },
    /// No child was held; this many strays on the port were killed.
    Reaped(usize),
}

/// Point-in-time view of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: State,
    pub pid: Option<u32>,
    pub has_process: bool,
}

/// Errors from starting the Content API.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn Content API: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Content API did not become ready within {0:?}")]
    StartupTimeout(Duration),

    #[error("Content API exited during startup")]
    ExitedDuringStartup,
}

enum Control {
    Terminate,
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready,
    Exited,
}

struct Handle {
    generation: u64,
    pid: Option<u32>,
    control: mpsc::UnboundedSender<Control>,
    exited: watch::Receiver<bool>,
}

struct Slot {
    state: State,
    handle: Option<Handle>,
    next_generation: u64,
}

impl Slot {
    const fn new() -> Self {
        Self {
            state: State::Idle,
            handle: None,
            next_generation: 1,
        }
    }

    fn generation(&self) -> Option<u64> {
        self.handle.as_ref().map(|h| h.generation)
    }

    /// Apply `event`; returns false when it belongs to a handle no longer held.
    fn apply(&mut self, event: Event) -> bool {
        if self.generation() != Some(event.generation()) {
            debug!(?event, current = ?self.generation(), "Ignoring stale supervisor event");
            return false;
        }
        match event {
            Event::Spawned { .. } => self.state = State::Starting,
            Event::ReadySignalObserved { .. } => {
                if self.state == State::Starting {
                    self.state = State::Running;
                }
            }
            Event::Exited { .. } => self.release(event.generation()),
            Event::KillTimeoutElapsed { .. } => {}
        }
        true
    }

    fn release(&mut self, generation: u64) {
        if self.generation() == Some(generation) {
            self.handle = None;
            self.state = State::Idle;
        }
    }
}

/// Owns the Content API child process.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    probe: Arc<dyn ReadinessProbe>,
    reaper: Arc<dyn PortReaper>,
    slot: Arc<Mutex<Slot>>,
}

impl ProcessSupervisor {
    pub fn new(
        config: SupervisorConfig,
        probe: Arc<dyn ReadinessProbe>,
        reaper: Arc<dyn PortReaper>,
    ) -> Self {
        Self {
            config,
            probe,
            reaper,
            slot: Arc::new(Mutex::new(Slot::new())),
        }
    }

    /// Spawn the Content API unless a child is already held, then wait for
    /// it to answer the probe.
    ///
    /// On [`SupervisorError::StartupTimeout`] the child is left running and
    /// may still turn `Running` later.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn start(&self) -> Result<StartOutcome, SupervisorError> {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = &slot.handle {
            info!(pid = handle.pid, "Content API already managed, not spawning");
            return Ok(StartOutcome::AlreadyRunning);
        }

        if self.reap_port().await > 0 {
            tokio::time::sleep(self.config.reap_pause).await;
        }

        let mut child = self.config.command.build().spawn().map_err(|e| {
            error!(program = %self.config.command.program.display(), error = %e, "Failed to spawn Content API");
            SupervisorError::Spawn(e)
        })?;
        let pid = child.id();
        relay_output(&mut child, pid);

        let generation = slot.next_generation;
        slot.next_generation += 1;
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = watch::channel(false);
        slot.handle = Some(Handle {
            generation,
            pid,
            control: control_tx,
            exited: exited_rx.clone(),
        });
        slot.apply(Event::Spawned { generation, pid });
        drop(slot);

        info!(pid, generation, port = self.config.port, "Content API spawned, waiting for readiness");
        tokio::spawn(monitor(
            child,
            generation,
            control_rx,
            Arc::clone(&self.slot),
            exited_tx,
        ));

        let (ready_tx, mut ready_rx) = watch::channel(Readiness::Pending);
        tokio::spawn(watch_readiness(
            Arc::clone(&self.probe),
            Arc::clone(&self.slot),
            generation,
            exited_rx,
            self.config.probe_interval,
            ready_tx,
        ));

        let waited = tokio::time::timeout(self.config.startup_timeout, async {
            ready_rx
                .wait_for(|r| *r != Readiness::Pending)
                .await
                .map(|r| *r)
        })
        .await;

        match waited {
            Ok(Ok(Readiness::Ready)) => {
                info!(pid, generation, "Content API is ready");
                Ok(StartOutcome::Started { pid })
            }
            Ok(_) => {
                warn!(pid, generation, "Content API exited before becoming ready");
                Err(SupervisorError::ExitedDuringStartup)
            }
            Err(_) => {
                warn!(
                    pid,
                    generation,
                    timeout = ?self.config.startup_timeout,
                    "Content API not ready in time, leaving it running"
                );
                Err(SupervisorError::StartupTimeout(self.config.startup_timeout))
            }
        }
    }

    /// Stop the held child, or reap strays on the port when none is held.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn stop(&self) -> StopOutcome {
        let mut slot = self.slot.lock().await;
        let Some(handle) = slot.handle.as_ref() else {
            let killed = self.reap_port().await;
            if killed > 0 {
                tokio::time::sleep(self.config.reap_pause).await;
            }
            return StopOutcome::Reaped(killed);
        };

        let generation = handle.generation;
        let pid = handle.pid;
        let control = handle.control.clone();
        let mut exited = handle.exited.clone();
        slot.state = State::Stopping;
        drop(slot);

        info!(pid, generation, "Stopping Content API");
        let _ = control.send(Control::Terminate);

        let graceful = tokio::time::timeout(self.config.stop_grace, async {
            let _ = exited.wait_for(|done| *done).await;
        })
        .await;
        let forced = if graceful.is_ok() {
            false
        } else {
            self.slot
                .lock()
                .await
                .apply(Event::KillTimeoutElapsed { generation });
            warn!(pid, grace = ?self.config.stop_grace, "Content API ignored SIGTERM, killing");
            let _ = control.send(Control::Kill);
            true
        };

        self.slot.lock().await.release(generation);
        info!(pid, generation, forced, "Content API stopped");
        StopOutcome::Stopped { forced }
    }

    pub async fn snapshot(&self) -> Snapshot {
        let slot = self.slot.lock().await;
        Snapshot {
            state: slot.state,
            pid: slot.handle.as_ref().and_then(|h| h.pid),
            has_process: slot.handle.is_some(),
        }
    }

    pub async fn has_process(&self) -> bool {
        self.slot.lock().await.handle.is_some()
    }

    /// Whether the Content API answers, regardless of who started it.
    pub async fn is_live(&self) -> bool {
        self.probe.is_live().await
    }

    async fn reap_port(&self) -> usize {
        match self.reaper.reap(self.config.port).await {
            Ok(killed) => killed,
            Err(e) => {
                warn!(port = self.config.port, error = %e, "Port reap failed");
                0
            }
        }
    }
}

/// Relay child output into the controller log.
fn relay_output(child: &mut Child, pid: Option<u32>) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(pid, "{}", line);
            }
            debug!(pid, "stdout reader finished");
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(pid, "{}", line);
            }
            debug!(pid, "stderr reader finished");
        });
    }
}

/// Wait on the child, forwarding control commands, and publish its exit.
async fn monitor(
    mut child: Child,
    generation: u64,
    mut control: mpsc::UnboundedReceiver<Control>,
    slot: Arc<Mutex<Slot>>,
    exited: watch::Sender<bool>,
) {
    let pid = child.id();
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(cmd) = control.recv() => match cmd {
                Control::Terminate => terminate(&mut child),
                Control::Kill => {
                    if let Err(e) = child.start_kill() {
                        warn!(pid, error = %e, "Failed to kill Content API");
                    }
                }
            },
        }
    };

    match status {
        Ok(status) => info!(pid, generation, %status, "Content API exited"),
        Err(e) => error!(pid, generation, error = %e, "Failed waiting on Content API"),
    }
    slot.lock().await.apply(Event::Exited { generation });
    exited.send_replace(true);
}

/// Poll the probe until the child answers or exits.
async fn watch_readiness(
    probe: Arc<dyn ReadinessProbe>,
    slot: Arc<Mutex<Slot>>,
    generation: u64,
    mut exited: watch::Receiver<bool>,
    interval: Duration,
    ready: watch::Sender<Readiness>,
) {
    loop {
        if *exited.borrow() {
            ready.send_replace(Readiness::Exited);
            return;
        }
        if probe.is_live().await {
            let held = slot
                .lock()
                .await
                .apply(Event::ReadySignalObserved { generation });
            ready.send_replace(if held {
                Readiness::Ready
            } else {
                Readiness::Exited
            });
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = exited.changed() => {
                if changed.is_err() {
                    ready.send_replace(Readiness::Exited);
                    return;
                }
            }
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    let Some(pid) = child.id().and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // SAFETY: pid is a valid process ID obtained from our own Child handle.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::kill(pid, libc::SIGTERM) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        warn!(pid, error = %err, "Failed to send SIGTERM");
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(pid = child.id(), error = %e, "Failed to terminate Content API");
    }
}
