//! Mock compute node agents.
//!
//! Each mock CN is backed by one [`NodeAgent`]: a background task that plays
//! the node side of the registration protocol. The registry only needs to
//! start and stop agents, so the protocol itself sits behind
//! [`AgentFactory`]. [`UrAgent`] is the built-in implementation: it marks
//! its startup, then periodically re-reads the node's sysinfo and reports a
//! registration heartbeat until stopped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sysinfo file name inside a mock CN directory.
pub const SYSINFO_FILE: &str = "sysinfo.json";

/// Setup state file name inside a mock CN directory.
pub const SETUP_STATE_FILE: &str = "setup.json";

/// Everything an agent needs to run one mock CN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    /// Identity of the mock CN (its directory name).
    pub server_uuid: String,

    /// Inventory the agent reports.
    pub sysinfo_file: PathBuf,

    /// Setup state the agent reports.
    pub setup_state_file: PathBuf,

    /// Marker written when the agent starts.
    pub startup_file: PathBuf,
}

impl AgentSpec {
    /// Build the spec for directory entry `entry` under `root`.
    ///
    /// The startup file name carries a random suffix so a restarted agent
    /// never reuses its predecessor's marker.
    pub fn for_entry(root: &Path, tmp_dir: &Path, entry: &str) -> Self {
        let node_dir = root.join(entry);
        let suffix: u32 = rand::random();
        Self {
            server_uuid: entry.to_string(),
            sysinfo_file: node_dir.join(SYSINFO_FILE),
            setup_state_file: node_dir.join(SETUP_STATE_FILE),
            startup_file: tmp_dir.join(format!("{entry}.tmp-{suffix:x}")),
        }
    }
}

/// A running mock CN agent.
pub trait NodeAgent: Send + Sync {
    /// The mock CN this agent serves.
    fn server_uuid(&self) -> &str;

    /// Signal the agent to stop. Must return without waiting for it.
    fn shutdown(&mut self);
}

/// Starts agents for the registry.
pub trait AgentFactory: Send + Sync {
    /// Start an agent. Must return without waiting for startup to finish.
    fn start(&self, spec: AgentSpec) -> Box<dyn NodeAgent>;
}

// =============================================================================
// UrAgent
// =============================================================================

/// Factory for [`UrAgent`]s.
#[derive(Debug, Clone)]
pub struct UrAgentFactory {
    heartbeat_interval: Duration,
}

impl UrAgentFactory {
    /// Create a factory whose agents heartbeat every `heartbeat_interval`.
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self { heartbeat_interval }
    }
}

impl AgentFactory for UrAgentFactory {
    fn start(&self, spec: AgentSpec) -> Box<dyn NodeAgent> {
        Box::new(UrAgent::spawn(spec, self.heartbeat_interval))
    }
}

/// Built-in mock CN agent task.
pub struct UrAgent {
    spec: AgentSpec,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl UrAgent {
    /// Spawn the agent task on the current runtime.
    pub fn spawn(spec: AgentSpec, heartbeat_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_agent(spec.clone(), heartbeat_interval, shutdown_rx));
        Self {
            spec,
            shutdown_tx,
            task,
        }
    }

    /// Check if the agent task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl NodeAgent for UrAgent {
    fn server_uuid(&self) -> &str {
        &self.spec.server_uuid
    }

    fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run_agent(spec: AgentSpec, heartbeat_interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(
        server_uuid = %spec.server_uuid,
        sysinfo = %spec.sysinfo_file.display(),
        "[MOCK] Starting mock CN agent"
    );

    if let Err(e) = tokio::fs::write(&spec.startup_file, spec.server_uuid.as_bytes()).await {
        warn!(
            server_uuid = %spec.server_uuid,
            path = %spec.startup_file.display(),
            error = %e,
            "Failed to write startup file"
        );
    }

    let mut ticker = tokio::time::interval(heartbeat_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                heartbeat(&spec).await;
            }
            changed = shutdown.changed() => {
                // A dropped sender also means stop.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    match tokio::fs::remove_file(&spec.startup_file).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(
            server_uuid = %spec.server_uuid,
            error = %e,
            "Failed to remove startup file"
        ),
    }

    info!(server_uuid = %spec.server_uuid, "[MOCK] Mock CN agent stopped");
}

async fn heartbeat(spec: &AgentSpec) {
    match tokio::fs::read(&spec.sysinfo_file).await {
        Ok(data) => match serde_json::from_slice::<serde_json::Value>(&data) {
            Ok(sysinfo) => debug!(
                server_uuid = %spec.server_uuid,
                fields = sysinfo.as_object().map_or(0, |m| m.len()),
                "[MOCK] Registration heartbeat"
            ),
            Err(e) => warn!(
                server_uuid = %spec.server_uuid,
                error = %e,
                "Sysinfo is not valid JSON"
            ),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(server_uuid = %spec.server_uuid, "Sysinfo not written yet");
        }
        Err(e) => warn!(
            server_uuid = %spec.server_uuid,
            error = %e,
            "Failed to read sysinfo"
        ),
    }
}
