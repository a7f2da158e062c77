//! Reconciliation loop for mock CN instances.
//!
//! The registry keeps exactly one running [`NodeAgent`] per entry of the
//! watched root directory. A pass lists the root, diffs it against the
//! running set and starts or stops agents accordingly.
//!
//! Passes run:
//! - once at startup
//! - whenever the filesystem watcher reports a change under the root
//! - on a periodic fallback timer, in case a notification was missed
//!
//! Watcher events are coalesced through a capacity-1 channel: if a resync
//! is already pending, further events are dropped.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mockcn_reconcile::ReconcilePlan;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::agent::{AgentFactory, AgentSpec, NodeAgent};
use crate::config::Config;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Owner of all running mock CN agents.
pub struct NodeInstanceRegistry<F: AgentFactory> {
    /// Watched root; one entry per mock CN.
    root: PathBuf,

    /// Directory for agent startup markers.
    tmp_dir: PathBuf,

    /// Starts new agents.
    factory: F,

    /// Running agents by entry name.
    instances: BTreeMap<String, Box<dyn NodeAgent>>,
}

impl<F: AgentFactory> NodeInstanceRegistry<F> {
    /// Create an empty registry.
    pub fn new(root: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>, factory: F) -> Self {
        Self {
            root: root.into(),
            tmp_dir: tmp_dir.into(),
            factory,
            instances: BTreeMap::new(),
        }
    }

    /// Create a registry for the configured root and temp directory.
    pub fn from_config(config: &Config, factory: F) -> Self {
        Self::new(config.mockcn_dir.clone(), config.tmp_dir.clone(), factory)
    }

    /// Entry names with a running agent, sorted.
    pub fn running(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    /// Number of running agents.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Run one reconciliation pass.
    ///
    /// On a listing error nothing is started or stopped.
    pub async fn reconcile(&mut self) -> Result<ReconcilePlan<String>, RegistryError> {
        let observed = self.list_entries().await?;
        let plan = ReconcilePlan::compute(self.instances.keys(), observed.iter());

        if plan.is_empty() {
            debug!(instances = self.instances.len(), "Instances converged");
            return Ok(plan);
        }

        for entry in &plan.to_start {
            let spec = AgentSpec::for_entry(&self.root, &self.tmp_dir, entry);
            info!(
                server_uuid = %entry,
                startup_file = %spec.startup_file.display(),
                "Starting mock CN"
            );
            let agent = self.factory.start(spec);
            self.instances.insert(entry.clone(), agent);
        }

        for entry in &plan.to_stop {
            if let Some(mut agent) = self.instances.remove(entry) {
                info!(server_uuid = %entry, "Stopping mock CN");
                agent.shutdown();
            }
        }

        info!(
            started = plan.to_start.len(),
            stopped = plan.to_stop.len(),
            instances = self.instances.len(),
            "Reconciled mock CN instances"
        );

        Ok(plan)
    }

    /// Stop every running agent.
    pub fn shutdown_all(&mut self) {
        for (entry, mut agent) in std::mem::take(&mut self.instances) {
            debug!(server_uuid = %entry, "Stopping mock CN");
            agent.shutdown();
        }
    }

    /// Run the reconciliation loop until shutdown.
    ///
    /// Every message on `trigger` requests a pass. The loop keeps running
    /// on the fallback timer if the trigger channel closes.
    pub async fn run(
        mut self,
        mut trigger: mpsc::Receiver<()>,
        resync_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            root = %self.root.display(),
            resync_interval_secs = resync_interval.as_secs(),
            "Starting instance registry"
        );

        // The first tick completes immediately: that is the startup pass.
        let mut resync = tokio::time::interval(resync_interval);
        let mut trigger_open = true;

        loop {
            tokio::select! {
                _ = resync.tick() => {
                    self.reconcile_logged().await;
                }
                msg = trigger.recv(), if trigger_open => {
                    match msg {
                        Some(()) => self.reconcile_logged().await,
                        None => {
                            warn!("Directory watcher stopped, relying on periodic resync");
                            trigger_open = false;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender can never signal again.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Instance registry shutting down");
                        break;
                    }
                }
            }
        }

        self.shutdown_all();
    }

    async fn reconcile_logged(&mut self) {
        if let Err(e) = self.reconcile().await {
            error!(error = %e, "Reconciliation failed");
        }
    }

    async fn list_entries(&self) -> Result<Vec<String>, RegistryError> {
        let list_err = |source| RegistryError::List {
            path: self.root.clone(),
            source,
        };

        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Root does not exist, no instances");
                return Ok(Vec::new());
            }
            Err(e) => return Err(list_err(e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(list_err)? {
            match entry.file_name().into_string() {
                Ok(name) => entries.push(name),
                Err(name) => warn!(entry = ?name, "Skipping non-UTF-8 entry"),
            }
        }
        Ok(entries)
    }
}

/// Watch `root` and turn change events into resync requests.
///
/// The returned watcher must be kept alive for events to flow.
pub fn spawn_watcher(root: &Path) -> notify::Result<(RecommendedWatcher, mpsc::Receiver<()>)> {
    let (tx, rx) = mpsc::channel(1);

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        match event {
            Ok(event) => debug!(kind = ?event.kind, "Watch event"),
            Err(e) => warn!(error = %e, "Watch error"),
        }
        // Full means a resync is already pending.
        let _ = tx.try_send(());
    })?;
    watcher.watch(root, RecursiveMode::NonRecursive)?;

    info!(root = %root.display(), "Watching for mock CN changes");
    Ok((watcher, rx))
}
