//! Host metadata used to seed inventory defaults.
//!
//! Two sources are consulted:
//! - the zone metadata service (`mdata-get <key>`), for the datacenter name
//!   and the mock OUI prefix
//! - the OS version string (`uname -v`), for the platform build stamp
//!
//! Both are best-effort: every failure is an [`EnrichmentError`] that the
//! caller logs and absorbs. A [`StaticMetadata`] source is provided for
//! development hosts and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;

/// Metadata key holding the datacenter name.
pub const DATACENTER_NAME_KEY: &str = "sdc:datacenter_name";

/// Metadata key holding the OUI shared by this host's mock CNs.
pub const MOCK_OUI_KEY: &str = "mock_oui";

/// Failures fetching best-effort enrichment data.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("{command} produced no output")]
    EmptyOutput { command: String },

    #[error("version string {0:?} has no build stamp segment")]
    MissingSegment(String),

    #[error("metadata key {0} is not set")]
    MissingKey(String),
}

/// Source of host metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch a metadata value (first line only).
    async fn get(&self, key: &str) -> Result<String, EnrichmentError>;

    /// The platform build stamp, e.g. `20150101T000000Z`.
    async fn build_stamp(&self) -> Result<String, EnrichmentError>;
}

/// Extract the build stamp from a `uname -v` style version string.
///
/// `joyent_20150101T000000Z` yields `20150101T000000Z`.
pub fn parse_build_stamp(version: &str) -> Result<String, EnrichmentError> {
    let first = version.lines().next().unwrap_or_default();
    match first.split('_').nth(1) {
        Some(stamp) if !stamp.is_empty() => Ok(stamp.to_string()),
        _ => Err(EnrichmentError::MissingSegment(first.to_string())),
    }
}

// =============================================================================
// Command-backed source
// =============================================================================

/// Metadata from `mdata-get` and `uname`.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    mdata_get: PathBuf,
    uname: PathBuf,
    timeout: Duration,
}

impl CommandMetadata {
    /// Create a source using the given tool paths.
    pub fn new(mdata_get: impl Into<PathBuf>, uname: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            mdata_get: mdata_get.into(),
            uname: uname.into(),
            timeout,
        }
    }

    /// Create a source from the agent configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.mdata_get_path.clone(),
            config.uname_path.clone(),
            config.external_timeout,
        )
    }

    /// Run a command and return the first line of its stdout.
    async fn first_line(&self, program: &Path, args: &[&str]) -> Result<String, EnrichmentError> {
        let command = format!("{} {}", program.display(), args.join(" "));
        debug!(command = %command, "Running metadata command");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| EnrichmentError::Timeout {
            command: command.clone(),
            timeout: self.timeout,
        })?
        .map_err(|source| EnrichmentError::Spawn {
            command: command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(EnrichmentError::ExitStatus {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().next() {
            Some(line) if !line.is_empty() => Ok(line.to_string()),
            _ => Err(EnrichmentError::EmptyOutput { command }),
        }
    }
}

#[async_trait]
impl MetadataSource for CommandMetadata {
    async fn get(&self, key: &str) -> Result<String, EnrichmentError> {
        self.first_line(&self.mdata_get, &[key]).await
    }

    async fn build_stamp(&self) -> Result<String, EnrichmentError> {
        let version = self.first_line(&self.uname, &["-v"]).await?;
        parse_build_stamp(&version)
    }
}

// =============================================================================
// Static source
// =============================================================================

/// Fixed metadata, for hosts without a metadata service.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    values: HashMap<String, String>,
    version: Option<String>,
}

impl StaticMetadata {
    /// Create an empty source (every lookup fails).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metadata value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set the OS version string the build stamp is parsed from.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn get(&self, key: &str) -> Result<String, EnrichmentError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| EnrichmentError::MissingKey(key.to_string()))
    }

    async fn build_stamp(&self) -> Result<String, EnrichmentError> {
        match &self.version {
            Some(version) => parse_build_stamp(version),
            None => Err(EnrichmentError::MissingKey("uname -v".to_string())),
        }
    }
}
