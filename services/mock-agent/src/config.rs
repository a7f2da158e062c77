//! Configuration for the mock agent.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Mock agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the control API listens on.
    pub listen_addr: SocketAddr,

    /// Watched root; one subdirectory per mock CN.
    pub mockcn_dir: PathBuf,

    /// JSON document holding node index assignments.
    pub state_file: PathBuf,

    /// Directory for per-instance startup marker files.
    pub tmp_dir: PathBuf,

    /// Optional replacement for the embedded canned profiles.
    pub profiles_file: Option<PathBuf>,

    /// Deep-validate composite inventory fields.
    pub strict_validation: bool,

    /// Upper bound on each metadata query / external command.
    pub external_timeout: Duration,

    /// Fallback resync period for the directory watch.
    pub resync_interval: Duration,

    /// Registration heartbeat period of each mock CN.
    pub heartbeat_interval: Duration,

    /// Path to the metadata query tool.
    pub mdata_get_path: PathBuf,

    /// Path to `uname`.
    pub uname_path: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 31337)),
            mockcn_dir: PathBuf::from("/mockcn"),
            state_file: PathBuf::from("/mockcn.json"),
            tmp_dir: PathBuf::from("/tmp"),
            profiles_file: None,
            strict_validation: false,
            external_timeout: Duration::from_secs(10),
            resync_interval: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(30),
            mdata_get_path: PathBuf::from("/usr/sbin/mdata-get"),
            uname_path: PathBuf::from("/usr/bin/uname"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let listen_addr = match std::env::var("MOCKCN_LISTEN_ADDR") {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("invalid MOCKCN_LISTEN_ADDR: {addr}"))?,
            Err(_) => defaults.listen_addr,
        };

        let strict_validation = std::env::var("MOCKCN_STRICT_VALIDATION")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.strict_validation);

        Ok(Self {
            listen_addr,
            mockcn_dir: env_path("MOCKCN_DIR").unwrap_or(defaults.mockcn_dir),
            state_file: env_path("MOCKCN_STATE_FILE").unwrap_or(defaults.state_file),
            tmp_dir: env_path("MOCKCN_TMP_DIR").unwrap_or(defaults.tmp_dir),
            profiles_file: env_path("MOCKCN_PROFILES_FILE"),
            strict_validation,
            external_timeout: env_secs("MOCKCN_EXTERNAL_TIMEOUT_SECS")?
                .unwrap_or(defaults.external_timeout),
            resync_interval: env_secs("MOCKCN_RESYNC_INTERVAL_SECS")?
                .unwrap_or(defaults.resync_interval),
            heartbeat_interval: env_secs("MOCKCN_HEARTBEAT_INTERVAL_SECS")?
                .unwrap_or(defaults.heartbeat_interval),
            mdata_get_path: env_path("MOCKCN_MDATA_GET").unwrap_or(defaults.mdata_get_path),
            uname_path: env_path("MOCKCN_UNAME").unwrap_or(defaults.uname_path),
            log_level: std::env::var("MOCKCN_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_secs(key: &str) -> Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(v) => parse_secs(key, &v).map(Some),
        Err(_) => Ok(None),
    }
}

/// A positive whole number of seconds.
fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("invalid {key}: {value}"))?;
    anyhow::ensure!(secs > 0, "{key} must be positive");
    Ok(Duration::from_secs(secs))
}

/// `1` or `true` (any case) enables; anything else disables.
fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
