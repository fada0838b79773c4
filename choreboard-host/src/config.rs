//! Configuration system for the Choreboard host.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/choreboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use choreboard::{EngineConfig, InvalidConfig};
use choreboard_proto::task::{GroupId, UserId};

/// Errors that can occur when loading host configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value parsed fine but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] InvalidConfig),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct HostConfigFile {
    engine: EngineFileConfig,
    host: HostFileConfig,
    /// User id to display name.
    members: BTreeMap<String, String>,
}

/// `[engine]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct EngineFileConfig {
    grace_delay_ms: Option<u64>,
    reconcile_interval_secs: Option<u64>,
    storage_timeout_secs: Option<u64>,
    conflict_retries: Option<u32>,
    utc_offset_minutes: Option<i32>,
    notification_buffer: Option<usize>,
}

/// `[host]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct HostFileConfig {
    data_dir: Option<PathBuf>,
    groups: Option<Vec<String>>,
    log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the host process.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Choreboard reconciliation host")]
pub struct HostCliArgs {
    /// Directory holding the task and stats snapshot.
    #[arg(short, long, env = "CHOREBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config file (default: `~/.config/choreboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Group to reconcile. Repeat for several groups; replaces the file's list.
    #[arg(short, long = "group")]
    pub groups: Vec<String>,

    /// Seconds between periodic reconcile passes.
    #[arg(long, env = "CHOREBOARD_RECONCILE_INTERVAL")]
    pub reconcile_interval_secs: Option<u64>,

    /// Milliseconds a completed task stays visible before it resets.
    #[arg(long)]
    pub grace_delay_ms: Option<u64>,

    /// Offset from UTC, in minutes, used to read deadline input.
    #[arg(long, allow_negative_numbers = true)]
    pub utc_offset_minutes: Option<i32>,

    /// Log file path (default: `choreboard.log` in the system temp dir).
    #[arg(long, env = "CHOREBOARD_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "CHOREBOARD_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved host configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Engine tunables.
    pub engine: EngineConfig,
    /// Directory holding the snapshot file.
    pub data_dir: PathBuf,
    /// Groups to reconcile.
    pub groups: Vec<GroupId>,
    /// Display names for the member directory.
    pub members: Vec<(UserId, String)>,
    /// Log file path.
    pub log_file: PathBuf,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            data_dir: default_data_dir(),
            groups: Vec::new(),
            members: Vec::new(),
            log_file: std::env::temp_dir().join("choreboard.log"),
            log_level: "info".to_string(),
        }
    }
}

impl HostConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and missing file
    /// is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or the merged engine values are unusable.
    pub fn load(cli: &HostCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `HostConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &HostCliArgs, file: &HostConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let engine_defaults = defaults.engine;
        let engine = &file.engine;

        let engine = EngineConfig {
            grace_delay: cli
                .grace_delay_ms
                .or(engine.grace_delay_ms)
                .map_or(engine_defaults.grace_delay, Duration::from_millis),
            reconcile_interval: cli
                .reconcile_interval_secs
                .or(engine.reconcile_interval_secs)
                .map_or(engine_defaults.reconcile_interval, Duration::from_secs),
            storage_timeout: engine
                .storage_timeout_secs
                .map_or(engine_defaults.storage_timeout, Duration::from_secs),
            conflict_retries: engine
                .conflict_retries
                .unwrap_or(engine_defaults.conflict_retries),
            utc_offset_minutes: cli
                .utc_offset_minutes
                .or(engine.utc_offset_minutes)
                .unwrap_or(engine_defaults.utc_offset_minutes),
            notification_buffer: engine
                .notification_buffer
                .unwrap_or(engine_defaults.notification_buffer),
        };
        engine.validate()?;

        let groups = if cli.groups.is_empty() {
            file.host.groups.clone().unwrap_or_default()
        } else {
            cli.groups.clone()
        };

        Ok(Self {
            engine,
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.host.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            groups: groups.into_iter().map(GroupId::new).collect(),
            members: file
                .members
                .iter()
                .map(|(id, name)| (UserId::new(id.as_str()), name.clone()))
                .collect(),
            log_file: cli
                .log_file
                .clone()
                .or_else(|| file.host.log_file.clone())
                .unwrap_or(defaults.log_file),
            log_level: cli.log_level.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".choreboard"), |dir| dir.join("choreboard"))
}

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&Path>) -> Result<HostConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(HostConfigFile::default());
        };
        config_dir.join("choreboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HostConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
