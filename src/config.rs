//! Centralized configuration and builder for the sync reader.
//!
//! Sources, lowest to highest priority:
//! - `SyncConfig::default()`
//! - a JSON document (`SyncConfig::from_json_str`)
//! - environment variables (`SyncConfig::from_env`, `apply_env`)
//! - fluent `with_*` setters / `SyncConfigBuilder`
//!
//! Environment variables:
//! - LS_INSTANCE                  instance name (default: host name)
//! - LS_LMDB_PATH                 environment path
//! - LS_LMDB_MAP_SIZE             map size, "1GB" / "64MB" / bytes
//! - LS_LMDB_MAX_DBS              maximum number of named tables
//! - LS_LMDB_LOG_STATS_INTERVAL   "30s" / "500ms" / seconds, 0 disables
//! - LS_LMDB_SCRAPE_SMAPS         0|1|true|false|on|off|yes|no
//! - LS_DUPSORT_HACK              0|1|true|false|on|off|yes|no
//!
//! Malformed values are logged and ignored.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::consts::SYNC_META_DBI;
use crate::engine::EnvOptions;
use crate::extract::ExtractOptions;
use crate::monitor::MonitorOptions;
use crate::util::{human_size, parse_duration, parse_size};

pub const DEFAULT_LOG_STATS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Configured instance name; empty means "use the host name".
    pub instance: String,
    pub lmdb_path: PathBuf,
    /// Passed to the engine unchanged.
    pub lmdb_options: EnvOptions,
    /// Accept dup-sort tables during extraction.
    pub dupsort_hack: bool,
    /// Stats monitor period; zero disables the monitor.
    pub log_stats_interval: Duration,
    /// Include /proc/self/smaps_rollup figures in stats samples.
    pub scrape_smaps: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            instance: String::new(),
            lmdb_path: PathBuf::from("./data"),
            lmdb_options: EnvOptions::default(),
            dupsort_hack: false,
            log_stats_interval: DEFAULT_LOG_STATS_INTERVAL,
            scrape_smaps: false,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// JSON accepts "30s"-style strings or a bare number of seconds.
#[derive(Deserialize)]
#[serde(untagged)]
enum DurationSpec {
    Secs(u64),
    Text(String),
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    instance: Option<String>,
    lmdb_path: Option<PathBuf>,
    lmdb: Option<EnvOptions>,
    dupsort_hack: Option<bool>,
    log_stats_interval: Option<DurationSpec>,
    scrape_smaps: Option<bool>,
}

#[derive(Serialize)]
struct ConfigFileOut<'a> {
    instance: &'a str,
    lmdb_path: &'a PathBuf,
    lmdb: &'a EnvOptions,
    dupsort_hack: bool,
    log_stats_interval: String,
    scrape_smaps: bool,
}

impl SyncConfig {
    /// Defaults overridden by the `LS_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields from the `LS_*` environment variables.
    pub fn apply_env(self) -> Self {
        self.apply_vars(env_var)
    }

    fn apply_vars<F: Fn(&str) -> Option<String>>(mut self, get: F) -> Self {
        if let Some(v) = get("LS_INSTANCE") {
            self.instance = v.trim().to_string();
        }

        if let Some(v) = get("LS_LMDB_PATH") {
            let s = v.trim();
            if !s.is_empty() {
                self.lmdb_path = PathBuf::from(s);
            }
        }

        if let Some(v) = get("LS_LMDB_MAP_SIZE") {
            match parse_size(&v) {
                Ok(n) => self.lmdb_options.map_size = n,
                Err(e) => warn!("ignoring LS_LMDB_MAP_SIZE: {}", e),
            }
        }

        if let Some(v) = get("LS_LMDB_MAX_DBS") {
            match v.trim().parse::<u32>() {
                Ok(n) => self.lmdb_options.max_tables = n,
                Err(e) => warn!("ignoring LS_LMDB_MAX_DBS={:?}: {}", v, e),
            }
        }

        if let Some(v) = get("LS_LMDB_LOG_STATS_INTERVAL") {
            match parse_duration(&v) {
                Ok(d) => self.log_stats_interval = d,
                Err(e) => warn!("ignoring LS_LMDB_LOG_STATS_INTERVAL: {}", e),
            }
        }

        if let Some(v) = get("LS_LMDB_SCRAPE_SMAPS") {
            match parse_bool(&v) {
                Some(on) => self.scrape_smaps = on,
                None => warn!("ignoring LS_LMDB_SCRAPE_SMAPS={:?}", v),
            }
        }

        if let Some(v) = get("LS_DUPSORT_HACK") {
            match parse_bool(&v) {
                Some(on) => self.dupsort_hack = on,
                None => warn!("ignoring LS_DUPSORT_HACK={:?}", v),
            }
        }

        self
    }

    /// Load a JSON config document; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(s)?;
        let mut cfg = Self::default();
        if let Some(v) = file.instance {
            cfg.instance = v;
        }
        if let Some(v) = file.lmdb_path {
            cfg.lmdb_path = v;
        }
        if let Some(v) = file.lmdb {
            cfg.lmdb_options = v;
        }
        if let Some(v) = file.dupsort_hack {
            cfg.dupsort_hack = v;
        }
        if let Some(v) = file.scrape_smaps {
            cfg.scrape_smaps = v;
        }
        match file.log_stats_interval {
            Some(DurationSpec::Secs(n)) => cfg.log_stats_interval = Duration::from_secs(n),
            Some(DurationSpec::Text(t)) => {
                cfg.log_stats_interval =
                    parse_duration(&t).map_err(|reason| ConfigError::Invalid {
                        field: "log_stats_interval",
                        reason,
                    })?;
            }
            None => {}
        }
        Ok(cfg)
    }

    /// Render as a JSON document accepted by `from_json_str`.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        let out = ConfigFileOut {
            instance: &self.instance,
            lmdb_path: &self.lmdb_path,
            lmdb: &self.lmdb_options,
            dupsort_hack: self.dupsort_hack,
            log_stats_interval: format!("{}ms", self.log_stats_interval.as_millis()),
            scrape_smaps: self.scrape_smaps,
        };
        Ok(serde_json::to_string_pretty(&out)?)
    }

    pub fn with_instance<S: Into<String>>(mut self, name: S) -> Self {
        self.instance = name.into();
        self
    }

    pub fn with_lmdb_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.lmdb_path = path.into();
        self
    }

    pub fn with_lmdb_options(mut self, opts: EnvOptions) -> Self {
        self.lmdb_options = opts;
        self
    }

    pub fn with_dupsort_hack(mut self, on: bool) -> Self {
        self.dupsort_hack = on;
        self
    }

    pub fn with_log_stats_interval(mut self, d: Duration) -> Self {
        self.log_stats_interval = d;
        self
    }

    pub fn with_scrape_smaps(mut self, on: bool) -> Self {
        self.scrape_smaps = on;
        self
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            dupsort_hack: self.dupsort_hack,
        }
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            interval: self.log_stats_interval,
            scrape_smaps: self.scrape_smaps,
            skip_table: Some(SYNC_META_DBI.to_string()),
        }
    }

    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }
}

impl fmt::Display for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyncConfig {{ \
             instance: {}, \
             lmdb_path: {}, \
             map_size: {}, \
             max_dbs: {}, \
             env_flags: {:#x}, \
             dupsort_hack: {}, \
             log_stats_interval: {}, \
             scrape_smaps: {} \
             }}",
            if self.instance.is_empty() {
                "default(hostname)"
            } else {
                self.instance.as_str()
            },
            self.lmdb_path.display(),
            human_size(self.lmdb_options.map_size),
            self.lmdb_options.max_tables,
            self.lmdb_options.flags,
            self.dupsort_hack,
            if self.log_stats_interval.is_zero() {
                "disabled".to_string()
            } else {
                format!("{:?}", self.log_stats_interval)
            },
            self.scrape_smaps,
        )
    }
}

/// Builder that produces a `SyncConfig`. Starts from the environment.
#[derive(Clone, Debug)]
pub struct SyncConfigBuilder {
    cfg: SyncConfig,
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self {
            cfg: SyncConfig::from_env(),
        }
    }
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: SyncConfig::default(),
        }
    }

    pub fn instance<S: Into<String>>(mut self, name: S) -> Self {
        self.cfg.instance = name.into();
        self
    }

    pub fn lmdb_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cfg.lmdb_path = path.into();
        self
    }

    pub fn map_size(mut self, bytes: u64) -> Self {
        self.cfg.lmdb_options.map_size = bytes;
        self
    }

    pub fn max_dbs(mut self, n: u32) -> Self {
        self.cfg.lmdb_options.max_tables = n;
        self
    }

    pub fn env_flags(mut self, flags: u32) -> Self {
        self.cfg.lmdb_options.flags = flags;
        self
    }

    pub fn create(mut self, on: bool) -> Self {
        self.cfg.lmdb_options.create = on;
        self
    }

    pub fn dupsort_hack(mut self, on: bool) -> Self {
        self.cfg.dupsort_hack = on;
        self
    }

    pub fn log_stats_interval(mut self, d: Duration) -> Self {
        self.cfg.log_stats_interval = d;
        self
    }

    pub fn scrape_smaps(mut self, on: bool) -> Self {
        self.cfg.scrape_smaps = on;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> SyncConfig {
        self.cfg
    }
}
