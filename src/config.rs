use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use strum::Display;

const CONFIG_FILE_NAME: &str = "config.ron";
const APP_DIR_NAME: &str = "tui-snapshot-dash";

/// Longest coverage window the chart accepts (about ten years).
pub const MAX_COVERAGE_DAYS: usize = 3660;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display, Default)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level used when RUST_LOG is not set.
    pub level: LogLevel,
    /// Per-module overrides, e.g. `{"tui_snapshot_dash::internal": Debug}`.
    pub module_levels: BTreeMap<String, LogLevel>,
    /// Directory for the rolling log file; "logs" when unset.
    pub log_directory: Option<String>,
    /// Emit elapsed-time debug events for scans, series and rendering.
    pub enable_performance_metrics: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            module_levels: BTreeMap::new(),
            log_directory: None,
            enable_performance_metrics: false,
        }
    }
}

impl LoggingConfig {
    /// EnvFilter directive string built from the configured levels.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.level.to_string();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level));
        }
        filter
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the `{date}/{project}/{file}.json` snapshot tree.
    #[serde(default = "default_snapshot_root")]
    pub snapshot_root: String,
    /// Number of days shown by the coverage chart.
    #[serde(default = "default_coverage_days")]
    pub coverage_days: usize,
    /// Suite scored by the chart; `None` plots the snapshot's own coverage.
    pub default_suite: Option<String>,
    /// Optional JSON theme file merged into the `theme` state on startup.
    pub theme_file: Option<String>,
    pub logging: LoggingConfig,
}

fn default_snapshot_root() -> String {
    "soap/snapshots".to_string()
}

fn default_coverage_days() -> usize {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            snapshot_root: default_snapshot_root(),
            coverage_days: default_coverage_days(),
            default_suite: None,
            theme_file: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `config.ron` from the working directory, next to the executable,
    /// or from the user config directory, falling back to defaults.
    pub fn load() -> Self {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];

        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }

        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
        }

        for path in candidates {
            if path.exists()
                && let Ok(content) = fs::read_to_string(&path)
            {
                match Self::from_ron(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse config at {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Self::default()
    }

    pub fn from_ron(content: &str) -> Result<Self> {
        let config: Self = ron::from_str(content).context("Failed to parse RON config")?;
        Ok(config.clamped())
    }

    /// Bring `coverage_days` into `1..=MAX_COVERAGE_DAYS`.
    fn clamped(mut self) -> Self {
        let days = self.coverage_days.clamp(1, MAX_COVERAGE_DAYS);
        if days != self.coverage_days {
            tracing::warn!(
                configured = self.coverage_days,
                used = days,
                "coverage_days out of range"
            );
            self.coverage_days = days;
        }
        self
    }

    pub fn log_directory(&self) -> &str {
        self.logging.log_directory.as_deref().unwrap_or("logs")
    }
}
