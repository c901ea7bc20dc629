//! ==============================================================================
//! config.rs - host configuration and boot parameters
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `simtemp.toml`.
//!     loads configuration from file or falls back to defaults.
//!     applies insmod-style `name=value` overrides from the command line.
//!
//! structure:
//!     - BootParams: sampling_ms / threshold_mC applied before the first tick.
//!     - ServerConfig: where the device surface listens.
//!     - LoggingConfig: default filter and per-tick verbosity.
//!
//! this runs before tracing is initialised (the log level lives in here),
//! so it reports on stdout.
//!
//! ==============================================================================

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

use crate::control::parse_decimal;
use crate::domain::{DEFAULT_SAMPLING_MS, DEFAULT_THRESHOLD_MC};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SimtempConfig {
    #[serde(default)]
    pub params: BootParams,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BootParams {
    #[serde(default = "default_sampling_ms")]
    pub sampling_ms: i32,
    #[serde(rename = "threshold_mC", default = "default_threshold_mc")]
    pub threshold_mc: i32,
}

fn default_sampling_ms() -> i32 {
    DEFAULT_SAMPLING_MS
}

fn default_threshold_mc() -> i32 {
    DEFAULT_THRESHOLD_MC
}

impl Default for BootParams {
    fn default() -> Self {
        Self {
            sampling_ms: DEFAULT_SAMPLING_MS,
            threshold_mc: DEFAULT_THRESHOLD_MC,
        }
    }
}

impl BootParams {
    /// apply one `name=value` argument
    pub fn apply_arg(&mut self, arg: &str) -> anyhow::Result<()> {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("expected name=value, got '{}'", arg))?;
        let value = parse_decimal(value).with_context(|| format!("bad value for parameter '{}'", name))?;
        match name {
            "sampling_ms" => self.sampling_ms = value,
            "threshold_mC" => self.threshold_mc = value,
            _ => bail!("unknown parameter '{}'", name),
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_show_samples")]
    pub show_samples: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_show_samples() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level(), show_samples: true }
    }
}

impl SimtempConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {}", path.as_ref().display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("failed to parse config: {}", e))
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("simtemp.toml"),
            PathBuf::from("..").join("config").join("simtemp.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│          SIMTEMP CONFIGURATION          │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Sampling: {} ms", self.params.sampling_ms);
        println!("│ Threshold: {} mC", self.params.threshold_mc);
        println!("│ Bind: {}", self.server.bind);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
