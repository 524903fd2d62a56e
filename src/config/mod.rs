//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::sort::input::{DEFAULT_MAX_VALUE, DEFAULT_MIN_VALUE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Worker endpoints (host:port), one partition per endpoint
    #[serde(default)]
    pub workers: Vec<String>,
    /// Number of elements to generate and sort
    #[serde(default = "default_input_len")]
    pub input_len: usize,
    /// Seed for input generation (entropy if unset)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Smallest generated value
    #[serde(default = "default_min_value")]
    pub min_value: i32,
    /// Largest generated value
    #[serde(default = "default_max_value")]
    pub max_value: i32,
    /// Per-worker deadline for one request/response exchange
    #[serde(default = "default_round_timeout_ms")]
    pub round_timeout_ms: u64,
    /// Deadline for establishing each worker connection
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long to wait for a worker to close after TERMINATE
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
    /// Time a single-process sort of the same input for comparison
    #[serde(default = "default_true")]
    pub run_baseline: bool,
}

impl CoordinatorConfig {
    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: Vec::new(),
            input_len: default_input_len(),
            seed: None,
            min_value: default_min_value(),
            max_value: default_max_value(),
            round_timeout_ms: default_round_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            run_baseline: true,
        }
    }
}

fn default_input_len() -> usize {
    1_000_000
}

fn default_min_value() -> i32 {
    DEFAULT_MIN_VALUE
}

fn default_max_value() -> i32 {
    DEFAULT_MAX_VALUE
}

fn default_round_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_close_timeout_ms() -> u64 {
    1_000
}

fn default_true() -> bool {
    true
}

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl WorkerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12345
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    #[serde(default)]
    pub json_output: Option<PathBuf>,
    /// Pretty-print the JSON report
    #[serde(default = "default_true")]
    pub pretty_json: bool,
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_output: None,
            pretty_json: true,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
