//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{parse_count, parse_duration_ms, parse_host_list, read_clients_file};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the effective configuration: config file (if any) overridden by CLI flags
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    merge_cli_with_config(cli, config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Worker endpoints
    if let Some(ref host_list) = cli.host_list {
        config.coordinator.workers = parse_host_list(host_list, cli.default_port);
    } else if let Some(ref clients_file) = cli.clients_file {
        config.coordinator.workers = read_clients_file(clients_file, cli.default_port)?;
    }

    // Input
    if let Some(ref size) = cli.size {
        config.coordinator.input_len = parse_count(size).context("Invalid --size")?;
    }
    if cli.seed.is_some() {
        config.coordinator.seed = cli.seed;
    }
    if let Some(min) = cli.min_value {
        config.coordinator.min_value = min;
    }
    if let Some(max) = cli.max_value {
        config.coordinator.max_value = max;
    }

    // Deadlines
    if let Some(ref timeout) = cli.round_timeout {
        config.coordinator.round_timeout_ms = parse_duration_ms(timeout).context("Invalid --round-timeout")?;
    }
    if let Some(ref timeout) = cli.connect_timeout {
        config.coordinator.connect_timeout_ms = parse_duration_ms(timeout).context("Invalid --connect-timeout")?;
    }
    if cli.no_baseline {
        config.coordinator.run_baseline = false;
    }

    // Worker
    if let Some(ref bind) = cli.bind {
        config.worker.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.worker.port = port;
    }

    // Output
    if cli.json_output.is_some() {
        config.output.json_output = cli.json_output.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.output.log_level = level.clone();
    }

    Ok(config)
}
