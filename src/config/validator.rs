//! Configuration validation

use super::*;
use crate::config::cli::ExecutionMode;
use crate::distributed::protocol::{max_body_len, MAX_FRAME_LEN};
use crate::sort::partition::largest_partition_len;
use anyhow::{Context, Result};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate the configuration sections used by `mode`
pub fn validate_config(config: &Config, mode: ExecutionMode) -> Result<()> {
    match mode {
        ExecutionMode::Coordinator => validate_coordinator(&config.coordinator)?,
        ExecutionMode::Worker => validate_worker(&config.worker)?,
        ExecutionMode::Sequential => validate_value_range(&config.coordinator)?,
    }
    validate_output(&config.output)?;

    Ok(())
}

/// Validate coordinator configuration
pub fn validate_coordinator(coordinator: &CoordinatorConfig) -> Result<()> {
    if coordinator.workers.is_empty() {
        anyhow::bail!("Coordinator mode requires at least one worker (--host-list or --clients-file)");
    }

    for (i, endpoint) in coordinator.workers.iter().enumerate() {
        validate_endpoint(endpoint)
            .with_context(|| format!("Invalid worker endpoint #{}", i))?;
    }

    validate_value_range(coordinator)?;
    validate_frame_size(coordinator)?;

    if coordinator.round_timeout_ms == 0 {
        anyhow::bail!("round_timeout_ms must be greater than 0");
    }
    if coordinator.connect_timeout_ms == 0 {
        anyhow::bail!("connect_timeout_ms must be greater than 0");
    }

    Ok(())
}

fn validate_value_range(coordinator: &CoordinatorConfig) -> Result<()> {
    if coordinator.min_value > coordinator.max_value {
        anyhow::bail!(
            "min_value ({}) must not exceed max_value ({})",
            coordinator.min_value,
            coordinator.max_value
        );
    }
    Ok(())
}

/// Reject inputs whose largest partition cannot fit in one protocol frame
fn validate_frame_size(coordinator: &CoordinatorConfig) -> Result<()> {
    let largest = largest_partition_len(coordinator.input_len, coordinator.workers.len());
    let body = max_body_len(largest, coordinator.min_value, coordinator.max_value);

    if body > MAX_FRAME_LEN {
        anyhow::bail!(
            "input_len {} over {} worker(s) gives partitions of up to {} elements ({} bytes encoded), \
             above the {} byte frame limit; add workers, shrink the input or narrow the value range",
            coordinator.input_len,
            coordinator.workers.len(),
            largest,
            body,
            MAX_FRAME_LEN
        );
    }
    Ok(())
}

/// Validate a `host:port` endpoint
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    let (host, port) = endpoint
        .rsplit_once(':')
        .with_context(|| format!("'{}' is not in host:port form", endpoint))?;

    if host.is_empty() {
        anyhow::bail!("'{}' has an empty host", endpoint);
    }

    let port: u16 = port
        .parse()
        .with_context(|| format!("'{}' has an invalid port", endpoint))?;
    if port == 0 {
        anyhow::bail!("'{}' uses port 0", endpoint);
    }

    Ok(())
}

/// Validate worker configuration
pub fn validate_worker(worker: &WorkerConfig) -> Result<()> {
    if worker.bind.trim().is_empty() {
        anyhow::bail!("bind address must not be empty");
    }
    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    // Full EnvFilter directives ("distsort=debug") are accepted as-is
    let level = output.log_level.to_lowercase();
    if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
        anyhow::bail!(
            "Unknown log level '{}' (expected one of: {})",
            output.log_level,
            LOG_LEVELS.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator_with(workers: &[&str]) -> CoordinatorConfig {
        CoordinatorConfig {
            workers: workers.iter().map(|w| w.to_string()).collect(),
            ..CoordinatorConfig::default()
        }
    }

    #[test]
    fn test_validate_coordinator_ok() {
        let coordinator = coordinator_with(&["127.0.0.1:12345", "worker-b:4000"]);
        assert!(validate_coordinator(&coordinator).is_ok());
    }

    #[test]
    fn test_validate_coordinator_requires_workers() {
        assert!(validate_coordinator(&coordinator_with(&[])).is_err());
    }

    #[test]
    fn test_validate_endpoints() {
        assert!(validate_endpoint("host:1").is_ok());
        assert!(validate_endpoint("host").is_err());
        assert!(validate_endpoint(":1").is_err());
        assert!(validate_endpoint("host:99999").is_err());
        assert!(validate_endpoint("host:0").is_err());
    }

    #[test]
    fn test_validate_value_range_and_timeouts() {
        let mut coordinator = coordinator_with(&["h:1"]);
        coordinator.min_value = 5;
        coordinator.max_value = 4;
        assert!(validate_coordinator(&coordinator).is_err());

        let mut coordinator = coordinator_with(&["h:1"]);
        coordinator.round_timeout_ms = 0;
        assert!(validate_coordinator(&coordinator).is_err());
    }

    #[test]
    fn test_validate_rejects_partition_above_frame_limit() {
        let mut coordinator = coordinator_with(&["h:1"]);
        coordinator.input_len = 60_000_000;
        coordinator.min_value = i32::MIN;
        coordinator.max_value = i32::MAX;
        let err = validate_coordinator(&coordinator).unwrap_err();
        assert!(err.to_string().contains("frame limit"), "{}", err);

        // Same input split across two workers fits
        coordinator.workers.push("h:2".into());
        assert!(validate_coordinator(&coordinator).is_ok());

        // Narrow values encode compactly
        let mut coordinator = coordinator_with(&["h:1"]);
        coordinator.input_len = 60_000_000;
        assert!(validate_coordinator(&coordinator).is_ok());
    }

    #[test]
    fn test_worker_mode_ignores_coordinator_section() {
        let config = Config::default();
        assert!(validate_config(&config, ExecutionMode::Worker).is_ok());
        assert!(validate_config(&config, ExecutionMode::Coordinator).is_err());
    }

    #[test]
    fn test_validate_output_log_level() {
        let mut output = OutputConfig::default();
        assert!(validate_output(&output).is_ok());

        output.log_level = "distsort=debug".into();
        assert!(validate_output(&output).is_ok());

        output.log_level = "loud".into();
        assert!(validate_output(&output).is_err());
    }
}
