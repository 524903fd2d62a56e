//! CLI to Config conversion utilities

use anyhow::{Context, Result};
use std::path::Path;

/// Parse an element count (e.g., "1000", "100k", "10m", "1g") using decimal multipliers
pub fn parse_count(s: &str) -> Result<usize> {
    let s = s.trim().to_lowercase().replace('_', "");

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('k') {
        (n, 1_000usize)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix('g') {
        (n, 1_000_000_000)
    } else {
        (s.as_str(), 1)
    };

    let num: usize = num_str
        .parse()
        .with_context(|| format!("Invalid count format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Count overflows: {}", s))
}

/// Parse a duration string (e.g., "500ms", "30s", "2m") to milliseconds
///
/// A bare number is taken as milliseconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Duration overflows: {}", s))
}

/// Add `default_port` to an address that has none
pub fn normalize_endpoint(addr: &str, default_port: u16) -> String {
    let addr = addr.trim();
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{}:{}", addr, default_port)
    }
}

/// Parse a comma-separated list of worker endpoints
pub fn parse_host_list(list: &str, default_port: u16) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| normalize_endpoint(s, default_port))
        .collect()
}

/// Read worker endpoints from a file (one per line, `#` comments allowed)
pub fn read_clients_file(path: &Path, default_port: u16) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clients file: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| normalize_endpoint(line, default_port))
        .collect())
}
