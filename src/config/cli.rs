//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Coordinator mode (default) - partition, dispatch, merge, verify
    #[default]
    Coordinator,
    /// Worker mode - accept connections and sort partitions
    Worker,
    /// Sequential mode - single-process reference sort only
    Sequential,
}

/// distsort - distributed merge sort over TCP workers
#[derive(Parser, Debug, Default)]
#[command(name = "distsort")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: coordinator, worker, or sequential
    #[arg(long, value_enum, default_value = "coordinator")]
    pub mode: ExecutionMode,

    /// TOML configuration file (CLI flags override its values)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Worker Options ===
    /// Address to bind in worker mode [default: 0.0.0.0]
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on in worker mode [default: 12345]
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    // === Coordinator Options ===
    /// Comma-separated worker endpoints (e.g., "10.0.1.10:12345,10.0.1.11:12345")
    #[arg(long)]
    pub host_list: Option<String>,

    /// File containing worker endpoints (one per line)
    #[arg(long)]
    pub clients_file: Option<PathBuf>,

    /// Port used for endpoints given without one
    #[arg(long, default_value = "12345")]
    pub default_port: u16,

    /// Number of elements to sort (e.g., 100000, 100k, 10m) [default: 1m]
    #[arg(short = 'n', long)]
    pub size: Option<String>,

    /// Seed for input generation (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Smallest generated value [default: -100]
    #[arg(long, allow_hyphen_values = true)]
    pub min_value: Option<i32>,

    /// Largest generated value [default: 100]
    #[arg(long, allow_hyphen_values = true)]
    pub max_value: Option<i32>,

    /// Per-worker deadline for one sort round trip (e.g., 30s, 500ms) [default: 30s]
    #[arg(long)]
    pub round_timeout: Option<String>,

    /// Deadline for connecting to each worker (e.g., 5s) [default: 5s]
    #[arg(long)]
    pub connect_timeout: Option<String>,

    /// Skip the single-process baseline comparison
    #[arg(long)]
    pub no_baseline: bool,

    // === Output Options ===
    /// Write the round report as JSON to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG) [default: info]
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments that do not depend on the config file
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host_list.is_some() && self.clients_file.is_some() {
            anyhow::bail!("--host-list and --clients-file are mutually exclusive");
        }

        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                anyhow::bail!("--min-value ({}) must not exceed --max-value ({})", min, max);
            }
        }

        Ok(())
    }
}
