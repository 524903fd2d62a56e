//! distsort CLI entry point

use anyhow::{Context, Result};
use distsort::config::cli::{Cli, ExecutionMode};
use distsort::config::toml::load_config;
use distsort::config::validator::validate_config;
use distsort::config::Config;
use distsort::distributed::{DistributedCoordinator, WorkerService};
use distsort::output::{print_baseline, print_round_report, write_json_report};
use distsort::sort::baseline::run_baseline;
use distsort::sort::input::InputGenerator;
use distsort::util::log::{init_tracing, TracingLogger};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("distsort v{}", env!("CARGO_PKG_VERSION"));
    println!("Distributed merge sort over TCP workers");
    println!();

    // Parse CLI arguments
    let cli = Cli::parse_args();
    cli.validate()?;

    let config = load_config(&cli).context("Failed to load configuration")?;
    init_tracing(&config.output.log_level);

    validate_config(&config, cli.mode).context("Configuration validation failed")?;

    // Handle different execution modes
    match cli.mode {
        ExecutionMode::Coordinator => run_coordinator(config),
        ExecutionMode::Worker => run_worker(config),
        ExecutionMode::Sequential => run_sequential(config),
    }
}

/// Run in worker mode (accept loop until Ctrl-C)
fn run_worker(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = WorkerService::bind(&config.worker.listen_addr(), TracingLogger::shared())
            .await
            .context("Failed to create worker service")?;

        service.run_until_ctrl_c().await
    })
}

/// Run in coordinator mode (one distributed round)
fn run_coordinator(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let report = runtime.block_on(async {
        let coordinator = DistributedCoordinator::new(Arc::new(config.coordinator.clone()), TracingLogger::shared())
            .context("Failed to create coordinator")?;

        anyhow::Ok(coordinator.run().await)
    })?;

    println!();
    print_round_report(&report);

    if let Some(ref path) = config.output.json_output {
        write_json_report(path, &report, config.output.pretty_json)?;
        println!("JSON report written to {}", path.display());
    }

    if !report.verification.is_success() {
        anyhow::bail!("Merged result failed ordering verification");
    }

    Ok(())
}

/// Run the single-process reference sort only
fn run_sequential(config: Config) -> Result<()> {
    let coordinator = &config.coordinator;
    let input = InputGenerator::from_seed_option(coordinator.min_value, coordinator.max_value, coordinator.seed)
        .generate(coordinator.input_len);

    let baseline = run_baseline(&input);
    print_baseline(&baseline, None);

    Ok(())
}
