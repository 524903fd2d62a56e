//! JSON output formatting
//!
//! Serializes one round report: timestamp, input size, per-worker outcomes,
//! phase timings, verification status, warnings and the optional baseline.
//! The merged values themselves are not written.

use crate::distributed::coordinator::{RoundPhase, RoundReport, WorkerOutcome};
use crate::sort::baseline::BaselineResult;
use crate::util::verification::VerificationResult;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Duration with both milliseconds and human-readable format
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuration {
    pub millis: f64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            millis: d.as_secs_f64() * 1000.0,
            human: format_duration_human(d),
        }
    }
}

/// Per-worker entry
#[derive(Debug, Clone, Serialize)]
pub struct JsonWorker {
    pub index: usize,
    pub endpoint: String,
    pub partition_len: usize,
    pub result_len: usize,
    pub elapsed: JsonDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&WorkerOutcome> for JsonWorker {
    fn from(w: &WorkerOutcome) -> Self {
        Self {
            index: w.index,
            endpoint: w.endpoint.clone(),
            partition_len: w.partition_len,
            result_len: w.result_len,
            elapsed: JsonDuration::from_duration(w.elapsed),
            error: w.error.clone(),
        }
    }
}

/// Phase timings
#[derive(Debug, Clone, Serialize)]
pub struct JsonTimings {
    pub dispatch: JsonDuration,
    pub merge: JsonDuration,
    pub verify: JsonDuration,
    pub distributed_total: JsonDuration,
}

/// Single-process comparison
#[derive(Debug, Clone, Serialize)]
pub struct JsonBaseline {
    pub len: usize,
    pub elapsed: JsonDuration,
    pub verification: VerificationResult,
    /// Baseline time divided by distributed time
    pub speedup: f64,
}

/// Complete round report
#[derive(Debug, Clone, Serialize)]
pub struct JsonRoundReport {
    pub timestamp: String,
    pub input_len: usize,
    pub merged_len: usize,
    pub missing_elements: usize,
    pub phase: RoundPhase,
    pub verification: VerificationResult,
    pub complete: bool,
    pub workers: Vec<JsonWorker>,
    pub timings: JsonTimings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<JsonBaseline>,
}

impl JsonRoundReport {
    pub fn from_report(report: &RoundReport) -> Self {
        let distributed = report.distributed_time();

        Self {
            timestamp: report.started_at.to_rfc3339(),
            input_len: report.input_len,
            merged_len: report.merged.len(),
            missing_elements: report.missing_elements(),
            phase: report.phase,
            verification: report.verification,
            complete: report.is_complete(),
            workers: report.workers.iter().map(JsonWorker::from).collect(),
            timings: JsonTimings {
                dispatch: JsonDuration::from_duration(report.dispatch_time),
                merge: JsonDuration::from_duration(report.merge_time),
                verify: JsonDuration::from_duration(report.verify_time),
                distributed_total: JsonDuration::from_duration(distributed),
            },
            warnings: report.warnings.clone(),
            baseline: report.baseline.as_ref().map(|b| baseline_entry(b, distributed)),
        }
    }
}

fn baseline_entry(baseline: &BaselineResult, distributed: Duration) -> JsonBaseline {
    JsonBaseline {
        len: baseline.len,
        elapsed: JsonDuration::from_duration(baseline.elapsed),
        verification: baseline.verification,
        speedup: speedup(baseline.elapsed, distributed),
    }
}

/// Ratio of baseline time to distributed time (0 when undefined)
pub fn speedup(baseline: Duration, distributed: Duration) -> f64 {
    let distributed = distributed.as_secs_f64();
    if distributed > 0.0 {
        baseline.as_secs_f64() / distributed
    } else {
        0.0
    }
}

/// Format duration in human-readable form
fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    }
}

/// Write the round report to `output_path`
pub fn write_json_report(output_path: &Path, report: &RoundReport, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    let json = JsonRoundReport::from_report(report);

    if pretty {
        serde_json::to_writer_pretty(file, &json)?;
    } else {
        serde_json::to_writer(file, &json)?;
    }

    Ok(())
}
