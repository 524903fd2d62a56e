//! Human-readable text output

use crate::distributed::coordinator::RoundReport;
use crate::output::json::speedup;
use crate::sort::baseline::BaselineResult;
use crate::util::verification::VerificationResult;
use std::time::Duration;

/// Print the round summary to console
pub fn print_round_report(report: &RoundReport) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    SORT ROUND RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    println!("Started:   {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Input:     {} elements", format_number(report.input_len));
    println!("Merged:    {} elements", format_number(report.merged.len()));
    if report.missing_elements() > 0 {
        println!("Missing:   {} elements", format_number(report.missing_elements()));
    }
    println!("Phase:     {:?}", report.phase);
    println!();

    println!("Workers:");
    for w in &report.workers {
        match w.error {
            None => println!(
                "  [{}] {:<24} {:>12} elements  {}",
                w.index,
                w.endpoint,
                format_number(w.partition_len),
                format_ms(w.elapsed)
            ),
            Some(ref e) => println!("  [{}] {:<24} FAILED: {}", w.index, w.endpoint, e),
        }
    }
    println!();

    println!("Timing:");
    println!("  Dispatch + sort: {}", format_ms(report.dispatch_time));
    println!("  Merge:           {}", format_ms(report.merge_time));
    println!("  Verify:          {}", format_ms(report.verify_time));
    println!("  Distributed:     {}", format_ms(report.distributed_time()));
    println!();

    print_verification("Verification", &report.verification);

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    if let Some(ref baseline) = report.baseline {
        println!();
        print_baseline(baseline, Some(report.distributed_time()));
    }

    println!();
    println!("═══════════════════════════════════════════════════════════");
}

/// Print a single-process sort result
///
/// With `distributed`, also prints the speedup of the distributed round.
pub fn print_baseline(baseline: &BaselineResult, distributed: Option<Duration>) {
    println!("Single-process sort:");
    println!("  Elements: {}", format_number(baseline.len));
    println!("  Time:     {}", format_ms(baseline.elapsed));
    if let Some(distributed) = distributed {
        println!("  Speedup:  {:.2}x", speedup(baseline.elapsed, distributed));
    }
    print_verification("  Verification", &baseline.verification);
}

fn print_verification(label: &str, verification: &VerificationResult) {
    match verification {
        VerificationResult::Success => println!("{}: sorted ✓", label),
        VerificationResult::Failure { index, previous, actual } => println!(
            "{}: NOT sorted ✗ (index {}: {} < {})",
            label, index, actual, previous
        ),
    }
}

fn format_ms(d: Duration) -> String {
    format!("{:.2} ms", d.as_secs_f64() * 1000.0)
}

/// Format number with thousands separators
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
