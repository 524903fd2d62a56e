//! Report output: console summary and JSON file

pub mod json;
pub mod text;

pub use json::write_json_report;
pub use text::{print_baseline, print_round_report};
