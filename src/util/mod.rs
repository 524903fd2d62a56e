//! Utility modules

pub mod log;
pub mod verification;
