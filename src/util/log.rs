//! Component logging
//!
//! Components receive a `Logger` explicitly instead of reaching for a global.
//! Each record carries a component tag (`coordinator`, `worker`, `session`, ...).
//!
//! - `TracingLogger` forwards to `tracing`; the fmt subscriber installed by
//!   `init_tracing` adds timestamps and level filtering.
//! - `MemoryLogger` keeps records in memory so tests can assert on them.

use std::sync::{Arc, Mutex};

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Logging capability handed to every component
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, component: &str, message: &str);

    fn info(&self, component: &str, message: &str) {
        self.log(Level::Info, component, message);
    }

    fn warn(&self, component: &str, message: &str) {
        self.log(Level::Warn, component, message);
    }

    fn error(&self, component: &str, message: &str) {
        self.log(Level::Error, component, message);
    }
}

/// Shared logger handle
pub type SharedLogger = Arc<dyn Logger>;

/// Logger backed by `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn shared() -> SharedLogger {
        Arc::new(TracingLogger)
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, component: &str, message: &str) {
        match level {
            Level::Info => tracing::info!(component, "{}", message),
            Level::Warn => tracing::warn!(component, "{}", message),
            Level::Error => tracing::error!(component, "{}", message),
        }
    }
}

/// One captured log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub component: String,
    pub message: String,
}

/// Logger that stores records in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of all records so far
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Records at the given level
    pub fn at_level(&self, level: Level) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.level == level)
            .collect()
    }

    /// True if any record at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.at_level(level)
            .iter()
            .any(|record| record.message.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, component: &str, message: &str) {
        let record = LogRecord {
            level,
            component: component.to_string(),
            message: message.to_string(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins over `default_level`. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
