//! # TapeLab Runner
//!
//! Post-run layer for tapelab backtests.
//!
//! ## Components
//!
//! - `PerformanceMetrics`: risk/return statistics from snapshots and fills
//! - `export`: artifact writers (equity CSV, event-log NDJSON) and the
//!   tolerant replay reader

pub mod export;
pub mod metrics;

pub use export::{read_event_log, write_equity_csv, write_event_log, LogRecord};
pub use metrics::PerformanceMetrics;
