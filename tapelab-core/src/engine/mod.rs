//! Engine — event merge, the hot loop, and run outputs.

pub mod config;
pub mod event_log;
pub mod events;
pub mod run;

pub use config::{EngineConfig, SnapshotInterval, StopFlag};
pub use event_log::{EventKind, EventPayload, EventRecord, EventSink, NdjsonSink, NullSink, VecSink};
pub use events::{EngineEvent, EventMerger, MarketSchedule};
pub use run::{run_backtest, RunResult};
