//! TapeLab Core Engine
//!
//! Event-driven backtesting for binary prediction markets. Replays a
//! chronologically ordered trade tape against a strategy, simulating
//! limit-order matching with taker-side semantics, price-dependent
//! slippage, and full portfolio accounting through market resolution.

pub mod broker;
pub mod domain;
pub mod engine;
pub mod error;
pub mod feed;
pub mod portfolio;
pub mod slippage;
pub mod strategy;

pub use engine::{run_backtest, EngineConfig, RunResult};
pub use error::EngineError;
