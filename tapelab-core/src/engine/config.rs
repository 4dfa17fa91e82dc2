//! Run configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How often the engine samples portfolio snapshots. Without an interval,
/// only the final snapshot is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotInterval {
    /// Every N trade events.
    Events(u64),
    /// At most one snapshot per this many milliseconds of tape time.
    Millis(i64),
}

/// Cooperative stop signal, checked between events. Stopping never leaves
/// the portfolio mid-event.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Starting cash balance. Must be positive.
    pub initial_cash: f64,
    /// Base slippage in price units before the spread and impact factors.
    pub base_slippage: f64,
    /// Smoothing factor for the per-market trade-size EMA, in (0, 1].
    pub ema_alpha: f64,
    /// Commission as a fraction of fill notional.
    pub commission_rate: f64,
    pub snapshot_interval: Option<SnapshotInterval>,
    /// Allow legs to go negative (selling contracts the book does not hold).
    pub allow_short: bool,
    /// External stop signal; the run ends cleanly at the next event.
    pub stop: Option<StopFlag>,
}

impl EngineConfig {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            base_slippage: 0.005,
            ema_alpha: 0.05,
            commission_rate: 0.0,
            snapshot_interval: None,
            allow_short: false,
            stop: None,
        }
    }

    pub fn with_slippage(mut self, base_slippage: f64) -> Self {
        self.base_slippage = base_slippage;
        self
    }

    pub fn with_commission(mut self, commission_rate: f64) -> Self {
        self.commission_rate = commission_rate;
        self
    }

    pub fn with_snapshot_interval(mut self, interval: SnapshotInterval) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    pub fn with_allow_short(mut self, allow_short: bool) -> Self {
        self.allow_short = allow_short;
        self
    }

    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = Some(stop);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = EngineConfig::new(10_000.0);
        assert_eq!(config.initial_cash, 10_000.0);
        assert_eq!(config.base_slippage, 0.005);
        assert_eq!(config.ema_alpha, 0.05);
        assert_eq!(config.commission_rate, 0.0);
        assert!(config.snapshot_interval.is_none());
        assert!(!config.allow_short);
    }

    #[test]
    fn stop_flag_round_trip() {
        let stop = StopFlag::new();
        assert!(!stop.is_set());
        let shared = stop.clone();
        shared.trigger();
        assert!(stop.is_set());
    }
}
