//! Point-in-time portfolio snapshots for equity-curve reconstruction.

use super::{MarketId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compact view of one market's position inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub yes_quantity: f64,
    pub yes_avg_cost: f64,
    pub no_quantity: f64,
    pub no_avg_cost: f64,
}

/// Timestamped record of cash, equity, and open positions.
///
/// Positions are keyed in a `BTreeMap` so serialized snapshots are
/// byte-stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub cash: f64,
    pub equity: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub open_positions: usize,
    pub positions: BTreeMap<MarketId, PositionSummary>,
}
