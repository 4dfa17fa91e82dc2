//! Domain types — the vocabulary of TapeLab.
//!
//! Everything else in the engine builds on these types: markets and their
//! lifecycle, trade prints, limit orders, fills, two-leg positions, and
//! portfolio snapshots.

pub mod fill;
pub mod market;
pub mod order;
pub mod position;
pub mod snapshot;
pub mod trade;

pub use fill::Fill;
pub use market::{Market, MarketId, MarketPhase, Platform, Resolution};
pub use order::{Order, OrderId, OrderSide, OrderStatus};
pub use position::{Leg, Position};
pub use snapshot::{PositionSummary, Snapshot};
pub use trade::{TakerSide, TradeEvent};

/// Milliseconds since the Unix epoch. Monotone within a single run.
pub type Timestamp = i64;

/// Quantities below this are treated as zero.
pub const QTY_EPS: f64 = 1e-9;

/// Tolerance for price comparisons against the tick grid.
pub const PRICE_EPS: f64 = 1e-9;
