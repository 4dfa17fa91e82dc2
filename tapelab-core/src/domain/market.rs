//! Market metadata and lifecycle state.

use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Markets are identified by the venue's opaque ticker string.
pub type MarketId = String;

/// Venue a market trades on. Determines the price grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Kalshi,
    Polymarket,
}

impl Platform {
    /// Minimum price increment on this venue.
    pub fn tick_size(&self) -> f64 {
        match self {
            Platform::Kalshi => 0.01,
            Platform::Polymarket => 0.001,
        }
    }
}

/// Terminal outcome of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Unresolved,
    ResolvedYes,
    ResolvedNo,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }

    /// Settlement value of one YES contract, if resolved.
    pub fn yes_settlement(&self) -> Option<f64> {
        match self {
            Resolution::Unresolved => None,
            Resolution::ResolvedYes => Some(1.0),
            Resolution::ResolvedNo => Some(0.0),
        }
    }
}

/// Where a market sits in its lifecycle, as seen by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    Trading,
    Closed,
    Resolved,
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketPhase::Trading => write!(f, "trading"),
            MarketPhase::Closed => write!(f, "closed"),
            MarketPhase::Resolved => write!(f, "resolved"),
        }
    }
}

/// A binary market as described by feed metadata.
///
/// Resolution, when known, fires at `close_time` immediately after the
/// close event; the feed supplies no separate resolution timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub platform: Platform,
    pub title: String,
    pub open_time: Timestamp,
    pub close_time: Timestamp,
    pub resolution: Resolution,
}

impl Market {
    pub fn new(
        id: impl Into<MarketId>,
        platform: Platform,
        open_time: Timestamp,
        close_time: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            platform,
            title: String::new(),
            open_time,
            close_time,
            resolution: Resolution::Unresolved,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn tick_size(&self) -> f64 {
        self.platform.tick_size()
    }
}
