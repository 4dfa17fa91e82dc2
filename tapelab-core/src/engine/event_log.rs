//! Structured event log — append-only NDJSON records.
//!
//! Every significant simulation event is written as one JSON line with
//! `{ts, kind, payload}`. Records stream to an `EventSink` during the run
//! so memory stays bounded by open state, not tape length. The writer is
//! deterministic: identical runs produce byte-identical logs. Readers
//! must tolerate unknown fields (see `tapelab-runner`'s replay reader).

use crate::domain::{Fill, MarketId, Resolution, Snapshot, TakerSide, Timestamp, TradeEvent};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Trade,
    Fill,
    Open,
    Close,
    Resolve,
    Snapshot,
}

/// Typed payload for each record kind.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Trade {
        market_id: MarketId,
        price: f64,
        size: f64,
        taker_side: TakerSide,
    },
    Fill(Fill),
    Lifecycle {
        market_id: MarketId,
    },
    Resolve {
        market_id: MarketId,
        outcome: Resolution,
        pnl: f64,
    },
    Snapshot(Snapshot),
}

/// One line of the event log.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub ts: Timestamp,
    pub kind: EventKind,
    pub payload: EventPayload,
}

impl EventRecord {
    pub fn trade(trade: &TradeEvent) -> Self {
        Self {
            ts: trade.timestamp,
            kind: EventKind::Trade,
            payload: EventPayload::Trade {
                market_id: trade.market_id.clone(),
                price: trade.yes_price,
                size: trade.size,
                taker_side: trade.taker_side,
            },
        }
    }

    pub fn fill(fill: &Fill) -> Self {
        Self {
            ts: fill.timestamp,
            kind: EventKind::Fill,
            payload: EventPayload::Fill(fill.clone()),
        }
    }

    pub fn open(ts: Timestamp, market_id: &str) -> Self {
        Self {
            ts,
            kind: EventKind::Open,
            payload: EventPayload::Lifecycle {
                market_id: market_id.to_string(),
            },
        }
    }

    pub fn close(ts: Timestamp, market_id: &str) -> Self {
        Self {
            ts,
            kind: EventKind::Close,
            payload: EventPayload::Lifecycle {
                market_id: market_id.to_string(),
            },
        }
    }

    pub fn resolve(ts: Timestamp, market_id: &str, outcome: Resolution, pnl: f64) -> Self {
        Self {
            ts,
            kind: EventKind::Resolve,
            payload: EventPayload::Resolve {
                market_id: market_id.to_string(),
                outcome,
                pnl,
            },
        }
    }

    pub fn snapshot(snapshot: &Snapshot) -> Self {
        Self {
            ts: snapshot.timestamp,
            kind: EventKind::Snapshot,
            payload: EventPayload::Snapshot(snapshot.clone()),
        }
    }
}

/// Destination for event records.
pub trait EventSink {
    fn record(&mut self, record: &EventRecord) -> Result<(), EngineError>;
}

/// Writes one JSON object per line to any `Write`.
pub struct NdjsonSink<W: Write> {
    out: W,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for NdjsonSink<W> {
    fn record(&mut self, record: &EventRecord) -> Result<(), EngineError> {
        serde_json::to_writer(&mut self.out, record).map_err(std::io::Error::from)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

/// Retains typed records in memory. For tests and small runs.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<EventRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for VecSink {
    fn record(&mut self, record: &EventRecord) -> Result<(), EngineError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _record: &EventRecord) -> Result<(), EngineError> {
        Ok(())
    }
}
