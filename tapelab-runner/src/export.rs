//! Artifact export and event-log replay.
//!
//! Writers produce the on-disk outputs of a run: an equity-curve CSV and
//! the NDJSON event log. The reader parses a log back for replay and
//! tolerates unknown fields and kinds, so newer logs stay readable.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tapelab_core::domain::Snapshot;
use tapelab_core::engine::EventRecord;

/// One parsed event-log line. `payload` stays loosely typed so readers
/// survive schema growth; unknown top-level fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    pub ts: i64,
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub fn write_equity_csv(path: &Path, snapshots: &[Snapshot]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create equity CSV {}", path.display()))?;
    writeln!(file, "timestamp,datetime,cash,equity,realized_pnl,unrealized_pnl")?;
    for snap in snapshots {
        writeln!(
            file,
            "{},{},{:.6},{:.6},{:.6},{:.6}",
            snap.timestamp,
            format_ts(snap.timestamp),
            snap.cash,
            snap.equity,
            snap.realized_pnl,
            snap.unrealized_pnl,
        )?;
    }
    Ok(())
}

pub fn write_event_log(path: &Path, records: &[EventRecord]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create event log {}", path.display()))?;
    for record in records {
        serde_json::to_writer(&mut file, record)
            .with_context(|| format!("failed to serialize event at ts {}", record.ts))?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

pub fn read_event_log(path: &Path) -> Result<Vec<LogRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open event log {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord = serde_json::from_str(&line)
            .with_context(|| format!("malformed event log line {}", line_no + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn format_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
