//! Stored price records and ticker snapshot normalization
//!
//! A `PriceRecord` is one row of the append-only snapshot store. The relay
//! never broadcasts raw records; each one is normalized into a
//! `TickerSnapshot` and validated first. Records violating the quote
//! invariant (`bid > 0`, `ask > 0`, `bid <= ask`) are rejected and are never
//! cached or delivered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::format_timestamp_ms;

/// One price record as persisted in the snapshot store.
///
/// Produced by the ingestion path; immutable once read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRecord {
    /// Record time, UTC.
    pub time: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
}

impl PriceRecord {
    pub fn new(time: DateTime<Utc>, bid: f64, ask: f64) -> Self {
        Self { time, bid, ask }
    }
}

/// Why a stored record failed normalization.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum InvalidTick {
    #[error("non-finite quote: bid {bid}, ask {ask}")]
    NonFinite { bid: f64, ask: f64 },

    #[error("non-positive bid: {0}")]
    NonPositiveBid(f64),

    #[error("non-positive ask: {0}")]
    NonPositiveAsk(f64),

    #[error("crossed quote: bid {bid} > ask {ask}")]
    Crossed { bid: f64, ask: f64 },
}

/// Normalized, validated representation of one price update.
///
/// This is exactly the payload of a `ticker` wire message: `mid` is derived
/// as `(bid + ask) / 2` and `timestamp` is pre-formatted as ISO-8601 with
/// millisecond precision, UTC, `Z` suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
    pub timestamp: String,
}

impl TickerSnapshot {
    /// Normalize a stored record into a broadcastable snapshot.
    ///
    /// Enforces the quote invariant; a rejected record must be skipped by the
    /// caller, never retried.
    pub fn from_record(symbol: &str, record: &PriceRecord) -> Result<Self, InvalidTick> {
        let PriceRecord { time, bid, ask } = *record;

        if !bid.is_finite() || !ask.is_finite() {
            return Err(InvalidTick::NonFinite { bid, ask });
        }
        if bid <= 0.0 {
            return Err(InvalidTick::NonPositiveBid(bid));
        }
        if ask <= 0.0 {
            return Err(InvalidTick::NonPositiveAsk(ask));
        }
        if bid > ask {
            return Err(InvalidTick::Crossed { bid, ask });
        }

        Ok(Self {
            symbol: symbol.to_string(),
            bid,
            ask,
            mid: (bid + ask) / 2.0,
            timestamp: format_timestamp_ms(time),
        })
    }
}
