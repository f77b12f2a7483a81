//! Wire protocol pushed to subscribers
//!
//! Every message is one JSON object discriminated by a `type` tag:
//! `ticker`, `heartbeat`, or `error`.

use serde::{Deserialize, Serialize};

use crate::tick::TickerSnapshot;
use crate::time::utc_now_iso;

/// One push message on the subscriber channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayMessage {
    /// A validated price update (also sent once to late joiners from cache).
    Ticker(TickerSnapshot),
    /// Periodic liveness signal, independent of data activity.
    Heartbeat { timestamp: String },
    /// A subscriber-visible failure, e.g. the snapshot store being down.
    Error {
        code: String,
        message: String,
        timestamp: String,
    },
}

impl RelayMessage {
    /// Heartbeat stamped with the current UTC time.
    pub fn heartbeat_now() -> Self {
        Self::Heartbeat {
            timestamp: utc_now_iso(),
        }
    }

    /// Error event stamped with the current UTC time.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
            timestamp: utc_now_iso(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_ticker_message_wire_shape() {
        let msg = RelayMessage::Ticker(TickerSnapshot {
            symbol: "USD_JPY".to_string(),
            bid: 150.01,
            ask: 150.03,
            mid: 150.02,
            timestamp: "2024-03-01T12:00:00.123Z".to_string(),
        });

        let value: Value = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(value["type"], "ticker");
        assert_eq!(value["symbol"], "USD_JPY");
        assert_eq!(value["bid"], 150.01);
        assert_eq!(value["ask"], 150.03);
        assert_eq!(value["mid"], 150.02);
        assert_eq!(value["timestamp"], "2024-03-01T12:00:00.123Z");
    }

    #[test]
    fn test_heartbeat_message_wire_shape() {
        let msg = RelayMessage::Heartbeat {
            timestamp: "2024-03-01T12:00:30.000Z".to_string(),
        };
        let value: Value = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(value["type"], "heartbeat");
        assert_eq!(value["timestamp"], "2024-03-01T12:00:30.000Z");
    }

    #[test]
    fn test_error_message_wire_shape() {
        let msg = RelayMessage::error("DB_POLLING_FAILED", "ticker db polling failed");
        let value: Value = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "DB_POLLING_FAILED");
        assert_eq!(value["message"], "ticker db polling failed");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_round_trip() {
        let msg = RelayMessage::error("UNSUPPORTED_PATH", "unsupported path: /ws/other");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: RelayMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }
}
