//! Gateway wire types
//!
//! These mirror the gateway's REST and WebSocket payloads and are converted
//! to chartfeed-core types before reaching the charting layer.

use serde::{Deserialize, Serialize};

use chartfeed_core::{Bar, SymbolInfo};

// ============================================================================
// REST payloads
// ============================================================================

/// Envelope for `GET /api/v1/symbols/search`
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolSearchResponse {
    /// Matching symbols
    pub items: Vec<SymbolInfo>,
}

/// Envelope for `GET /api/v1/bars/history`
///
/// The gateway also echoes `symbol`, `period` and a `next_from` pagination
/// hint; the client only consumes the bars.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    /// Bars as sent by the gateway, oldest first
    pub items: Vec<BarPayload>,
}

/// A bar in gateway wire form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarPayload {
    /// Interval start, UTC milliseconds
    pub ts: i64,

    /// Opening price
    pub open: f64,

    /// High of the interval
    pub high: f64,

    /// Low of the interval
    pub low: f64,

    /// Closing (or latest) price
    pub close: f64,

    /// Traded volume
    pub volume: f64,

    /// Traded turnover, when the upstream source reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// True once the interval is finalized; absent while forming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_closed: Option<bool>,
}

impl BarPayload {
    /// Convert to the caller-facing [`Bar`] shape
    pub fn to_bar(&self) -> Bar {
        Bar {
            timestamp: self.ts,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            amount: self.amount,
            is_closed: self.is_closed,
        }
    }
}

// ============================================================================
// WebSocket frames
// ============================================================================

/// Outbound frame: a subscription intent for one (symbol, period) key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StreamRequest {
    Subscribe { symbol: String, period: String },
    Unsubscribe { symbol: String, period: String },
}

impl StreamRequest {
    pub fn subscribe(symbol: impl Into<String>, period: impl Into<String>) -> Self {
        StreamRequest::Subscribe {
            symbol: symbol.into(),
            period: period.into(),
        }
    }

    pub fn unsubscribe(symbol: impl Into<String>, period: impl Into<String>) -> Self {
        StreamRequest::Unsubscribe {
            symbol: symbol.into(),
            period: period.into(),
        }
    }
}

/// Inbound frame from the gateway
///
/// Only `bar` carries data the client dispatches. `subscribed`, `error` and
/// `status` are logged and dropped; any op outside this set fails the parse
/// and the supervisor ignores the frame (forward compatibility).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Live bar update for one subscription key
    Bar {
        symbol: String,
        period: String,
        bar: BarPayload,
    },
    /// Acknowledgement of a subscribe request
    Subscribed { symbol: String, period: String },
    /// Server-side error report; the socket itself stays up
    Error { reason: String },
    /// Free-form gateway status push
    Status {
        message: String,
        #[serde(default)]
        level: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_json() {
        let frame = StreamRequest::subscribe("600519.SH", "1m");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            json,
            r#"{"op":"subscribe","symbol":"600519.SH","period":"1m"}"#
        );
    }

    #[test]
    fn test_unsubscribe_frame_json() {
        let frame = StreamRequest::unsubscribe("000001.SZ", "1d");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            json,
            r#"{"op":"unsubscribe","symbol":"000001.SZ","period":"1d"}"#
        );
    }

    #[test]
    fn test_bar_event_parses() {
        let json = r#"{
            "op": "bar",
            "symbol": "600519.SH",
            "period": "5m",
            "bar": {"ts": 1700000000000, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 100.0}
        }"#;
        match serde_json::from_str::<StreamEvent>(json).unwrap() {
            StreamEvent::Bar {
                symbol,
                period,
                bar,
            } => {
                assert_eq!(symbol, "600519.SH");
                assert_eq!(period, "5m");
                assert_eq!(bar.ts, 1_700_000_000_000);
                assert_eq!(bar.amount, None);
                assert_eq!(bar.is_closed, None);
            }
            other => panic!("expected bar event, got {other:?}"),
        }
    }

    #[test]
    fn test_known_non_bar_events_parse() {
        let ack: StreamEvent =
            serde_json::from_str(r#"{"op":"subscribed","symbol":"600519.SH","period":"1m"}"#)
                .unwrap();
        assert!(matches!(ack, StreamEvent::Subscribed { .. }));

        let err: StreamEvent =
            serde_json::from_str(r#"{"op":"error","reason":"unknown symbol"}"#).unwrap();
        assert!(matches!(err, StreamEvent::Error { .. }));

        let status: StreamEvent = serde_json::from_str(
            r#"{"op":"status","message":"source degraded","level":"warning","code":"SRC_DEGRADED"}"#,
        )
        .unwrap();
        assert!(matches!(status, StreamEvent::Status { .. }));
    }

    #[test]
    fn test_unknown_op_fails_parse() {
        // The supervisor treats a parse failure as an ignorable frame
        assert!(serde_json::from_str::<StreamEvent>(r#"{"op":"snapshot","last":10.0}"#).is_err());
        assert!(serde_json::from_str::<StreamEvent>("not json").is_err());
    }

    #[test]
    fn test_bar_payload_translation() {
        let payload = BarPayload {
            ts: 1_700_000_060_000,
            open: 10.0,
            high: 11.2,
            low: 9.8,
            close: 10.9,
            volume: 52_300.0,
            amount: Some(561_000.0),
            is_closed: Some(true),
        };
        let bar = payload.to_bar();
        assert_eq!(bar.timestamp, 1_700_000_060_000);
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.high, 11.2);
        assert_eq!(bar.low, 9.8);
        assert_eq!(bar.close, 10.9);
        assert_eq!(bar.volume, 52_300.0);
        assert_eq!(bar.amount, Some(561_000.0));
        assert_eq!(bar.is_closed, Some(true));
    }

    #[test]
    fn test_history_envelope_ignores_extra_fields() {
        let json = r#"{
            "symbol": "600519.SH",
            "period": "1d",
            "items": [{"ts": 1, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 0.0}],
            "next_from": 1700000000000
        }"#;
        let resp: HistoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 1);
    }
}
