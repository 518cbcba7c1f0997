//! Market data structures for the charting datafeed

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tradable symbol as returned by the gateway's search endpoint
///
/// Purely descriptive; the client never interprets these fields beyond
/// handing them to the charting layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Symbol code, e.g. "600519.SH"
    pub symbol: String,

    /// Human-readable name
    pub name: String,

    /// Listing exchange code
    pub exchange: String,

    /// Asset class, e.g. "stock" (wire field is `type`)
    #[serde(rename = "type")]
    pub asset_type: String,

    /// Quote currency
    pub currency: String,

    /// IANA timezone of the exchange
    pub timezone: String,
}

/// One OHLCV interval record for a symbol/period pair
///
/// The OHLC ordering invariants (high >= open/close/low, ...) are the
/// gateway's to uphold; the client consumes the values as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Interval start, epoch milliseconds UTC
    pub timestamp: i64,

    /// Opening price
    pub open: f64,

    /// Highest price during the interval
    pub high: f64,

    /// Lowest price during the interval
    pub low: f64,

    /// Closing (or latest) price
    pub close: f64,

    /// Traded volume during the interval
    pub volume: f64,

    /// Traded turnover, when the gateway provides it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// True once the interval is finalized; absent while still forming.
    /// Absence is kept as `None`, never defaulted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_closed: Option<bool>,
}

/// A point in time as accepted by the history endpoint
///
/// The gateway takes either epoch milliseconds or a calendar date, and which
/// one is appropriate depends on the period being requested: millisecond
/// bounds for minute periods, date bounds for day/week/month. The client
/// passes through whichever the caller supplies without validating the
/// pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryTime {
    /// Epoch milliseconds UTC
    Millis(i64),
    /// Calendar date, rendered as `YYYY-MM-DD`
    Date(NaiveDate),
}

impl HistoryTime {
    /// Query-parameter rendering expected by the gateway
    pub fn to_query_value(&self) -> String {
        match self {
            HistoryTime::Millis(ms) => ms.to_string(),
            HistoryTime::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for HistoryTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_value())
    }
}

impl From<i64> for HistoryTime {
    fn from(ms: i64) -> Self {
        HistoryTime::Millis(ms)
    }
}

impl From<NaiveDate> for HistoryTime {
    fn from(date: NaiveDate) -> Self {
        HistoryTime::Date(date)
    }
}
