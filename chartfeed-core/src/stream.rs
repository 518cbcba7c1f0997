//! Live-stream primitives shared between the client and its callers

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::market::Bar;
use crate::period::Period;

/// Connection status reported through the observer channel
///
/// Observe-only: nothing about reconnection depends on anybody watching
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    /// Socket opened and subscriptions replayed
    Open,
    /// Socket closed (a reconnect attempt follows)
    Close,
    /// Transport error; the close that follows drives recovery
    Error,
    /// About to dial (fires before the very first connect too)
    Reconnect,
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStatus::Open => write!(f, "open"),
            FeedStatus::Close => write!(f, "close"),
            FeedStatus::Error => write!(f, "error"),
            FeedStatus::Reconnect => write!(f, "reconnect"),
        }
    }
}

/// Canonical identity of one live subscription: symbol plus period token
///
/// Two fields rather than a joined string, so no separator can collide with
/// symbol contents. The `Display` form (`symbol|token`) only appears in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub symbol: String,
    pub period: String,
}

impl SubscriptionKey {
    pub fn new(symbol: impl Into<String>, period: Period) -> Self {
        Self {
            symbol: symbol.into(),
            period: period.token(),
        }
    }

    /// Key as carried by an inbound frame; the period token is taken verbatim
    /// so an unrecognized token simply never matches anything.
    pub fn from_wire(symbol: impl Into<String>, period_token: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            period: period_token.into(),
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.symbol, self.period)
    }
}

/// Callback handle receiving live bars
///
/// Subscription idempotency keys off the `Arc` allocation: subscribing the
/// same handle twice registers it once.
pub type BarListener = Arc<dyn Fn(Bar) + Send + Sync>;

/// Observer for [`FeedStatus`] transitions
pub type StatusListener = Arc<dyn Fn(FeedStatus) + Send + Sync>;
