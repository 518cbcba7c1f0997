//! Market-data gateway client
//!
//! Talks to the chart gateway over REST for symbol search and bar history,
//! and over a single multiplexed WebSocket for live bars. [`GatewayDatafeed`]
//! is the entry point; the modules underneath are public for direct use.

pub mod client;
pub mod config;
pub mod datafeed;
pub mod subscription;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use client::RestClient;
pub use config::DatafeedConfig;
pub use datafeed::GatewayDatafeed;
pub use subscription::SubscriptionRegistry;
pub use types::{BarPayload, StreamEvent, StreamRequest};
pub use websocket::ReconnectConfig;

// Core types, surfaced here so most callers need a single import
pub use chartfeed_core::{
    Bar, BarListener, FeedError, FeedResult, FeedStatus, HistoryTime, Period, StatusListener,
    SubscriptionKey, SymbolInfo, Timespan,
};
