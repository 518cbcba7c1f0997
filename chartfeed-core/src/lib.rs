//! Core types for the chartfeed market-data gateway client
//!
//! This crate defines the shared data structures used across the datafeed:
//! bar periods and their wire tokens, symbol and bar records, subscription
//! identities, and the error taxonomy.

pub mod error;
pub mod market;
pub mod period;
pub mod stream;

pub use error::{FeedError, FeedResult};
pub use market::{Bar, HistoryTime, SymbolInfo};
pub use period::{Period, Timespan};
pub use stream::{BarListener, FeedStatus, StatusListener, SubscriptionKey};
