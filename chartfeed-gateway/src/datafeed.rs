//! High-level datafeed facade
//!
//! One object bundles the REST accessor and the stream supervisor behind the
//! operations a charting frontend needs: symbol search, history, live bars.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use chartfeed_core::{
    Bar, BarListener, FeedError, FeedResult, HistoryTime, Period, SubscriptionKey, SymbolInfo,
};

use crate::client::RestClient;
use crate::config::DatafeedConfig;
use crate::websocket::{spawn_supervisor, StreamCommand};

/// Gateway-backed market datafeed
///
/// Cheap to construct: no network activity happens until the first REST call
/// or the first bar subscription. Each instance owns its own supervisor task;
/// dropping the datafeed without calling [`shutdown`](Self::shutdown) ends
/// the task on its next command poll.
#[derive(Debug)]
pub struct GatewayDatafeed {
    rest: RestClient,
    command_tx: mpsc::UnboundedSender<StreamCommand>,
    task: JoinHandle<()>,
}

impl GatewayDatafeed {
    /// Build the datafeed and spawn its connection supervisor
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: DatafeedConfig) -> Self {
        let rest = RestClient::new(&config);
        let (command_tx, task) = spawn_supervisor(config);
        Self {
            rest,
            command_tx,
            task,
        }
    }

    /// Search instruments by free-text query
    ///
    /// A blank query resolves to an empty list without touching the network.
    pub async fn search_symbols(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> FeedResult<Vec<SymbolInfo>> {
        self.rest.search_symbols(query, limit).await
    }

    /// Fetch closed historical bars for one symbol and period
    pub async fn history_bars(
        &self,
        symbol: &str,
        period: Period,
        from: HistoryTime,
        to: HistoryTime,
        limit: Option<u32>,
    ) -> FeedResult<Vec<Bar>> {
        self.rest.history_bars(symbol, period, from, to, limit).await
    }

    /// Register a listener for live bars on one (symbol, period)
    ///
    /// The first subscription triggers the initial connection attempt.
    /// Subscribing the same listener handle to the same key twice is a
    /// no-op; distinct listeners on one key each get every bar.
    pub fn subscribe_bars(
        &self,
        symbol: &str,
        period: Period,
        listener: BarListener,
    ) -> FeedResult<()> {
        let key = SubscriptionKey::new(symbol, period);
        debug!("[Datafeed] Subscribing {}", key);
        self.command_tx
            .send(StreamCommand::Subscribe { key, listener })
            .map_err(|_| FeedError::Closed)
    }

    /// Drop every listener for one (symbol, period)
    ///
    /// Unknown keys are a no-op.
    pub fn unsubscribe_bars(&self, symbol: &str, period: Period) -> FeedResult<()> {
        let key = SubscriptionKey::new(symbol, period);
        debug!("[Datafeed] Unsubscribing {}", key);
        self.command_tx
            .send(StreamCommand::Unsubscribe { key })
            .map_err(|_| FeedError::Closed)
    }

    /// Stop the supervisor, close any open socket and wait for the task
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(StreamCommand::Shutdown);
        let _ = self.task.await;
    }
}
