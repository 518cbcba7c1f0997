//! Gateway REST client
//!
//! Stateless request/response against the gateway's search and history
//! endpoints. No retries and no caching: a failed call surfaces exactly once
//! and retry policy stays with the caller.

use tracing::{debug, instrument, warn};

use chartfeed_core::{Bar, FeedError, FeedResult, HistoryTime, Period, SymbolInfo};

use crate::config::DatafeedConfig;
use crate::types::{BarPayload, HistoryResponse, SymbolSearchResponse};

const SEARCH_PATH: &str = "/api/v1/symbols/search";
const HISTORY_PATH: &str = "/api/v1/bars/history";

/// Default `limit` for symbol search
const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// REST accessor for the gateway
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &DatafeedConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config.rest_base().to_string(),
        }
    }

    /// Search tradable symbols by free-text query
    ///
    /// An empty or whitespace-only query resolves to an empty list without
    /// touching the network; that is the contract, not an error.
    #[instrument(skip(self))]
    pub async fn search_symbols(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> FeedResult<Vec<SymbolInfo>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        debug!("Searching symbols: query={}, limit={}", query, limit);

        let response = self
            .http
            .get(&url)
            .query(&[("q", query), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(|e| FeedError::transport(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("Symbol search returned status {}", status);
            return Err(FeedError::request_failed("search", status));
        }

        let payload: SymbolSearchResponse = response
            .json()
            .await
            .map_err(|e| FeedError::malformed("search", e.to_string()))?;

        debug!("Search returned {} symbols", payload.items.len());
        Ok(payload.items)
    }

    /// Fetch historical bars for one symbol and period
    ///
    /// `from`/`to` pass through verbatim; callers use millisecond bounds for
    /// minute periods and date bounds for day/week/month, per the gateway
    /// contract.
    #[instrument(skip(self))]
    pub async fn history_bars(
        &self,
        symbol: &str,
        period: Period,
        from: HistoryTime,
        to: HistoryTime,
        limit: Option<u32>,
    ) -> FeedResult<Vec<Bar>> {
        let url = format!("{}{}", self.base_url, HISTORY_PATH);
        let token = period.token();
        debug!(
            "Fetching history: symbol={}, period={}, from={}, to={}",
            symbol, token, from, to
        );

        let mut params: Vec<(&str, String)> = vec![
            ("symbol", symbol.to_string()),
            ("period", token),
            ("from", from.to_query_value()),
            ("to", to.to_query_value()),
        ];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| FeedError::transport(format!("history request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("History fetch returned status {}", status);
            return Err(FeedError::request_failed("history", status));
        }

        let payload: HistoryResponse = response
            .json()
            .await
            .map_err(|e| FeedError::malformed("history", e.to_string()))?;

        debug!("History returned {} bars", payload.items.len());
        Ok(payload.items.iter().map(BarPayload::to_bar).collect())
    }
}
