//! Datafeed configuration

use std::fmt;
use std::time::Duration;

use url::Url;

use chartfeed_core::StatusListener;

use crate::websocket::ReconnectConfig;

/// Default REST request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`GatewayDatafeed`](crate::GatewayDatafeed)
///
/// Only `base_url` is required; the stream endpoint is derived from it by
/// swapping the scheme (http → ws, https → wss) unless `ws_url` overrides it.
#[derive(Clone)]
pub struct DatafeedConfig {
    /// REST base, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Explicit stream base; derived from `base_url` when `None`
    pub ws_url: Option<String>,
    /// Observer for connection status transitions
    pub on_status: Option<StatusListener>,
    /// Reconnect backoff tuning
    pub reconnect: ReconnectConfig,
    /// REST client timeout
    pub request_timeout: Duration,
}

impl DatafeedConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ws_url: None,
            on_status: None,
            reconnect: ReconnectConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// REST base with any trailing slash stripped
    pub(crate) fn rest_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Stream base: the explicit override, or `base_url` with its scheme
    /// swapped to the WebSocket equivalent
    pub(crate) fn ws_base(&self) -> String {
        match &self.ws_url {
            Some(ws) => ws.trim_end_matches('/').to_string(),
            None => derive_ws_base(self.rest_base()),
        }
    }
}

impl fmt::Debug for DatafeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatafeedConfig")
            .field("base_url", &self.base_url)
            .field("ws_url", &self.ws_url)
            .field("on_status", &self.on_status.as_ref().map(|_| "<listener>"))
            .field("reconnect", &self.reconnect)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn derive_ws_base(rest_base: &str) -> String {
    if let Ok(mut url) = Url::parse(rest_base) {
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        if url.set_scheme(scheme).is_ok() {
            let mut base = url.to_string();
            while base.ends_with('/') {
                base.pop();
            }
            return base;
        }
    }
    // Not an absolute http(s) URL; fall back to the literal prefix swap
    match rest_base.strip_prefix("http") {
        Some(rest) => format!("ws{rest}"),
        None => rest_base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_stripped() {
        let config = DatafeedConfig::new("http://localhost:8000/");
        assert_eq!(config.rest_base(), "http://localhost:8000");
    }

    #[test]
    fn test_ws_base_derived_from_http() {
        let config = DatafeedConfig::new("http://localhost:8000");
        assert_eq!(config.ws_base(), "ws://localhost:8000");
    }

    #[test]
    fn test_ws_base_derived_from_https() {
        let config = DatafeedConfig::new("https://gateway.example.com/feed/");
        assert_eq!(config.ws_base(), "wss://gateway.example.com/feed");
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let mut config = DatafeedConfig::new("http://localhost:8000");
        config.ws_url = Some("ws://stream.example.com/".to_string());
        assert_eq!(config.ws_base(), "ws://stream.example.com");
    }

    #[test]
    fn test_debug_redacts_listener() {
        let mut config = DatafeedConfig::new("http://localhost:8000");
        config.on_status = Some(std::sync::Arc::new(|_| {}));
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<listener>"));
    }
}
