//! Connection supervisor for the gateway stream
//!
//! A single tokio task owns the WebSocket, the subscription registry and the
//! backoff state; the facade talks to it over a command channel. Keeping all
//! three behind one task makes the on-open replay and inbound dispatch atomic
//! with respect to subscribe/unsubscribe, with no locks anywhere.
//!
//! Lifecycle: idle until the first subscribe, then dial → replay → serve →
//! close → back off → dial again, forever. Only a shutdown command (or the
//! facade being dropped) ends the cycle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use chartfeed_core::{BarListener, FeedStatus, StatusListener, SubscriptionKey};

use crate::config::DatafeedConfig;
use crate::subscription::SubscriptionRegistry;
use crate::types::{StreamEvent, StreamRequest};

/// Stream endpoint path on the gateway
const WS_PATH: &str = "/api/v1/ws";

/// First reconnect delay after a close
const RECONNECT_DELAY_FLOOR: Duration = Duration::from_millis(1000);

/// Reconnect delay ceiling; doubling stops here
const RECONNECT_DELAY_CEILING: Duration = Duration::from_millis(10_000);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Backoff tuning for the reconnect cycle
///
/// The defaults are the gateway contract; tests shrink them to keep
/// reconnect scenarios fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first retry after a close
    pub initial_delay: Duration,
    /// Cap on the doubled delay
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: RECONNECT_DELAY_FLOOR,
            max_delay: RECONNECT_DELAY_CEILING,
        }
    }
}

/// Doubling delay between failed connection attempts
///
/// Consuming the delay doubles it; only a successful open resets it to the
/// floor. A mere attempt never does.
#[derive(Debug)]
struct Backoff {
    config: ReconnectConfig,
    current: Duration,
}

impl Backoff {
    fn new(config: ReconnectConfig) -> Self {
        Self {
            current: config.initial_delay,
            config,
        }
    }

    /// Delay to wait before the next attempt
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.config.max_delay);
        delay
    }

    fn reset(&mut self) {
        self.current = self.config.initial_delay;
    }
}

/// Commands from the facade to the supervisor task
pub(crate) enum StreamCommand {
    Subscribe {
        key: SubscriptionKey,
        listener: BarListener,
    },
    Unsubscribe {
        key: SubscriptionKey,
    },
    Shutdown,
}

impl std::fmt::Debug for StreamCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamCommand::Subscribe { key, .. } => f
                .debug_struct("Subscribe")
                .field("key", key)
                .finish_non_exhaustive(),
            StreamCommand::Unsubscribe { key } => {
                f.debug_struct("Unsubscribe").field("key", key).finish()
            }
            StreamCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Spawn the supervisor task for a configured gateway
pub(crate) fn spawn_supervisor(
    config: DatafeedConfig,
) -> (mpsc::UnboundedSender<StreamCommand>, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let supervisor = Supervisor::new(config);
    let task = tokio::spawn(supervisor.run(command_rx));
    (command_tx, task)
}

/// How one connection's serve loop ended
enum SocketEnd {
    /// Socket is gone; close handling and backoff follow
    Disconnected,
    /// Shutdown requested; no reconnect
    Shutdown,
}

/// Outcome of sitting out the backoff delay
enum BackoffEnd {
    Retry,
    Shutdown,
}

struct Supervisor {
    ws_url: String,
    on_status: Option<StatusListener>,
    registry: SubscriptionRegistry,
    backoff: Backoff,
}

impl Supervisor {
    fn new(config: DatafeedConfig) -> Self {
        let ws_url = format!("{}{}", config.ws_base(), WS_PATH);
        Self {
            ws_url,
            on_status: config.on_status,
            registry: SubscriptionRegistry::new(),
            backoff: Backoff::new(config.reconnect),
        }
    }

    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<StreamCommand>) {
        // Idle: no connection until somebody actually subscribes
        info!("[Datafeed WS] Waiting for subscriptions before connecting");
        loop {
            match command_rx.recv().await {
                Some(StreamCommand::Subscribe { key, listener }) => {
                    self.registry.subscribe(key, listener);
                    break;
                }
                Some(StreamCommand::Unsubscribe { key }) => {
                    // Nothing tracked yet; defined no-op
                    self.registry.unsubscribe(&key);
                }
                Some(StreamCommand::Shutdown) | None => {
                    info!("[Datafeed WS] Shut down before first connection");
                    return;
                }
            }
        }

        // Connect cycle: dial, serve, close, back off, dial again
        loop {
            self.notify(FeedStatus::Reconnect);
            info!("[Datafeed WS] Connecting to {}", self.ws_url);

            match connect_async(self.ws_url.as_str()).await {
                Ok((stream, _)) => {
                    info!("[Datafeed WS] Connected");
                    self.backoff.reset();
                    self.notify(FeedStatus::Open);

                    let (mut sink, mut source) = stream.split();
                    self.replay_subscriptions(&mut sink).await;

                    match self.serve(&mut sink, &mut source, &mut command_rx).await {
                        SocketEnd::Shutdown => {
                            let _ = sink.send(Message::Close(None)).await;
                            info!("[Datafeed WS] Shut down");
                            return;
                        }
                        SocketEnd::Disconnected => {
                            self.notify(FeedStatus::Close);
                        }
                    }
                }
                Err(e) => {
                    // A failed dial reports error then close; the close is
                    // what schedules the retry
                    error!("[Datafeed WS] Connection failed: {}", e);
                    self.notify(FeedStatus::Error);
                    self.notify(FeedStatus::Close);
                }
            }

            match self.wait_backoff(&mut command_rx).await {
                BackoffEnd::Retry => continue,
                BackoffEnd::Shutdown => {
                    info!("[Datafeed WS] Shut down during reconnect wait");
                    return;
                }
            }
        }
    }

    /// Serve one live connection until it drops or shutdown is requested
    async fn serve(
        &mut self,
        sink: &mut WsSink,
        source: &mut WsSource,
        command_rx: &mut mpsc::UnboundedReceiver<StreamCommand>,
    ) -> SocketEnd {
        loop {
            tokio::select! {
                message = source.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(text.as_str());
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if !Self::send_raw(sink, Message::Pong(data)).await {
                                self.notify(FeedStatus::Error);
                                return SocketEnd::Disconnected;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("[Datafeed WS] Connection closed by server");
                            return SocketEnd::Disconnected;
                        }
                        Some(Err(e)) => {
                            // Error notifies only; the close handling that
                            // follows drives the retry
                            error!("[Datafeed WS] Transport error: {}", e);
                            self.notify(FeedStatus::Error);
                            return SocketEnd::Disconnected;
                        }
                        None => {
                            info!("[Datafeed WS] Stream ended");
                            return SocketEnd::Disconnected;
                        }
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(StreamCommand::Subscribe { key, listener }) => {
                            // Duplicate subscribe frames for a key are
                            // harmless, so send unconditionally while open
                            let request = StreamRequest::subscribe(&key.symbol, &key.period);
                            self.registry.subscribe(key, listener);
                            if !Self::send_request(sink, request).await {
                                self.notify(FeedStatus::Error);
                                return SocketEnd::Disconnected;
                            }
                        }
                        Some(StreamCommand::Unsubscribe { key }) => {
                            if self.registry.unsubscribe(&key) {
                                let request =
                                    StreamRequest::unsubscribe(&key.symbol, &key.period);
                                if !Self::send_request(sink, request).await {
                                    self.notify(FeedStatus::Error);
                                    return SocketEnd::Disconnected;
                                }
                            }
                        }
                        Some(StreamCommand::Shutdown) | None => {
                            return SocketEnd::Shutdown;
                        }
                    }
                }
            }
        }
    }

    /// Re-send a subscribe intent for every tracked key
    ///
    /// This is the step that makes reconnection transparent: after a drop no
    /// caller has to do anything for its live data to resume.
    async fn replay_subscriptions(&self, sink: &mut WsSink) {
        if self.registry.is_empty() {
            return;
        }
        info!(
            "[Datafeed WS] Replaying {} subscriptions",
            self.registry.len()
        );
        for key in self.registry.keys() {
            let request = StreamRequest::subscribe(&key.symbol, &key.period);
            // A failed send here means the socket already died; the serve
            // loop notices on its first poll
            let _ = Self::send_request(sink, request).await;
        }
    }

    /// Decode one inbound text frame and route it
    fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<StreamEvent>(text) {
            Ok(StreamEvent::Bar {
                symbol,
                period,
                bar,
            }) => {
                let key = SubscriptionKey::from_wire(symbol, period);
                let delivered = self.registry.dispatch(&key, &bar.to_bar());
                trace!(
                    "[Datafeed WS] Bar for {} delivered to {} listeners",
                    key,
                    delivered
                );
            }
            Ok(StreamEvent::Subscribed { symbol, period }) => {
                debug!("[Datafeed WS] Subscription confirmed for {}|{}", symbol, period);
            }
            Ok(StreamEvent::Error { reason }) => {
                warn!("[Datafeed WS] Gateway error: {}", reason);
            }
            Ok(StreamEvent::Status { message, level, .. }) => {
                debug!(
                    "[Datafeed WS] Gateway status ({}): {}",
                    level.as_deref().unwrap_or("info"),
                    message
                );
            }
            Err(_) => {
                debug!("[Datafeed WS] Ignoring unrecognized frame: {}", text);
            }
        }
    }

    /// Serialize and transmit one frame; false means the socket is dead
    async fn send_request(sink: &mut WsSink, request: StreamRequest) -> bool {
        match serde_json::to_string(&request) {
            Ok(json) => {
                debug!("[Datafeed WS] Sending {}", json);
                Self::send_raw(sink, Message::Text(json.into())).await
            }
            Err(e) => {
                warn!("[Datafeed WS] Failed to encode frame: {}", e);
                false
            }
        }
    }

    async fn send_raw(sink: &mut WsSink, message: Message) -> bool {
        if let Err(e) = sink.send(message).await {
            warn!("[Datafeed WS] Failed to send frame: {}", e);
            return false;
        }
        true
    }

    /// Sit out the current backoff delay while staying responsive
    ///
    /// A subscribe arriving mid-wait triggers an immediate dial instead of
    /// waiting out the timer. The doubled delay is kept for the next failure;
    /// only a successful open resets it.
    async fn wait_backoff(
        &mut self,
        command_rx: &mut mpsc::UnboundedReceiver<StreamCommand>,
    ) -> BackoffEnd {
        let delay = self.backoff.next_delay();
        info!("[Datafeed WS] Reconnecting in {:?}", delay);
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return BackoffEnd::Retry,

                command = command_rx.recv() => {
                    match command {
                        Some(StreamCommand::Subscribe { key, listener }) => {
                            self.registry.subscribe(key, listener);
                            return BackoffEnd::Retry;
                        }
                        Some(StreamCommand::Unsubscribe { key }) => {
                            self.registry.unsubscribe(&key);
                        }
                        Some(StreamCommand::Shutdown) | None => {
                            return BackoffEnd::Shutdown;
                        }
                    }
                }
            }
        }
    }

    /// Status callbacks are observe-only; a panicking observer must not take
    /// the supervisor down with it
    fn notify(&self, status: FeedStatus) {
        if let Some(listener) = &self.on_status {
            if catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                warn!("[Datafeed WS] Status listener panicked on {}", status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_ceiling() {
        let mut backoff = Backoff::new(ReconnectConfig::default());
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(4000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(8000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10_000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_backoff_resets_to_floor_only_on_reset() {
        let mut backoff = Backoff::new(ReconnectConfig::default());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_custom_bounds() {
        let mut backoff = Backoff::new(ReconnectConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(150),
        });
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        // 200ms would overshoot; the cap clamps it
        assert_eq!(backoff.next_delay(), Duration::from_millis(150));
        assert_eq!(backoff.next_delay(), Duration::from_millis(150));
    }

    #[test]
    fn test_default_reconnect_config_matches_contract() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_millis(1000));
        assert_eq!(config.max_delay, Duration::from_millis(10_000));
    }
}
