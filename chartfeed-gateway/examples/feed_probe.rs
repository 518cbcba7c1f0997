//! Manual probe against a running chart gateway
//!
//! Run with: cargo run --example feed_probe -- http://127.0.0.1:8000
//!
//! Searches for an instrument, pulls recent minute history, then subscribes
//! to live bars and prints whatever arrives for thirty seconds.

use std::sync::Arc;
use std::time::Duration;

use chartfeed_gateway::{
    BarListener, DatafeedConfig, FeedStatus, GatewayDatafeed, HistoryTime, Period,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chartfeed_gateway=debug".into()),
        )
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
    println!("Probing gateway at {base_url}");

    let mut config = DatafeedConfig::new(&base_url);
    config.on_status = Some(Arc::new(|status: FeedStatus| {
        println!("[status] {status}");
    }));
    let feed = GatewayDatafeed::new(config);

    let symbol = match feed.search_symbols("SH", Some(5)).await {
        Ok(symbols) => {
            println!("Search returned {} instruments", symbols.len());
            for info in &symbols {
                println!("  {}  {} ({})", info.symbol, info.name, info.exchange);
            }
            symbols.first().map(|info| info.symbol.clone())
        }
        Err(e) => {
            println!("Search failed: {e}");
            None
        }
    }
    .unwrap_or_else(|| "600519.SH".to_string());

    let now = chrono::Utc::now().timestamp_millis();
    let day_ago = now - 24 * 60 * 60 * 1000;
    match feed
        .history_bars(
            &symbol,
            Period::minutes(5),
            HistoryTime::Millis(day_ago),
            HistoryTime::Millis(now),
            Some(10),
        )
        .await
    {
        Ok(bars) => {
            println!("History returned {} bars for {symbol}", bars.len());
            for bar in bars.iter().take(3) {
                println!(
                    "  ts={} o={} h={} l={} c={} v={}",
                    bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
                );
            }
        }
        Err(e) => println!("History failed: {e}"),
    }

    println!("Subscribing to {symbol} 1m bars for 30s...");
    let listener: BarListener = Arc::new(|bar| {
        println!(
            "[bar] ts={} o={} c={} closed={:?}",
            bar.timestamp, bar.open, bar.close, bar.is_closed
        );
    });
    if let Err(e) = feed.subscribe_bars(&symbol, Period::minutes(1), listener) {
        println!("Subscribe failed: {e}");
    }

    tokio::time::sleep(Duration::from_secs(30)).await;

    let _ = feed.unsubscribe_bars(&symbol, Period::minutes(1));
    feed.shutdown().await;
    println!("Done");
}
