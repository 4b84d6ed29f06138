//! Stream subscriptions and venue stream names.
//!
//! Stream names follow the venue convention: lower-case symbol, `@`, stream
//! kind, and optional parameters (`btcusdt@depth10@100ms`).

use crate::error::TransportError;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Subscribes to venue streams and tracks which ones are active.
///
/// Subscribing to an already active stream is a no-op, as is unsubscribing
/// from an inactive one.
pub struct StreamClient {
    transport: Arc<dyn Transport>,
    active: Mutex<BTreeSet<String>>,
}

impl StreamClient {
    /// Creates a new stream client over a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            active: Mutex::new(BTreeSet::new()),
        }
    }

    /// Subscribes to a stream by its full name.
    ///
    /// # Errors
    /// Returns `TransportError` if the subscription fails.
    pub async fn subscribe(&self, stream: String) -> Result<String, TransportError> {
        if self.active.lock().contains(&stream) {
            tracing::debug!("Already subscribed to {}", stream);
            return Ok(stream);
        }
        self.transport.subscribe(&stream).await?;
        self.active.lock().insert(stream.clone());
        tracing::info!("Subscribed to {}", stream);
        Ok(stream)
    }

    /// Unsubscribes from a stream by its full name.
    ///
    /// # Errors
    /// Returns `TransportError` if the request fails.
    pub async fn unsubscribe(&self, stream: &str) -> Result<(), TransportError> {
        if !self.active.lock().contains(stream) {
            return Ok(());
        }
        self.transport.unsubscribe(stream).await?;
        self.active.lock().remove(stream);
        tracing::info!("Unsubscribed from {}", stream);
        Ok(())
    }

    /// Returns true if the stream is active.
    #[must_use]
    pub fn is_subscribed(&self, stream: &str) -> bool {
        self.active.lock().contains(stream)
    }

    /// Returns the active streams in name order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.active.lock().iter().cloned().collect()
    }

    /// Forgets every active stream, e.g. after the transport reconnected
    /// without restoring them.
    pub fn reset(&self) {
        self.active.lock().clear();
    }

    /// Closes the underlying transport and forgets every stream.
    ///
    /// # Errors
    /// Returns `TransportError` if the close handshake fails.
    pub async fn close(&self) -> Result<(), TransportError> {
        self.reset();
        self.transport.close().await
    }
}

fn lower(symbol: &str) -> String {
    symbol.to_ascii_lowercase()
}

/// Stream name for individual trades.
#[must_use]
pub fn trades_stream(symbol: &str) -> String {
    format!("{}@trade", lower(symbol))
}

/// Stream name for aggregated trades.
#[must_use]
pub fn agg_trades_stream(symbol: &str) -> String {
    format!("{}@aggTrade", lower(symbol))
}

/// Stream name for candlesticks.
#[must_use]
pub fn bars_stream(symbol: &str, interval: &str) -> String {
    format!("{}@kline_{}", lower(symbol), interval)
}

/// Stream name for the rolling ticker.
#[must_use]
pub fn ticker_stream(symbol: &str) -> String {
    format!("{}@ticker", lower(symbol))
}

/// Stream name for best bid/offer.
#[must_use]
pub fn book_ticker_stream(symbol: &str) -> String {
    format!("{}@bookTicker", lower(symbol))
}

/// Stream name for partial book depth.
#[must_use]
pub fn partial_depth_stream(symbol: &str, depth: u32, speed_ms: u32) -> String {
    format!("{}@depth{}@{}ms", lower(symbol), depth, speed_ms)
}

/// Stream name for incremental book depth.
#[must_use]
pub fn diff_depth_stream(symbol: &str, speed_ms: u32) -> String {
    format!("{}@depth@{}ms", lower(symbol), speed_ms)
}
