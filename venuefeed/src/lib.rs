//! # venuefeed
//!
//! Venue market data adapter for Rust.
//!
//! venuefeed turns a venue's WebSocket streams and HTTP market data endpoints
//! into normalized, instrument keyed records delivered through a single sink.
//!
//! ## Features
//!
//! - **Normalized records** - Quotes, trades, tickers, bars and book deltas
//!   keyed by canonical instrument ids
//! - **Synchronized order books** - Incremental updates buffered until a
//!   snapshot arrives, with stale updates discarded
//! - **Up-front validation** - Unsupported subscriptions are rejected before
//!   any network action
//! - **Correlated history** - Trades, bars and instruments answered under the
//!   caller's token
//!
//! ## Quick Start
//!
//! ```ignore
//! use venuefeed::prelude::*;
//!
//! let (sink, receiver) = venuefeed::channel::channel(65_536);
//! let client = MarketDataClientBuilder::new(transport, registry, Arc::new(sink))
//!     .account_type(AccountType::Spot)
//!     .build()?;
//!
//! client.connect().await?;
//! client
//!     .subscribe_order_book(&"BTCUSDT.BINANCE".parse()?, BookType::L2Mbp, Some(10), None)
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Identifiers, enumerations and the canonical record types
//! - [`channel`] - Consumer sinks
//! - [`client`] - Transport contract, stream and HTTP clients
//! - [`marketdata`] - Decoding, validation, book sync, dispatch and the client

pub mod prelude;

/// Canonical market data model.
pub mod core {
    pub use venuefeed_core::*;
}

/// Consumer sinks.
pub mod channel {
    pub use venuefeed_channel::*;
}

/// Venue transport and clients.
pub mod client {
    pub use venuefeed_client::*;
}

/// Market data adapter.
pub mod marketdata {
    pub use venuefeed_marketdata::*;
}

pub use venuefeed_channel::{CollectingSink, DataSink, FeedEvent};
pub use venuefeed_client::{Transport, TransportError};
pub use venuefeed_marketdata::{
    DataClientConfig, DataClientError, MarketDataClient, MarketDataClientBuilder,
};
