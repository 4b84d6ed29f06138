//! # venuefeed Market Data
//!
//! Venue market data adapter core.
//!
//! This crate provides:
//! - Venue symbol normalization and a cached symbol to instrument resolver
//! - Capability validation for book, bar and historical requests
//! - Stream and HTTP payload decoders into the canonical model
//! - Snapshot/incremental order book synchronization
//! - Stream dispatch by tag with a connection gate
//! - Instrument loading with a cancellable refresh task
//! - Historical request correlation
//! - [`MarketDataClient`] tying the above together

pub mod capabilities;
pub mod client;
pub mod correlator;
pub mod decode;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod schemas;
pub mod supervisor;
pub mod symbols;
pub mod sync;
#[cfg(test)]
mod testkit;
pub mod validation;

pub use capabilities::{SpeedSet, VenueCapabilities};
pub use client::{
    DataClientConfig, MarketDataClient, MarketDataClientBuilder, Subscription, SubscriptionKey,
};
pub use correlator::RequestCorrelator;
pub use dispatcher::{DispatchStatsSnapshot, RouteTable, StreamDispatcher, StreamKind};
pub use error::{DataClientError, DecodeError, Rejection, Result};
pub use registry::{InstrumentRegistry, InstrumentStore};
pub use supervisor::{DEFAULT_REFRESH_INTERVAL, RefreshTask, TaskSupervisor};
pub use symbols::{SymbolCache, VenueSymbol};
pub use sync::{BookSyncState, BookSynchronizer};
pub use validation::{BookParams, BookStream};
