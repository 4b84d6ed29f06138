//! # venuefeed Client
//!
//! Venue facing client layer.
//!
//! This crate provides:
//! - [`Transport`] - the contract of the external WebSocket/HTTP transport
//! - [`StreamClient`] - stream subscriptions with venue stream naming
//! - [`MarketHttpClient`] - typed market data HTTP endpoints
//! - [`mock`] - an in-memory transport for tests (feature `mock`)

pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod streams;
pub mod transport;

pub use error::TransportError;
pub use http::{HttpRequest, MarketHttpClient};
pub use streams::StreamClient;
pub use transport::Transport;
