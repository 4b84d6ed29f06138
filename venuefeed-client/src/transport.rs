//! Transport contract.
//!
//! The concrete WebSocket/HTTP client is supplied by the embedding
//! application. Inbound frames are not pulled through this trait: the
//! transport pushes them into the adapter's frame handler.

use crate::error::TransportError;
use crate::http::HttpRequest;
use async_trait::async_trait;
use bytes::Bytes;

/// Connection to the venue's streaming and request/response APIs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Subscribes to a stream, returning once the venue acknowledged it.
    ///
    /// # Errors
    /// Returns `TransportError` if the subscription fails.
    async fn subscribe(&self, stream: &str) -> Result<(), TransportError>;

    /// Unsubscribes from a stream.
    ///
    /// # Errors
    /// Returns `TransportError` if the request fails.
    async fn unsubscribe(&self, stream: &str) -> Result<(), TransportError>;

    /// Performs an HTTP GET and returns the response body.
    ///
    /// # Errors
    /// Returns `TransportError` on connection failure or error status.
    async fn request(&self, request: HttpRequest) -> Result<Bytes, TransportError>;

    /// Closes the streaming connection.
    ///
    /// # Errors
    /// Returns `TransportError` if the close handshake fails.
    async fn close(&self) -> Result<(), TransportError>;
}
