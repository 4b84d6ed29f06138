//! In-memory transport recording every call.
//!
//! Responses, failures and artificial latency are configured per endpoint
//! or stream name before the transport is handed to a client.

use crate::error::TransportError;
use crate::http::HttpRequest;
use crate::transport::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Scriptable transport double.
#[derive(Default)]
pub struct MockTransport {
    subscribed: Mutex<Vec<String>>,
    unsubscribed: Mutex<Vec<String>>,
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<HashMap<String, Bytes>>,
    request_failures: Mutex<HashMap<String, TransportError>>,
    subscribe_failures: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    closed: AtomicBool,
}

impl MockTransport {
    /// Creates a transport with no scripted behaviour.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests to `endpoint` with `body`.
    pub fn respond(&self, endpoint: &str, body: impl Into<Bytes>) {
        self.responses.lock().insert(endpoint.to_string(), body.into());
    }

    /// Fails requests to `endpoint` with `error`.
    pub fn fail_request(&self, endpoint: &str, error: TransportError) {
        self.request_failures
            .lock()
            .insert(endpoint.to_string(), error);
    }

    /// Refuses subscriptions to `stream`.
    pub fn fail_subscribe(&self, stream: &str) {
        self.subscribe_failures.lock().insert(stream.to_string());
    }

    /// Delays calls for an endpoint or stream name.
    pub fn delay(&self, key: &str, delay: Duration) {
        self.delays.lock().insert(key.to_string(), delay);
    }

    /// Streams passed to `subscribe`, in call order.
    #[must_use]
    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().clone()
    }

    /// Streams passed to `unsubscribe`, in call order.
    #[must_use]
    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().clone()
    }

    /// Requests received, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns true once `close` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn pause(&self, key: &str) {
        let delay = self.delays.lock().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn subscribe(&self, stream: &str) -> Result<(), TransportError> {
        self.pause(stream).await;
        if self.subscribe_failures.lock().contains(stream) {
            return Err(TransportError::Subscription {
                stream: stream.to_string(),
                message: "refused".to_string(),
            });
        }
        self.subscribed.lock().push(stream.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, stream: &str) -> Result<(), TransportError> {
        self.unsubscribed.lock().push(stream.to_string());
        Ok(())
    }

    async fn request(&self, request: HttpRequest) -> Result<Bytes, TransportError> {
        let endpoint = request.endpoint.clone();
        self.requests.lock().push(request);
        self.pause(&endpoint).await;

        if let Some(error) = self.request_failures.lock().get(&endpoint).cloned() {
            return Err(error);
        }
        let body = self.responses.lock().get(&endpoint).cloned();
        body.ok_or_else(|| TransportError::Http {
            status: 404,
            endpoint,
            message: "no scripted response".to_string(),
        })
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
