//! Typed market data HTTP endpoints.

use crate::error::TransportError;
use crate::transport::Transport;
use bytes::Bytes;
use std::sync::Arc;
use venuefeed_core::AccountType;

/// HTTP GET request: endpoint path plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Endpoint path, e.g. `/api/v3/depth`.
    pub endpoint: String,
    /// Query parameters in insertion order.
    pub params: Vec<(String, String)>,
}

impl HttpRequest {
    /// Creates a request without parameters.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds a query parameter when a value is present.
    #[must_use]
    pub fn param_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Returns the value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Market data HTTP API for one account type.
pub struct MarketHttpClient {
    transport: Arc<dyn Transport>,
    base_path: &'static str,
}

impl MarketHttpClient {
    /// Creates a client for the account type's API family.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, account_type: AccountType) -> Self {
        Self {
            transport,
            base_path: base_path(account_type),
        }
    }

    /// Returns the endpoint prefix in use.
    #[must_use]
    pub fn base_path(&self) -> &'static str {
        self.base_path
    }

    /// Requests an order book snapshot of `limit` levels.
    ///
    /// # Errors
    /// Returns `TransportError` if the request fails.
    pub async fn depth(&self, symbol: &str, limit: u32) -> Result<Bytes, TransportError> {
        let request = HttpRequest::new(self.path("depth"))
            .param("symbol", symbol)
            .param("limit", limit);
        self.transport.request(request).await
    }

    /// Requests the most recent trades.
    ///
    /// # Errors
    /// Returns `TransportError` if the request fails.
    pub async fn trades(&self, symbol: &str, limit: u32) -> Result<Bytes, TransportError> {
        let request = HttpRequest::new(self.path("trades"))
            .param("symbol", symbol)
            .param("limit", limit);
        self.transport.request(request).await
    }

    /// Requests aggregated trades, optionally bounded by epoch milliseconds.
    ///
    /// # Errors
    /// Returns `TransportError` if the request fails.
    pub async fn agg_trades(
        &self,
        symbol: &str,
        limit: u32,
        start_time_ms: Option<i64>,
        end_time_ms: Option<i64>,
    ) -> Result<Bytes, TransportError> {
        let request = HttpRequest::new(self.path("aggTrades"))
            .param("symbol", symbol)
            .param("limit", limit)
            .param_opt("startTime", start_time_ms)
            .param_opt("endTime", end_time_ms);
        self.transport.request(request).await
    }

    /// Requests candlesticks, optionally bounded by epoch milliseconds.
    ///
    /// # Errors
    /// Returns `TransportError` if the request fails.
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
        start_time_ms: Option<i64>,
        end_time_ms: Option<i64>,
    ) -> Result<Bytes, TransportError> {
        let request = HttpRequest::new(self.path("klines"))
            .param("symbol", symbol)
            .param("interval", interval)
            .param("limit", limit)
            .param_opt("startTime", start_time_ms)
            .param_opt("endTime", end_time_ms);
        self.transport.request(request).await
    }

    fn path(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_path, endpoint)
    }
}

fn base_path(account_type: AccountType) -> &'static str {
    match account_type {
        AccountType::Spot | AccountType::Margin => "/api/v3",
        AccountType::UsdtFutures => "/fapi/v1",
        AccountType::CoinFutures => "/dapi/v1",
    }
}
