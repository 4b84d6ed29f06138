//! Historical data requests keyed by correlation id.

use crate::capabilities::VenueCapabilities;
use crate::decode::{decode_agg_trades, decode_klines, decode_trades};
use crate::error::{DataClientError, Rejection, Result};
use crate::registry::InstrumentRegistry;
use crate::symbols::SymbolCache;
use crate::validation::{clamp_limit, validate_bar_request};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use venuefeed_channel::{DataResponse, DataSink, ResponsePayload};
use venuefeed_client::{MarketHttpClient, TransportError};
use venuefeed_core::time::{datetime_to_millis, now_nanos};
use venuefeed_core::{AccountType, BarType, CorrelationId, InstrumentId};

/// Issues historical requests and delivers each response once, tagged
/// with the caller's correlation id.
///
/// A rejected request performs no network call and delivers nothing. At most
/// one request per correlation id may be outstanding. Closing the correlator
/// voids every request in flight: none of them delivers once `close` returns.
pub struct RequestCorrelator {
    http: MarketHttpClient,
    registry: Arc<dyn InstrumentRegistry>,
    symbols: Arc<SymbolCache>,
    sink: Arc<dyn DataSink>,
    capabilities: Arc<VenueCapabilities>,
    account_type: AccountType,
    use_agg_trade_ticks: bool,
    outstanding: Mutex<HashSet<CorrelationId>>,
    session: Mutex<CancellationToken>,
}

/// Releases a correlation id when the request completes or fails.
struct Outstanding<'a> {
    set: &'a Mutex<HashSet<CorrelationId>>,
    id: CorrelationId,
}

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

impl RequestCorrelator {
    /// Creates a correlator.
    #[must_use]
    pub fn new(
        http: MarketHttpClient,
        registry: Arc<dyn InstrumentRegistry>,
        symbols: Arc<SymbolCache>,
        sink: Arc<dyn DataSink>,
        capabilities: Arc<VenueCapabilities>,
        account_type: AccountType,
        use_agg_trade_ticks: bool,
    ) -> Self {
        Self {
            http,
            registry,
            symbols,
            sink,
            capabilities,
            account_type,
            use_agg_trade_ticks,
            outstanding: Mutex::new(HashSet::new()),
            session: Mutex::new(CancellationToken::new()),
        }
    }

    /// Accepts requests again after [`close`](Self::close).
    pub fn open(&self) {
        let mut session = self.session.lock();
        if session.is_cancelled() {
            *session = CancellationToken::new();
        }
    }

    /// Voids every request in flight and refuses new ones until reopened.
    pub fn close(&self) {
        self.session.lock().cancel();
    }

    /// Returns true while requests are accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.session.lock().is_cancelled()
    }

    /// Delivers one instrument definition from the registry.
    ///
    /// # Errors
    /// Returns `Rejection::InstrumentNotFound` if the registry has no such
    /// instrument, `DuplicateCorrelation` if the id is in use, or
    /// `NotConnected` once closed.
    pub fn request_instrument(
        &self,
        instrument_id: &InstrumentId,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        let Some(instrument) = self.registry.find(instrument_id) else {
            return Err(reject(Rejection::InstrumentNotFound {
                instrument_id: instrument_id.to_string(),
            }));
        };
        let session = self.session();
        let _guard = self.acquire(correlation_id)?;
        self.deliver(
            &session,
            correlation_id,
            instrument_id.clone(),
            ResponsePayload::Instruments(vec![instrument]),
        )
    }

    /// Historical quotes are not published by the venue; always rejected.
    ///
    /// # Errors
    /// Always returns `Rejection::NotPublished`.
    pub fn request_quotes(
        &self,
        instrument_id: &InstrumentId,
        _correlation_id: CorrelationId,
    ) -> Result<()> {
        tracing::debug!("Quote history requested for {instrument_id}");
        Err(reject(Rejection::NotPublished { kind: "quotes" }))
    }

    /// Requests historical trades.
    ///
    /// With aggregated trades enabled the time range is honoured; otherwise
    /// it is ignored and the most recent trades are fetched.
    ///
    /// # Errors
    /// Returns `DuplicateCorrelation`, a transport error, a decode error, or
    /// `NotConnected` if the correlator closes first.
    pub async fn request_trades(
        &self,
        instrument_id: &InstrumentId,
        limit: Option<u32>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        let limit = clamp_limit(&self.capabilities, limit);
        let symbol = self.symbols.venue_symbol(instrument_id);
        let session = self.session();
        let _guard = self.acquire(correlation_id)?;

        let trades = if self.use_agg_trade_ticks {
            let body = self
                .within(
                    &session,
                    self.http.agg_trades(
                        symbol.as_str(),
                        limit,
                        start.as_ref().map(datetime_to_millis),
                        end.as_ref().map(datetime_to_millis),
                    ),
                )
                .await
                .inspect_err(|e| tracing::error!("Trade request for {instrument_id} failed: {e}"))?;
            decode_agg_trades(&body, instrument_id, now_nanos())?
        } else {
            if start.is_some() || end.is_some() {
                tracing::warn!(
                    "Trades have been requested with a from/to time range, however the request \
                     will be for the most recent {limit}; use aggregated trades for ranged requests"
                );
            }
            let body = self
                .within(&session, self.http.trades(symbol.as_str(), limit))
                .await
                .inspect_err(|e| tracing::error!("Trade request for {instrument_id} failed: {e}"))?;
            decode_trades(&body, instrument_id, now_nanos())?
        };

        self.deliver(
            &session,
            correlation_id,
            instrument_id.clone(),
            ResponsePayload::Trades(trades),
        )
    }

    /// Requests historical bars.
    ///
    /// The venue appends the still open interval to the response; it is
    /// delivered separately as the partial bar.
    ///
    /// # Errors
    /// Returns the `Rejection` for an unsupported bar type,
    /// `DuplicateCorrelation`, a transport error, a decode error, or
    /// `NotConnected` if the correlator closes first.
    pub async fn request_bars(
        &self,
        bar_type: &BarType,
        limit: Option<u32>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        let params = validate_bar_request(&self.capabilities, self.account_type, bar_type, limit)
            .map_err(reject)?;
        let instrument_id = &bar_type.instrument_id;
        let symbol = self.symbols.venue_symbol(instrument_id);
        let session = self.session();
        let _guard = self.acquire(correlation_id)?;

        let body = self
            .within(
                &session,
                self.http.klines(
                    symbol.as_str(),
                    &params.interval,
                    params.limit,
                    start.as_ref().map(datetime_to_millis),
                    end.as_ref().map(datetime_to_millis),
                ),
            )
            .await
            .inspect_err(|e| tracing::error!("Bar request for {bar_type} failed: {e}"))?;
        let mut bars = decode_klines(&body, bar_type, now_nanos())?;
        let partial = bars.pop();

        self.deliver(
            &session,
            correlation_id,
            instrument_id.clone(),
            ResponsePayload::Bars { bars, partial },
        )
    }

    /// Returns the number of requests in flight.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.lock().len()
    }

    fn acquire(&self, id: CorrelationId) -> Result<Outstanding<'_>> {
        if !self.outstanding.lock().insert(id) {
            return Err(DataClientError::DuplicateCorrelation(id));
        }
        Ok(Outstanding {
            set: &self.outstanding,
            id,
        })
    }

    fn session(&self) -> CancellationToken {
        self.session.lock().clone()
    }

    /// Awaits a venue call unless the session is closed first.
    async fn within<T>(
        &self,
        session: &CancellationToken,
        call: impl Future<Output = std::result::Result<T, TransportError>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            () = session.cancelled() => Err(DataClientError::NotConnected),
            result = call => Ok(result?),
        }
    }

    fn deliver(
        &self,
        session: &CancellationToken,
        correlation_id: CorrelationId,
        instrument_id: InstrumentId,
        payload: ResponsePayload,
    ) -> Result<()> {
        // Held across the callback so `close` cannot return mid-delivery.
        let _current = self.session.lock();
        if session.is_cancelled() {
            tracing::debug!("Dropping response for {correlation_id}: session closed");
            return Err(DataClientError::NotConnected);
        }
        self.sink.on_response(DataResponse {
            correlation_id,
            instrument_id,
            payload,
        });
        Ok(())
    }
}

fn reject(rejection: Rejection) -> DataClientError {
    tracing::error!("Cannot request: {rejection}");
    DataClientError::Rejected(rejection)
}
