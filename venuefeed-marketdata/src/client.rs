//! Client builder and the market data client.

use crate::capabilities::VenueCapabilities;
use crate::correlator::RequestCorrelator;
use crate::decode::decode_depth_snapshot;
use crate::dispatcher::{DispatchStatsSnapshot, RouteTable, StreamDispatcher};
use crate::error::{DataClientError, Rejection, Result};
use crate::registry::InstrumentRegistry;
use crate::supervisor::{DEFAULT_REFRESH_INTERVAL, TaskSupervisor};
use crate::symbols::SymbolCache;
use crate::sync::{BookSyncState, BookSynchronizer};
use crate::validation::{
    BookParams, BookStream, validate_bar_subscription, validate_book_subscription,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use venuefeed_channel::DataSink;
use venuefeed_client::streams::{
    agg_trades_stream, bars_stream, book_ticker_stream, diff_depth_stream, partial_depth_stream,
    ticker_stream, trades_stream,
};
use venuefeed_client::{MarketHttpClient, StreamClient, Transport};
use venuefeed_core::time::now_nanos;
use venuefeed_core::{
    AccountType, BarType, BookDeltaBatch, BookType, CorrelationId, InstrumentId, Venue,
};

/// Data client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataClientConfig {
    /// Market mode.
    pub account_type: AccountType,
    /// Venue name qualifying every instrument id.
    pub venue: String,
    /// Use aggregated trades for trade subscriptions and history.
    pub use_agg_trade_ticks: bool,
    /// Interval between instrument reloads.
    pub instrument_refresh_interval: Duration,
    /// Venue capability table.
    pub capabilities: VenueCapabilities,
}

impl Default for DataClientConfig {
    fn default() -> Self {
        Self {
            account_type: AccountType::Spot,
            venue: "BINANCE".to_string(),
            use_agg_trade_ticks: false,
            instrument_refresh_interval: DEFAULT_REFRESH_INTERVAL,
            capabilities: VenueCapabilities::binance(),
        }
    }
}

/// Builder for configuring and creating a [`MarketDataClient`].
pub struct MarketDataClientBuilder {
    transport: Arc<dyn Transport>,
    registry: Arc<dyn InstrumentRegistry>,
    sink: Arc<dyn DataSink>,
    config: DataClientConfig,
    routes: RouteTable,
}

impl MarketDataClientBuilder {
    /// Creates a builder over the venue transport, instrument registry and
    /// consumer sink.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<dyn InstrumentRegistry>,
        sink: Arc<dyn DataSink>,
    ) -> Self {
        Self {
            transport,
            registry,
            sink,
            config: DataClientConfig::default(),
            routes: RouteTable::binance(),
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: DataClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the market mode.
    #[must_use]
    pub fn account_type(mut self, account_type: AccountType) -> Self {
        self.config.account_type = account_type;
        self
    }

    /// Sets the venue name.
    #[must_use]
    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.config.venue = venue.into();
        self
    }

    /// Enables or disables aggregated trades.
    #[must_use]
    pub fn use_agg_trade_ticks(mut self, enabled: bool) -> Self {
        self.config.use_agg_trade_ticks = enabled;
        self
    }

    /// Sets the instrument reload interval.
    #[must_use]
    pub fn instrument_refresh_interval(mut self, interval: Duration) -> Self {
        self.config.instrument_refresh_interval = interval;
        self
    }

    /// Sets the venue capability table.
    #[must_use]
    pub fn capabilities(mut self, capabilities: VenueCapabilities) -> Self {
        self.config.capabilities = capabilities;
        self
    }

    /// Sets the stream route table.
    #[must_use]
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    /// Returns `DataClientError::Identifier` if the venue name is empty.
    pub fn build(self) -> Result<MarketDataClient> {
        let config = self.config;
        let account_type = config.account_type;
        let venue = Venue::new(&config.venue)?;
        let capabilities = Arc::new(config.capabilities.clone());
        let symbols = Arc::new(SymbolCache::new(account_type, venue));
        let books = Arc::new(BookSynchronizer::new(Arc::clone(&self.sink)));

        let dispatcher = StreamDispatcher::new(
            self.routes,
            Arc::clone(&symbols),
            Arc::clone(&books),
            Arc::clone(&self.sink),
        );
        dispatcher.close();
        let session = CancellationToken::new();
        session.cancel();

        let supervisor = TaskSupervisor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.sink),
            config.instrument_refresh_interval,
        );
        let correlator = RequestCorrelator::new(
            MarketHttpClient::new(Arc::clone(&self.transport), account_type),
            self.registry,
            Arc::clone(&symbols),
            self.sink,
            Arc::clone(&capabilities),
            account_type,
            config.use_agg_trade_ticks,
        );

        Ok(MarketDataClient {
            streams: StreamClient::new(Arc::clone(&self.transport)),
            http: MarketHttpClient::new(self.transport, account_type),
            config,
            capabilities,
            symbols,
            books,
            dispatcher,
            supervisor,
            correlator,
            subscriptions: Mutex::new(HashMap::new()),
            session: Mutex::new(session),
        })
    }
}

/// What a subscription is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    /// Order book deltas and snapshots.
    Book(InstrumentId),
    /// Best bid/offer quotes.
    Quotes(InstrumentId),
    /// Trades.
    Trades(InstrumentId),
    /// 24 hour ticker.
    Ticker(InstrumentId),
    /// Venue aggregated bars.
    Bars(BarType),
}

/// An active subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Venue stream carrying the data.
    pub stream: String,
    /// Normalized parameters of a book subscription.
    pub book: Option<BookParams>,
}

/// Venue market data client.
///
/// Validates and issues subscriptions, feeds inbound frames through the
/// dispatcher, keeps books synchronized across reconnects and serves
/// historical requests.
///
/// Every connection is a session. Work started in one session never reaches
/// the sink after `disconnect` ends it, and a subscription only becomes
/// active while its record is still the current one for its key.
pub struct MarketDataClient {
    config: DataClientConfig,
    capabilities: Arc<VenueCapabilities>,
    streams: StreamClient,
    http: MarketHttpClient,
    symbols: Arc<SymbolCache>,
    books: Arc<BookSynchronizer>,
    dispatcher: StreamDispatcher,
    supervisor: TaskSupervisor,
    correlator: RequestCorrelator,
    // Lock order: subscriptions, then session, then book state.
    subscriptions: Mutex<HashMap<SubscriptionKey, Subscription>>,
    session: Mutex<CancellationToken>,
}

impl MarketDataClient {
    /// Loads instruments, pushes them to the sink and starts the refresh
    /// task. Connecting twice is a no-op.
    ///
    /// # Errors
    /// Returns the registry error if instruments cannot be loaded.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            tracing::debug!("Already connected");
            return Ok(());
        }
        self.supervisor.start().await?;
        self.dispatcher.open();
        self.correlator.open();
        *self.session.lock() = CancellationToken::new();
        tracing::info!("Connected ({})", self.config.account_type);
        Ok(())
    }

    /// Stops the refresh task, drops every subscription and closes the
    /// transport. No sink callback fires once this returns, including those
    /// of subscriptions and requests still in flight.
    ///
    /// # Errors
    /// Returns `TransportError` if the close handshake fails.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut subscriptions = self.subscriptions.lock();
            self.session.lock().cancel();
            subscriptions.clear();
        }
        self.correlator.close();
        self.dispatcher.close();
        self.supervisor.stop().await;

        for instrument_id in self.books.tracked() {
            self.books.remove(&instrument_id);
        }

        self.streams.close().await?;
        tracing::info!("Disconnected");
        Ok(())
    }

    /// Restores every subscription after the transport reconnected.
    ///
    /// Each book goes back to buffering and takes a fresh snapshot, since
    /// sequence continuity cannot be assumed across the gap.
    ///
    /// # Errors
    /// Returns the first error. Subscriptions are restored concurrently and a
    /// failed one is dropped without affecting the rest.
    pub async fn on_reconnect(&self) -> Result<()> {
        let session = self.session()?;
        tracing::info!("Reconnected, restoring subscriptions");
        self.books.reset_all();
        self.streams.reset();

        let subscriptions: Vec<(SubscriptionKey, Subscription)> = self
            .subscriptions
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let restores = subscriptions
            .into_iter()
            .map(|(key, subscription)| {
                let session = &session;
                async move {
                    let result = self.restore(session, &key, &subscription).await;
                    (key, result)
                }
            });

        let mut first_error = None;
        for (key, result) in join_all(restores).await {
            if let Err(e) = result {
                tracing::error!("Failed to restore {key:?}: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn restore(
        &self,
        session: &CancellationToken,
        key: &SubscriptionKey,
        subscription: &Subscription,
    ) -> Result<()> {
        match (key, subscription.book) {
            (SubscriptionKey::Book(instrument_id), Some(params)) => {
                self.run_book_subscription(session, instrument_id, params)
                    .await
            }
            _ => self.run_subscription(session, key, subscription).await,
        }
    }

    /// Dispatches one inbound stream frame.
    pub fn handle_frame(&self, frame: &[u8]) {
        self.dispatcher.dispatch(frame);
    }

    /// Subscribes to an order book.
    ///
    /// A depth among the snapshot depths subscribes the partial depth stream
    /// and fetches a snapshot concurrently; any other depth uses the diff
    /// stream alone. Subscribing again with the same parameters is a no-op;
    /// different parameters replace the subscription.
    ///
    /// # Errors
    /// Returns the `Rejection` for unsupported parameters, or a transport or
    /// decode error from the stream or snapshot.
    pub async fn subscribe_order_book(
        &self,
        instrument_id: &InstrumentId,
        book_type: BookType,
        depth: Option<u32>,
        update_speed: Option<u32>,
    ) -> Result<()> {
        let session = self.session()?;
        let params = validate_book_subscription(
            &self.capabilities,
            self.config.account_type,
            book_type,
            depth,
            update_speed,
        )
        .map_err(reject)?;

        let key = SubscriptionKey::Book(instrument_id.clone());
        let record = self.book_subscription(instrument_id, params);
        let previous = {
            let mut subscriptions = self.subscriptions.lock();
            if session.is_cancelled() {
                return Err(DataClientError::NotConnected);
            }
            if subscriptions.get(&key) == Some(&record) {
                tracing::debug!("Already subscribed to order book for {instrument_id}");
                return Ok(());
            }
            subscriptions.insert(key.clone(), record.clone())
        };

        if let Some(previous) = previous {
            if let Err(e) = self.streams.unsubscribe(&previous.stream).await {
                let mut subscriptions = self.subscriptions.lock();
                if subscriptions.get(&key) == Some(&record) {
                    subscriptions.insert(key, previous);
                }
                return Err(e.into());
            }
        }

        self.run_book_subscription(&session, instrument_id, params)
            .await
    }

    fn book_subscription(&self, instrument_id: &InstrumentId, params: BookParams) -> Subscription {
        let symbol = self.symbols.venue_symbol(instrument_id);
        let stream = match params.stream {
            BookStream::Snapshot { depth } => {
                partial_depth_stream(symbol.as_str(), depth, params.update_speed)
            }
            BookStream::Diff => diff_depth_stream(symbol.as_str(), params.update_speed),
        };
        Subscription {
            stream,
            book: Some(params),
        }
    }

    /// Subscribes the book stream and, for snapshot depths, fetches the
    /// snapshot, then syncs the book. The record for the instrument must
    /// already be in place; the book is synced only if it still is.
    async fn run_book_subscription(
        &self,
        session: &CancellationToken,
        instrument_id: &InstrumentId,
        params: BookParams,
    ) -> Result<()> {
        let key = SubscriptionKey::Book(instrument_id.clone());
        let record = self.book_subscription(instrument_id, params);
        let stream = record.stream.clone();
        {
            let subscriptions = self.subscriptions.lock();
            if session.is_cancelled() {
                return Err(DataClientError::NotConnected);
            }
            if subscriptions.get(&key) != Some(&record) {
                tracing::debug!("Order book subscription for {instrument_id} was replaced");
                return Ok(());
            }
            self.books.begin_buffering(instrument_id);
        }

        let symbol = self.symbols.venue_symbol(instrument_id);
        let sync = async {
            match params.stream {
                BookStream::Snapshot { depth } => {
                    let subscribe = async {
                        self.streams
                            .subscribe(stream.clone())
                            .await
                            .map_err(DataClientError::from)
                    };
                    let snapshot = async {
                        let body = self.http.depth(symbol.as_str(), depth).await?;
                        let snapshot =
                            decode_depth_snapshot(&body, instrument_id.clone(), now_nanos())?;
                        Ok::<_, DataClientError>(snapshot)
                    };
                    tokio::try_join!(subscribe, snapshot).map(|(_, snapshot)| Some(snapshot))
                }
                BookStream::Diff => self
                    .streams
                    .subscribe(stream.clone())
                    .await
                    .map(|_| None)
                    .map_err(DataClientError::from),
            }
        };
        let result: Result<Option<BookDeltaBatch>> = tokio::select! {
            biased;
            () = session.cancelled() => Err(DataClientError::NotConnected),
            result = sync => result,
        };

        let (release, result) = {
            let mut subscriptions = self.subscriptions.lock();
            if session.is_cancelled() {
                return Err(DataClientError::NotConnected);
            }
            let owned = subscriptions.get(&key) == Some(&record);
            match result {
                Ok(snapshot) if owned => {
                    match snapshot {
                        Some(snapshot) => self.books.on_snapshot(snapshot),
                        None => self.books.mark_synced(instrument_id),
                    }
                    return Ok(());
                }
                Ok(_) => {
                    tracing::debug!("Order book subscription for {instrument_id} was replaced");
                    (!subscriptions.contains_key(&key), Ok(()))
                }
                Err(e) => {
                    tracing::error!("Order book subscription for {instrument_id} failed: {e}");
                    if owned {
                        subscriptions.remove(&key);
                        self.books.remove(instrument_id);
                    }
                    (owned, Err(e))
                }
            }
        };
        if release {
            self.release_stream(&stream).await;
        }
        result
    }

    async fn release_stream(&self, stream: &str) {
        if let Err(e) = self.streams.unsubscribe(stream).await {
            tracing::warn!("Failed to unsubscribe {stream}: {e}");
        }
    }

    /// Unsubscribes from an order book and drops its sync state.
    ///
    /// # Errors
    /// Returns `TransportError` if the unsubscribe request fails.
    pub async fn unsubscribe_order_book(&self, instrument_id: &InstrumentId) -> Result<()> {
        self.unsubscribe(SubscriptionKey::Book(instrument_id.clone()))
            .await?;
        self.books.remove(instrument_id);
        Ok(())
    }

    /// Subscribes to best bid/offer quotes.
    ///
    /// # Errors
    /// Returns `TransportError` if the subscription fails.
    pub async fn subscribe_quotes(&self, instrument_id: &InstrumentId) -> Result<()> {
        let symbol = self.symbols.venue_symbol(instrument_id);
        self.subscribe(
            SubscriptionKey::Quotes(instrument_id.clone()),
            book_ticker_stream(symbol.as_str()),
        )
        .await
    }

    /// Unsubscribes from quotes.
    ///
    /// # Errors
    /// Returns `TransportError` if the unsubscribe request fails.
    pub async fn unsubscribe_quotes(&self, instrument_id: &InstrumentId) -> Result<()> {
        self.unsubscribe(SubscriptionKey::Quotes(instrument_id.clone()))
            .await
    }

    /// Subscribes to trades, aggregated if so configured.
    ///
    /// # Errors
    /// Returns `TransportError` if the subscription fails.
    pub async fn subscribe_trades(&self, instrument_id: &InstrumentId) -> Result<()> {
        let symbol = self.symbols.venue_symbol(instrument_id);
        let stream = if self.config.use_agg_trade_ticks {
            agg_trades_stream(symbol.as_str())
        } else {
            trades_stream(symbol.as_str())
        };
        self.subscribe(SubscriptionKey::Trades(instrument_id.clone()), stream)
            .await
    }

    /// Unsubscribes from trades.
    ///
    /// # Errors
    /// Returns `TransportError` if the unsubscribe request fails.
    pub async fn unsubscribe_trades(&self, instrument_id: &InstrumentId) -> Result<()> {
        self.unsubscribe(SubscriptionKey::Trades(instrument_id.clone()))
            .await
    }

    /// Subscribes to the 24 hour ticker.
    ///
    /// # Errors
    /// Returns `TransportError` if the subscription fails.
    pub async fn subscribe_ticker(&self, instrument_id: &InstrumentId) -> Result<()> {
        let symbol = self.symbols.venue_symbol(instrument_id);
        self.subscribe(
            SubscriptionKey::Ticker(instrument_id.clone()),
            ticker_stream(symbol.as_str()),
        )
        .await
    }

    /// Unsubscribes from the ticker.
    ///
    /// # Errors
    /// Returns `TransportError` if the unsubscribe request fails.
    pub async fn unsubscribe_ticker(&self, instrument_id: &InstrumentId) -> Result<()> {
        self.unsubscribe(SubscriptionKey::Ticker(instrument_id.clone()))
            .await
    }

    /// Subscribes to venue aggregated bars. Only closed bars are delivered.
    ///
    /// # Errors
    /// Returns the `Rejection` for an unsupported bar type, or
    /// `TransportError` if the subscription fails.
    pub async fn subscribe_bars(&self, bar_type: &BarType) -> Result<()> {
        self.ensure_connected()?;
        let interval =
            validate_bar_subscription(&self.capabilities, self.config.account_type, bar_type)
                .map_err(reject)?;
        let symbol = self.symbols.venue_symbol(&bar_type.instrument_id);
        self.subscribe(
            SubscriptionKey::Bars(bar_type.clone()),
            bars_stream(symbol.as_str(), &interval),
        )
        .await
    }

    /// Unsubscribes from bars.
    ///
    /// # Errors
    /// Returns `TransportError` if the unsubscribe request fails.
    pub async fn unsubscribe_bars(&self, bar_type: &BarType) -> Result<()> {
        self.unsubscribe(SubscriptionKey::Bars(bar_type.clone()))
            .await
    }

    async fn subscribe(&self, key: SubscriptionKey, stream: String) -> Result<()> {
        let session = self.session()?;
        let record = Subscription { stream, book: None };
        {
            let mut subscriptions = self.subscriptions.lock();
            if session.is_cancelled() {
                return Err(DataClientError::NotConnected);
            }
            if subscriptions.contains_key(&key) {
                tracing::debug!("Already subscribed: {key:?}");
                return Ok(());
            }
            subscriptions.insert(key.clone(), record.clone());
        }
        self.run_subscription(&session, &key, &record).await
    }

    /// Subscribes the stream of a record already in place. A failure drops
    /// the record if it is still the current one.
    async fn run_subscription(
        &self,
        session: &CancellationToken,
        key: &SubscriptionKey,
        record: &Subscription,
    ) -> Result<()> {
        let result = tokio::select! {
            biased;
            () = session.cancelled() => return Err(DataClientError::NotConnected),
            result = self.streams.subscribe(record.stream.clone()) => result,
        };
        let (release, result) = {
            let mut subscriptions = self.subscriptions.lock();
            if session.is_cancelled() {
                return Err(DataClientError::NotConnected);
            }
            match result {
                Ok(_) => (!subscriptions.contains_key(key), Ok(())),
                Err(e) => {
                    if subscriptions.get(key) == Some(record) {
                        subscriptions.remove(key);
                    }
                    (false, Err(e.into()))
                }
            }
        };
        if release {
            self.release_stream(&record.stream).await;
        }
        result
    }

    async fn unsubscribe(&self, key: SubscriptionKey) -> Result<()> {
        self.ensure_connected()?;
        let Some(subscription) = self.subscriptions.lock().remove(&key) else {
            tracing::debug!("Not subscribed: {key:?}");
            return Ok(());
        };
        self.streams.unsubscribe(&subscription.stream).await?;
        Ok(())
    }

    /// Delivers an instrument definition from the registry.
    ///
    /// # Errors
    /// See [`RequestCorrelator::request_instrument`].
    pub fn request_instrument(
        &self,
        instrument_id: &InstrumentId,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.correlator
            .request_instrument(instrument_id, correlation_id)
    }

    /// Rejected: the venue publishes no quote history.
    ///
    /// # Errors
    /// See [`RequestCorrelator::request_quotes`].
    pub fn request_quotes(
        &self,
        instrument_id: &InstrumentId,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        self.correlator.request_quotes(instrument_id, correlation_id)
    }

    /// Requests historical trades.
    ///
    /// # Errors
    /// See [`RequestCorrelator::request_trades`].
    pub async fn request_trades(
        &self,
        instrument_id: &InstrumentId,
        limit: Option<u32>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.correlator
            .request_trades(instrument_id, limit, start, end, correlation_id)
            .await
    }

    /// Requests historical bars.
    ///
    /// # Errors
    /// See [`RequestCorrelator::request_bars`].
    pub async fn request_bars(
        &self,
        bar_type: &BarType,
        limit: Option<u32>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.correlator
            .request_bars(bar_type, limit, start, end, correlation_id)
            .await
    }

    /// Returns true between `connect` and `disconnect`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.session.lock().is_cancelled()
    }

    /// Returns the active subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<SubscriptionKey> {
        self.subscriptions.lock().keys().cloned().collect()
    }

    /// Returns the sync state of an instrument's book.
    #[must_use]
    pub fn book_state(&self, instrument_id: &InstrumentId) -> BookSyncState {
        self.books.state(instrument_id)
    }

    /// Returns the dispatch counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.dispatcher.stats()
    }

    /// Returns the symbol cache.
    #[must_use]
    pub fn symbols(&self) -> &SymbolCache {
        &self.symbols
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DataClientConfig {
        &self.config
    }

    fn ensure_connected(&self) -> Result<()> {
        self.session().map(|_| ())
    }

    /// Returns the token of the current session.
    fn session(&self) -> Result<CancellationToken> {
        let session = self.session.lock();
        if session.is_cancelled() {
            Err(DataClientError::NotConnected)
        } else {
            Ok(session.clone())
        }
    }
}

fn reject(rejection: Rejection) -> DataClientError {
    tracing::error!("Cannot subscribe: {rejection}");
    DataClientError::Rejected(rejection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{CountingRegistry, frames, instrument};
    use venuefeed_channel::CollectingSink;
    use venuefeed_client::mock::MockTransport;
    use venuefeed_core::{AggregationSource, BarAggregation, BarSpecification, Data, PriceType};

    struct Fixture {
        transport: Arc<MockTransport>,
        sink: Arc<CollectingSink>,
        client: Arc<MarketDataClient>,
    }

    async fn connected(account_type: AccountType) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(CollectingSink::new());
        let registry = Arc::new(CountingRegistry::new([
            instrument("BTCUSDT"),
            instrument("ETHUSDT"),
        ]));
        let client = MarketDataClientBuilder::new(transport.clone(), registry, sink.clone())
            .account_type(account_type)
            .build()
            .unwrap();
        client.connect().await.unwrap();
        Fixture {
            transport,
            sink,
            client: Arc::new(client),
        }
    }

    fn btc() -> InstrumentId {
        "BTCUSDT.BINANCE".parse().unwrap()
    }

    #[tokio::test]
    async fn test_connect_pushes_instruments() {
        let f = connected(AccountType::Spot).await;
        assert!(f.client.is_connected());
        let instruments = f
            .sink
            .data()
            .into_iter()
            .filter(|d| matches!(d, Data::Instrument(_)))
            .count();
        assert_eq!(instruments, 2);
    }

    #[tokio::test]
    async fn test_not_connected() {
        let transport = Arc::new(MockTransport::new());
        let client = MarketDataClientBuilder::new(
            transport,
            Arc::new(CountingRegistry::new([])),
            Arc::new(CollectingSink::new()),
        )
        .build()
        .unwrap();
        let err = client.subscribe_quotes(&btc()).await.unwrap_err();
        assert!(matches!(err, DataClientError::NotConnected));
    }

    #[test]
    fn test_build_rejects_empty_venue() {
        let result = MarketDataClientBuilder::new(
            Arc::new(MockTransport::new()),
            Arc::new(CountingRegistry::new([])),
            Arc::new(CollectingSink::new()),
        )
        .venue("")
        .build();
        assert!(matches!(result, Err(DataClientError::Identifier(_))));
    }

    #[tokio::test]
    async fn test_book_rejection_performs_no_network_action() {
        let f = connected(AccountType::Spot).await;
        let err = f
            .client
            .subscribe_order_book(&btc(), BookType::L2Mbp, Some(7), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataClientError::Rejected(Rejection::InvalidDepth { depth: 7, .. })
        ));

        let err = f
            .client
            .subscribe_order_book(&btc(), BookType::L3Mbo, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DataClientError::Rejected(_)));

        assert!(f.transport.subscribed().is_empty());
        assert!(f.transport.requests().is_empty());
        assert!(f.client.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_subscription_reconciles() {
        let f = connected(AccountType::Spot).await;
        f.transport
            .respond("/api/v3/depth", frames::depth_snapshot(150));
        f.transport
            .delay("/api/v3/depth", Duration::from_millis(50));

        let task = {
            let client = Arc::clone(&f.client);
            tokio::spawn(async move {
                client
                    .subscribe_order_book(&btc(), BookType::L2Mbp, Some(10), None)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(f.transport.subscribed(), vec!["btcusdt@depth10@100ms"]);
        assert!(f.client.book_state(&btc()).is_buffering());
        f.client
            .handle_frame(frames::depth_update("BTCUSDT", 140, 145).as_bytes());
        f.client
            .handle_frame(frames::depth_update("BTCUSDT", 146, 155).as_bytes());
        assert!(f.sink.book_batches().is_empty());

        task.await.unwrap().unwrap();

        let batches = f.sink.book_batches();
        assert_eq!(batches.len(), 2);
        assert!(batches[0].is_snapshot);
        assert_eq!(batches[0].sequence, 150);
        assert_eq!(batches[1].sequence, 155);
        assert!(f.client.book_state(&btc()).is_synced());

        let request = &f.transport.requests()[0];
        assert_eq!(request.get("limit"), Some("10"));
    }

    #[tokio::test]
    async fn test_diff_subscription_has_no_snapshot() {
        let f = connected(AccountType::UsdtFutures).await;
        let perp: InstrumentId = "BTCUSDT-PERP.BINANCE".parse().unwrap();
        f.client
            .subscribe_order_book(&perp, BookType::L2Mbp, None, None)
            .await
            .unwrap();

        assert_eq!(f.transport.subscribed(), vec!["btcusdt@depth@0ms"]);
        assert!(f.transport.requests().is_empty());
        assert_eq!(
            f.client.book_state(&perp),
            BookSyncState::Synced {
                snapshot_sequence: None
            }
        );
    }

    #[tokio::test]
    async fn test_book_resubscribe_same_params_is_noop() {
        let f = connected(AccountType::Spot).await;
        f.transport.respond("/api/v3/depth", frames::depth_snapshot(1));

        for _ in 0..2 {
            f.client
                .subscribe_order_book(&btc(), BookType::L2Mbp, Some(5), None)
                .await
                .unwrap();
        }
        assert_eq!(f.transport.subscribed().len(), 1);
        assert_eq!(f.transport.requests().len(), 1);

        f.client
            .subscribe_order_book(&btc(), BookType::L2Mbp, Some(20), Some(1000))
            .await
            .unwrap();
        assert_eq!(f.transport.unsubscribed(), vec!["btcusdt@depth5@100ms"]);
        assert_eq!(
            f.transport.subscribed().last().map(String::as_str),
            Some("btcusdt@depth20@1000ms")
        );
    }

    #[tokio::test]
    async fn test_failed_snapshot_rolls_back() {
        let f = connected(AccountType::Spot).await;
        let err = f
            .client
            .subscribe_order_book(&btc(), BookType::L2Mbp, Some(10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DataClientError::Transport(_)));
        assert_eq!(f.client.book_state(&btc()), BookSyncState::Unbuffered);
        assert!(f.client.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_stream_subscriptions() {
        let f = connected(AccountType::Spot).await;
        f.client.subscribe_quotes(&btc()).await.unwrap();
        f.client.subscribe_quotes(&btc()).await.unwrap();
        f.client.subscribe_trades(&btc()).await.unwrap();
        f.client.subscribe_ticker(&btc()).await.unwrap();

        let bars = BarType::new(
            btc(),
            BarSpecification::new(1, BarAggregation::Minute, PriceType::Last),
            AggregationSource::External,
        );
        f.client.subscribe_bars(&bars).await.unwrap();

        assert_eq!(
            f.transport.subscribed(),
            vec![
                "btcusdt@bookTicker",
                "btcusdt@trade",
                "btcusdt@ticker",
                "btcusdt@kline_1m"
            ]
        );

        f.client.unsubscribe_quotes(&btc()).await.unwrap();
        f.client.unsubscribe_quotes(&btc()).await.unwrap();
        f.client.unsubscribe_bars(&bars).await.unwrap();
        assert_eq!(
            f.transport.unsubscribed(),
            vec!["btcusdt@bookTicker", "btcusdt@kline_1m"]
        );
        assert_eq!(f.client.subscriptions().len(), 2);
    }

    #[tokio::test]
    async fn test_agg_trades_and_second_bars_on_futures() {
        let transport = Arc::new(MockTransport::new());
        let client = MarketDataClientBuilder::new(
            transport.clone(),
            Arc::new(CountingRegistry::new([])),
            Arc::new(CollectingSink::new()),
        )
        .account_type(AccountType::UsdtFutures)
        .use_agg_trade_ticks(true)
        .build()
        .unwrap();
        client.connect().await.unwrap();

        let perp: InstrumentId = "ETHUSDT-PERP.BINANCE".parse().unwrap();
        client.subscribe_trades(&perp).await.unwrap();
        assert_eq!(transport.subscribed(), vec!["ethusdt@aggTrade"]);

        let seconds = BarType::new(
            perp,
            BarSpecification::new(1, BarAggregation::Second, PriceType::Last),
            AggregationSource::External,
        );
        let err = client.subscribe_bars(&seconds).await.unwrap_err();
        assert!(matches!(
            err,
            DataClientError::Rejected(Rejection::SecondBarsUnsupported { .. })
        ));
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_on_reconnect_restores_subscriptions() {
        let f = connected(AccountType::Spot).await;
        f.transport.respond("/api/v3/depth", frames::depth_snapshot(10));
        f.client
            .subscribe_order_book(&btc(), BookType::L2Mbp, Some(5), None)
            .await
            .unwrap();
        f.client.subscribe_quotes(&btc()).await.unwrap();
        f.client
            .handle_frame(frames::depth_update("BTCUSDT", 11, 12).as_bytes());
        assert_eq!(f.sink.book_batches().len(), 2);

        f.client.on_reconnect().await.unwrap();

        let mut subscribed = f.transport.subscribed();
        subscribed.sort();
        assert_eq!(
            subscribed,
            vec![
                "btcusdt@bookTicker",
                "btcusdt@bookTicker",
                "btcusdt@depth5@100ms",
                "btcusdt@depth5@100ms"
            ]
        );
        assert_eq!(f.transport.requests().len(), 2);
        assert!(f.client.book_state(&btc()).is_synced());

        let batches = f.sink.book_batches();
        assert_eq!(batches.len(), 3);
        assert!(batches[2].is_snapshot);
    }

    #[tokio::test]
    async fn test_disconnect_silences_sink() {
        let f = connected(AccountType::Spot).await;
        f.client.subscribe_quotes(&btc()).await.unwrap();
        f.client.disconnect().await.unwrap();

        let before = f.sink.len();
        f.client
            .handle_frame(frames::book_ticker("BTCUSDT").as_bytes());
        assert_eq!(f.sink.len(), before);
        assert!(f.transport.is_closed());
        assert!(f.client.subscriptions().is_empty());
        assert!(!f.client.is_connected());
        assert_eq!(f.client.stats().dropped, 1);
    }

    #[tokio::test]
    async fn test_requests_go_through_correlator() {
        let f = connected(AccountType::Spot).await;
        f.transport.respond("/api/v3/klines", frames::http_klines(3));
        let token = CorrelationId::new();
        let bars = BarType::new(
            btc(),
            BarSpecification::new(1, BarAggregation::Hour, PriceType::Last),
            AggregationSource::External,
        );
        f.client
            .request_bars(&bars, None, None, None, token)
            .await
            .unwrap();
        f.client.request_instrument(&btc(), CorrelationId::new()).unwrap();
        assert!(f.client.request_quotes(&btc(), CorrelationId::new()).is_err());

        let responses = f.sink.responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].correlation_id, token);
    }

    fn spawn_book_subscription(
        client: &Arc<MarketDataClient>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let client = Arc::clone(client);
        tokio::spawn(async move {
            client
                .subscribe_order_book(&btc(), BookType::L2Mbp, Some(10), None)
                .await
        })
    }

    #[tokio::test]
    async fn test_identical_subscription_in_flight_keeps_buffer() {
        let f = connected(AccountType::Spot).await;
        f.transport
            .respond("/api/v3/depth", frames::depth_snapshot(100));
        f.transport
            .delay("/api/v3/depth", Duration::from_millis(50));

        let task = spawn_book_subscription(&f.client);
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.client
            .handle_frame(frames::depth_update("BTCUSDT", 101, 105).as_bytes());
        f.client
            .handle_frame(frames::depth_update("BTCUSDT", 106, 109).as_bytes());

        f.client
            .subscribe_order_book(&btc(), BookType::L2Mbp, Some(10), None)
            .await
            .unwrap();
        f.client
            .handle_frame(frames::depth_update("BTCUSDT", 110, 112).as_bytes());
        task.await.unwrap().unwrap();

        let sequences: Vec<u64> = f.sink.book_batches().iter().map(|b| b.sequence).collect();
        assert_eq!(sequences, vec![100, 105, 109, 112]);
        assert_eq!(f.transport.subscribed().len(), 1);
        assert_eq!(f.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_during_snapshot_forwards_nothing() {
        let f = connected(AccountType::Spot).await;
        f.transport
            .respond("/api/v3/depth", frames::depth_snapshot(100));
        f.transport
            .delay("/api/v3/depth", Duration::from_millis(50));

        let task = spawn_book_subscription(&f.client);
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.client
            .handle_frame(frames::depth_update("BTCUSDT", 101, 105).as_bytes());
        f.client.disconnect().await.unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, DataClientError::NotConnected));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(f.sink.book_batches().is_empty());
        assert!(f.client.subscriptions().is_empty());
        assert_eq!(f.client.book_state(&btc()), BookSyncState::Unbuffered);
    }

    #[tokio::test]
    async fn test_disconnect_during_request_delivers_nothing() {
        let f = connected(AccountType::Spot).await;
        f.transport.respond("/api/v3/klines", frames::http_klines(3));
        f.transport
            .delay("/api/v3/klines", Duration::from_millis(50));
        let bars = BarType::new(
            btc(),
            BarSpecification::new(1, BarAggregation::Hour, PriceType::Last),
            AggregationSource::External,
        );

        let task = {
            let client = Arc::clone(&f.client);
            tokio::spawn(async move {
                client
                    .request_bars(&bars, None, None, None, CorrelationId::new())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.client.disconnect().await.unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, DataClientError::NotConnected));
        assert!(f.sink.responses().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect_accepts_work() {
        let f = connected(AccountType::Spot).await;
        f.client.disconnect().await.unwrap();
        f.client.connect().await.unwrap();

        f.transport.respond("/api/v3/klines", frames::http_klines(2));
        let bars = BarType::new(
            btc(),
            BarSpecification::new(1, BarAggregation::Hour, PriceType::Last),
            AggregationSource::External,
        );
        f.client
            .request_bars(&bars, None, None, None, CorrelationId::new())
            .await
            .unwrap();
        f.client.subscribe_quotes(&btc()).await.unwrap();
        assert_eq!(f.sink.responses().len(), 1);
        assert_eq!(f.client.subscriptions(), vec![SubscriptionKey::Quotes(btc())]);
    }

    #[tokio::test]
    async fn test_unsubscribe_during_subscribe_releases_stream() {
        let f = connected(AccountType::Spot).await;
        f.transport
            .delay("btcusdt@bookTicker", Duration::from_millis(50));

        let task = {
            let client = Arc::clone(&f.client);
            tokio::spawn(async move { client.subscribe_quotes(&btc()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.client.unsubscribe_quotes(&btc()).await.unwrap();
        task.await.unwrap().unwrap();

        assert!(f.client.subscriptions().is_empty());
        assert_eq!(f.transport.unsubscribed(), vec!["btcusdt@bookTicker"]);
    }
}
