//! Stream frame dispatcher for routing frames to decoders.

use crate::decode::{
    decode_agg_trade, decode_depth_update, decode_kline, decode_partial_depth, decode_quote,
    decode_stream_tag, decode_ticker, decode_trade,
};
use crate::error::DecodeError;
use crate::symbols::SymbolCache;
use crate::sync::BookSynchronizer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use venuefeed_channel::DataSink;
use venuefeed_core::Data;
use venuefeed_core::time::now_nanos;

/// Kind of payload a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Best bid/offer.
    BookTicker,
    /// 24 hour rolling statistics.
    Ticker,
    /// Candlesticks.
    Kline,
    /// Raw trades.
    Trade,
    /// Aggregated trades.
    AggTrade,
    /// Incremental depth.
    DiffDepth,
    /// Top N levels snapshot.
    PartialDepth,
}

/// Ordered topic fragment table.
///
/// Routes are kept most specific (longest fragment) first. A route is
/// skipped when its fragment is contained in a fragment that already
/// matched, and each kind fires at most once per frame.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<(&'static str, StreamKind)>,
}

impl RouteTable {
    /// Creates a table from `(fragment, kind)` pairs.
    #[must_use]
    pub fn new(routes: impl IntoIterator<Item = (&'static str, StreamKind)>) -> Self {
        let mut routes: Vec<_> = routes.into_iter().collect();
        routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { routes }
    }

    /// Routes of the Binance combined streams.
    #[must_use]
    pub fn binance() -> Self {
        Self::new([
            ("@bookTicker", StreamKind::BookTicker),
            ("@ticker", StreamKind::Ticker),
            ("@kline", StreamKind::Kline),
            ("@trade", StreamKind::Trade),
            ("@aggTrade", StreamKind::AggTrade),
            ("@depth@", StreamKind::DiffDepth),
            ("@depth5", StreamKind::PartialDepth),
            ("@depth10", StreamKind::PartialDepth),
            ("@depth20", StreamKind::PartialDepth),
        ])
    }

    /// Returns the kinds a stream tag routes to, in firing order.
    #[must_use]
    pub fn matches(&self, tag: &str) -> Vec<StreamKind> {
        let mut matched: Vec<&'static str> = Vec::new();
        let mut kinds = Vec::new();
        for &(fragment, kind) in &self.routes {
            if !tag.contains(fragment) || kinds.contains(&kind) {
                continue;
            }
            if matched.iter().any(|m| m.contains(fragment)) {
                continue;
            }
            matched.push(fragment);
            kinds.push(kind);
        }
        kinds
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if there are no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::binance()
    }
}

/// Counters kept by the dispatcher.
#[derive(Debug, Default)]
pub struct DispatchStats {
    frames: AtomicU64,
    decode_errors: AtomicU64,
    unrecognized: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStatsSnapshot {
    /// Frames accepted for dispatch.
    pub frames: u64,
    /// Frames or handlers that failed to decode.
    pub decode_errors: u64,
    /// Frames no route matched.
    pub unrecognized: u64,
    /// Frames dropped because the feed was closed.
    pub dropped: u64,
}

impl DispatchStats {
    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Routes raw stream frames to decoders and forwards the results.
///
/// Book frames go through the [`BookSynchronizer`]; everything else goes to
/// the sink directly. A bad frame is logged and counted, never propagated.
pub struct StreamDispatcher {
    routes: RouteTable,
    symbols: Arc<SymbolCache>,
    books: Arc<BookSynchronizer>,
    sink: Arc<dyn DataSink>,
    stats: DispatchStats,
    open: AtomicBool,
}

impl StreamDispatcher {
    /// Creates an open dispatcher.
    #[must_use]
    pub fn new(
        routes: RouteTable,
        symbols: Arc<SymbolCache>,
        books: Arc<BookSynchronizer>,
        sink: Arc<dyn DataSink>,
    ) -> Self {
        Self {
            routes,
            symbols,
            books,
            sink,
            stats: DispatchStats::default(),
            open: AtomicBool::new(true),
        }
    }

    /// Dispatches one inbound frame.
    pub fn dispatch(&self, frame: &[u8]) {
        if !self.is_open() {
            DispatchStats::incr(&self.stats.dropped);
            return;
        }
        DispatchStats::incr(&self.stats.frames);

        let tag = match decode_stream_tag(frame) {
            Ok(tag) => tag,
            Err(e) => {
                DispatchStats::incr(&self.stats.decode_errors);
                tracing::error!("Error decoding stream envelope: {e}");
                return;
            }
        };

        let kinds = self.routes.matches(&tag);
        if kinds.is_empty() {
            DispatchStats::incr(&self.stats.unrecognized);
            tracing::error!("Unrecognized websocket message type: {tag}");
            return;
        }

        for kind in kinds {
            if let Err(e) = self.handle(kind, frame) {
                DispatchStats::incr(&self.stats.decode_errors);
                tracing::error!("Error handling {tag} as {kind:?}: {e}");
            }
        }
    }

    fn handle(&self, kind: StreamKind, frame: &[u8]) -> Result<(), DecodeError> {
        let symbols = self.symbols.as_ref();
        let ts_init = now_nanos();
        match kind {
            StreamKind::BookTicker => {
                let quote = decode_quote(frame, symbols, ts_init)?;
                self.sink.on_data(Data::Quote(quote));
            }
            StreamKind::Ticker => {
                let ticker = decode_ticker(frame, symbols, ts_init)?;
                self.sink.on_data(Data::Ticker(ticker));
            }
            StreamKind::Kline => {
                if let Some(bar) = decode_kline(frame, symbols, ts_init)? {
                    self.sink.on_data(Data::Bar(bar));
                }
            }
            StreamKind::Trade => {
                let trade = decode_trade(frame, symbols, ts_init)?;
                self.sink.on_data(Data::Trade(trade));
            }
            StreamKind::AggTrade => {
                let trade = decode_agg_trade(frame, symbols, ts_init)?;
                self.sink.on_data(Data::Trade(trade));
            }
            StreamKind::DiffDepth => {
                self.books
                    .on_delta(decode_depth_update(frame, symbols, ts_init)?);
            }
            StreamKind::PartialDepth => {
                self.books
                    .on_snapshot(decode_partial_depth(frame, symbols, ts_init)?);
            }
        }
        Ok(())
    }

    /// Accepts frames again.
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    /// Drops every frame from now on.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Returns true while frames are accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Returns the dispatch counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }
}
