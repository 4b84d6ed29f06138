//! Canonical market data records.

use crate::bar::Bar;
use crate::enums::{AggressorSide, BookAction, OrderSide};
use crate::identifiers::InstrumentId;
use crate::time::UnixNanos;

/// Top of book quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTick {
    /// Instrument identifier.
    pub instrument_id: InstrumentId,
    /// Best bid price.
    pub bid_price: f64,
    /// Best ask price.
    pub ask_price: f64,
    /// Size at the best bid.
    pub bid_size: f64,
    /// Size at the best ask.
    pub ask_size: f64,
    /// Venue event time.
    pub ts_event: UnixNanos,
    /// Local creation time.
    pub ts_init: UnixNanos,
}

/// Single trade print.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTick {
    /// Instrument identifier.
    pub instrument_id: InstrumentId,
    /// Trade price.
    pub price: f64,
    /// Trade size.
    pub size: f64,
    /// Side that initiated the trade.
    pub aggressor_side: AggressorSide,
    /// Venue trade identifier.
    pub trade_id: String,
    /// Venue event time.
    pub ts_event: UnixNanos,
    /// Local creation time.
    pub ts_init: UnixNanos,
}

/// Rolling 24 hour statistics for an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    /// Instrument identifier.
    pub instrument_id: InstrumentId,
    /// Absolute price change.
    pub price_change: f64,
    /// Relative price change in percent.
    pub price_change_percent: f64,
    /// Volume weighted average price.
    pub weighted_avg_price: f64,
    /// Last traded price.
    pub last_price: f64,
    /// Last traded quantity.
    pub last_qty: f64,
    /// Open price of the window.
    pub open_price: f64,
    /// High price of the window.
    pub high_price: f64,
    /// Low price of the window.
    pub low_price: f64,
    /// Base asset volume.
    pub volume: f64,
    /// Quote asset volume.
    pub quote_volume: f64,
    /// Number of trades in the window.
    pub count: u64,
    /// Venue event time.
    pub ts_event: UnixNanos,
    /// Local creation time.
    pub ts_init: UnixNanos,
}

/// A price level carried by a book delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookOrder {
    /// Book side.
    pub side: OrderSide,
    /// Level price.
    pub price: f64,
    /// Aggregate size at the level.
    pub size: f64,
}

impl BookOrder {
    /// Creates a new book order.
    #[must_use]
    pub const fn new(side: OrderSide, price: f64, size: f64) -> Self {
        Self { side, price, size }
    }
}

/// Single incremental change to an order book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookDelta {
    /// Action to apply.
    pub action: BookAction,
    /// Level the action applies to.
    pub order: BookOrder,
}

impl BookDelta {
    /// A delta clearing both sides of the book.
    #[must_use]
    pub const fn clear() -> Self {
        Self {
            action: BookAction::Clear,
            order: BookOrder::new(OrderSide::NoOrderSide, 0.0, 0.0),
        }
    }
}

/// Ordered batch of book deltas sharing one sequence number.
///
/// A snapshot batch starts with a clear followed by an add for every level.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDeltaBatch {
    /// Instrument identifier.
    pub instrument_id: InstrumentId,
    /// Deltas in application order.
    pub deltas: Vec<BookDelta>,
    /// Venue sequence number (final update id).
    pub sequence: u64,
    /// True if the batch replaces the whole book.
    pub is_snapshot: bool,
    /// Venue event time.
    pub ts_event: UnixNanos,
    /// Local creation time.
    pub ts_init: UnixNanos,
}

impl BookDeltaBatch {
    /// Builds a snapshot batch from full bid/ask ladders of `(price, size)`.
    #[must_use]
    pub fn snapshot(
        instrument_id: InstrumentId,
        bids: &[(f64, f64)],
        asks: &[(f64, f64)],
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        let mut deltas = Vec::with_capacity(1 + bids.len() + asks.len());
        deltas.push(BookDelta::clear());
        deltas.extend(levels(OrderSide::Buy, bids, |_| BookAction::Add));
        deltas.extend(levels(OrderSide::Sell, asks, |_| BookAction::Add));
        Self {
            instrument_id,
            deltas,
            sequence,
            is_snapshot: true,
            ts_event,
            ts_init,
        }
    }

    /// Builds an update batch; a zero size removes the level.
    #[must_use]
    pub fn update(
        instrument_id: InstrumentId,
        bids: &[(f64, f64)],
        asks: &[(f64, f64)],
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        let action = |size: f64| {
            if size == 0.0 {
                BookAction::Delete
            } else {
                BookAction::Update
            }
        };
        let mut deltas = Vec::with_capacity(bids.len() + asks.len());
        deltas.extend(levels(OrderSide::Buy, bids, action));
        deltas.extend(levels(OrderSide::Sell, asks, action));
        Self {
            instrument_id,
            deltas,
            sequence,
            is_snapshot: false,
            ts_event,
            ts_init,
        }
    }

    /// Returns the number of deltas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Returns true if the batch carries no deltas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

fn levels<'a>(
    side: OrderSide,
    ladder: &'a [(f64, f64)],
    action: impl Fn(f64) -> BookAction + 'a,
) -> impl Iterator<Item = BookDelta> + 'a {
    ladder.iter().map(move |&(price, size)| BookDelta {
        action: action(size),
        order: BookOrder::new(side, price, size),
    })
}

/// Tradable instrument definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    /// Canonical identifier.
    pub id: InstrumentId,
    /// Venue native symbol.
    pub raw_symbol: String,
    /// Base currency code.
    pub base_currency: String,
    /// Quote currency code.
    pub quote_currency: String,
    /// Decimal places in prices.
    pub price_precision: u8,
    /// Decimal places in sizes.
    pub size_precision: u8,
    /// Minimum price increment.
    pub price_increment: f64,
    /// Minimum size increment.
    pub size_increment: f64,
    /// Whether the instrument is currently trading.
    pub is_active: bool,
}

/// Any canonical record pushed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// Top of book quote.
    Quote(QuoteTick),
    /// Trade print.
    Trade(TradeTick),
    /// Closed bar.
    Bar(Bar),
    /// Book snapshot or update.
    Deltas(BookDeltaBatch),
    /// Instrument definition.
    Instrument(Instrument),
    /// 24 hour ticker.
    Ticker(Ticker),
}

impl Data {
    /// Returns the instrument the record belongs to.
    #[must_use]
    pub fn instrument_id(&self) -> &InstrumentId {
        match self {
            Self::Quote(q) => &q.instrument_id,
            Self::Trade(t) => &t.instrument_id,
            Self::Bar(b) => &b.bar_type.instrument_id,
            Self::Deltas(d) => &d.instrument_id,
            Self::Instrument(i) => &i.id,
            Self::Ticker(t) => &t.instrument_id,
        }
    }
}
