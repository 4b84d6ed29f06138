//! # venuefeed Core
//!
//! Canonical market data model shared by every venuefeed crate.
//!
//! This crate provides:
//! - Instrument, venue and correlation identifiers
//! - Account (market mode) and book/bar enumerations
//! - Typed records: quotes, trades, tickers, bars, book deltas, instruments
//! - Nanosecond timestamp helpers
//! - Error types for identifier and value parsing

pub mod bar;
pub mod data;
pub mod enums;
pub mod error;
pub mod identifiers;
pub mod time;

pub use bar::{Bar, BarSpecification, BarType};
pub use data::{
    BookDelta, BookDeltaBatch, BookOrder, Data, Instrument, QuoteTick, Ticker, TradeTick,
};
pub use enums::{
    AccountType, AggregationSource, AggressorSide, BarAggregation, BookAction, BookType,
    OrderSide, PriceType,
};
pub use error::{Error, Result};
pub use identifiers::{CorrelationId, InstrumentId, Symbol, Venue};
pub use time::UnixNanos;
