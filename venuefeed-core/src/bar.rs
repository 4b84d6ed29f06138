//! Bar types.

use crate::enums::{AggregationSource, BarAggregation, PriceType};
use crate::identifiers::InstrumentId;
use crate::time::UnixNanos;
use std::fmt;

/// Step, aggregation method and price type of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarSpecification {
    /// Number of aggregation units per bar.
    pub step: u32,
    /// Aggregation method.
    pub aggregation: BarAggregation,
    /// Price the bar is built from.
    pub price_type: PriceType,
}

impl BarSpecification {
    /// Creates a new bar specification.
    #[must_use]
    pub const fn new(step: u32, aggregation: BarAggregation, price_type: PriceType) -> Self {
        Self {
            step,
            aggregation,
            price_type,
        }
    }

    /// Returns true if the bar is driven by the clock.
    #[must_use]
    pub const fn is_time_aggregated(&self) -> bool {
        self.aggregation.is_time_aggregated()
    }
}

impl fmt::Display for BarSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.step, self.aggregation, self.price_type)
    }
}

/// Fully qualified bar type: instrument, specification and source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarType {
    /// Instrument the bars are for.
    pub instrument_id: InstrumentId,
    /// Bar specification.
    pub spec: BarSpecification,
    /// Aggregation source.
    pub source: AggregationSource,
}

impl BarType {
    /// Creates a new bar type.
    #[must_use]
    pub fn new(instrument_id: InstrumentId, spec: BarSpecification, source: AggregationSource) -> Self {
        Self {
            instrument_id,
            spec,
            source,
        }
    }

    /// Returns true if bars are aggregated by the venue.
    #[must_use]
    pub fn is_externally_aggregated(&self) -> bool {
        self.source == AggregationSource::External
    }

    /// Returns true if bars are aggregated locally.
    #[must_use]
    pub fn is_internally_aggregated(&self) -> bool {
        self.source == AggregationSource::Internal
    }
}

impl fmt::Display for BarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.instrument_id, self.spec, self.source)
    }
}

/// Aggregated OHLCV bar, with the venue's extra volume statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Bar type.
    pub bar_type: BarType,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Base asset volume.
    pub volume: f64,
    /// Quote asset volume.
    pub quote_volume: f64,
    /// Number of trades.
    pub count: u64,
    /// Taker buy base asset volume.
    pub taker_buy_base_volume: f64,
    /// Taker buy quote asset volume.
    pub taker_buy_quote_volume: f64,
    /// Bar close time.
    pub ts_event: UnixNanos,
    /// Time the record was created locally.
    pub ts_init: UnixNanos,
}
