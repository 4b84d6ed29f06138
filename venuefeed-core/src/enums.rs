//! Enumerations shared by the market data model.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Account type, which selects the venue's market mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    /// Spot market.
    Spot,
    /// Cross/isolated margin on the spot market.
    Margin,
    /// Linear (stablecoin margined) futures.
    UsdtFutures,
    /// Inverse (coin margined) futures.
    CoinFutures,
}

impl AccountType {
    /// Returns true for the spot and margin modes.
    #[inline]
    #[must_use]
    pub const fn is_spot_or_margin(&self) -> bool {
        matches!(self, Self::Spot | Self::Margin)
    }

    /// Returns true for both futures modes.
    #[inline]
    #[must_use]
    pub const fn is_futures(&self) -> bool {
        matches!(self, Self::UsdtFutures | Self::CoinFutures)
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "SPOT",
            Self::Margin => "MARGIN",
            Self::UsdtFutures => "USDT_FUTURE",
            Self::CoinFutures => "COIN_FUTURE",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order book granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookType {
    /// Top of book only.
    L1Tbbo,
    /// Aggregated market by price.
    L2Mbp,
    /// Full market by order.
    L3Mbo,
}

impl fmt::Display for BookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::L1Tbbo => "L1_TBBO",
            Self::L2Mbp => "L2_MBP",
            Self::L3Mbo => "L3_MBO",
        })
    }
}

/// Action carried by a single book delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookAction {
    /// Insert a level.
    Add,
    /// Replace the size at a level.
    Update,
    /// Remove a level.
    Delete,
    /// Remove every level on both sides.
    Clear,
}

/// Side of the book a delta applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    /// No side (used by clear actions).
    NoOrderSide,
    /// Bid side.
    Buy,
    /// Ask side.
    Sell,
}

/// Side that initiated a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggressorSide {
    /// Unknown aggressor.
    NoAggressor,
    /// Buyer lifted the offer.
    Buyer,
    /// Seller hit the bid.
    Seller,
}

impl AggressorSide {
    /// Maps the venue's "buyer is maker" flag to the aggressor.
    #[inline]
    #[must_use]
    pub const fn from_buyer_maker(is_buyer_maker: bool) -> Self {
        if is_buyer_maker {
            Self::Seller
        } else {
            Self::Buyer
        }
    }
}

/// Method used to aggregate a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarAggregation {
    /// Fixed number of ticks.
    Tick,
    /// Fixed traded volume.
    Volume,
    /// Fixed traded notional.
    Value,
    /// Millisecond interval.
    Millisecond,
    /// Second interval.
    Second,
    /// Minute interval.
    Minute,
    /// Hour interval.
    Hour,
    /// Day interval.
    Day,
    /// Week interval.
    Week,
    /// Month interval.
    Month,
}

impl BarAggregation {
    /// Returns true if the aggregation is driven by the clock.
    #[must_use]
    pub const fn is_time_aggregated(&self) -> bool {
        !matches!(self, Self::Tick | Self::Volume | Self::Value)
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tick => "TICK",
            Self::Volume => "VOLUME",
            Self::Value => "VALUE",
            Self::Millisecond => "MILLISECOND",
            Self::Second => "SECOND",
            Self::Minute => "MINUTE",
            Self::Hour => "HOUR",
            Self::Day => "DAY",
            Self::Week => "WEEK",
            Self::Month => "MONTH",
        }
    }
}

impl fmt::Display for BarAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarAggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "TICK" => Self::Tick,
            "VOLUME" => Self::Volume,
            "VALUE" => Self::Value,
            "MILLISECOND" => Self::Millisecond,
            "SECOND" => Self::Second,
            "MINUTE" => Self::Minute,
            "HOUR" => Self::Hour,
            "DAY" => Self::Day,
            "WEEK" => Self::Week,
            "MONTH" => Self::Month,
            _ => {
                return Err(Error::InvalidAggregation {
                    value: s.to_string(),
                });
            }
        })
    }
}

/// Price a bar is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceType {
    /// Best bid.
    Bid,
    /// Best ask.
    Ask,
    /// Mid point.
    Mid,
    /// Last traded price.
    Last,
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bid => "BID",
            Self::Ask => "ASK",
            Self::Mid => "MID",
            Self::Last => "LAST",
        })
    }
}

/// Where a bar is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationSource {
    /// Aggregated by the venue.
    External,
    /// Aggregated locally from ticks.
    Internal,
}

impl fmt::Display for AggregationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::External => "EXTERNAL",
            Self::Internal => "INTERNAL",
        })
    }
}
