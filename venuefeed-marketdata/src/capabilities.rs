//! Venue capability table.
//!
//! Every constraint the validator enforces lives here so that a deployment
//! can describe its venue instead of relying on hardcoded values.

use venuefeed_core::{AccountType, BarAggregation, BookType};

/// Allowed book update speeds for one market mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedSet {
    /// Speeds in milliseconds the venue accepts.
    pub allowed: Vec<u32>,
    /// Speed used when the subscriber does not specify one.
    pub default: u32,
}

impl SpeedSet {
    /// Creates a speed set.
    #[must_use]
    pub fn new(allowed: &[u32], default: u32) -> Self {
        Self {
            allowed: allowed.to_vec(),
            default,
        }
    }

    /// Returns true if `speed` is allowed.
    #[must_use]
    pub fn contains(&self, speed: u32) -> bool {
        self.allowed.contains(&speed)
    }
}

/// Capability constraints of a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueCapabilities {
    /// Book types the venue publishes.
    pub book_types: Vec<BookType>,
    /// Update speeds for spot and margin.
    pub spot_update_speeds: SpeedSet,
    /// Update speeds for futures.
    pub futures_update_speeds: SpeedSet,
    /// Depths the partial book stream and snapshot endpoint support.
    pub snapshot_depths: Vec<u32>,
    /// Kline interval vocabulary in venue notation.
    pub kline_intervals: Vec<String>,
    /// Whether futures modes aggregate second bars.
    pub futures_second_bars: bool,
    /// Ceiling on the result count of a historical request.
    pub max_request_limit: u32,
}

impl VenueCapabilities {
    /// Capabilities published by Binance.
    ///
    /// The futures 0 ms update speed is accepted by the venue but not
    /// documented.
    #[must_use]
    pub fn binance() -> Self {
        Self {
            book_types: vec![BookType::L1Tbbo, BookType::L2Mbp],
            spot_update_speeds: SpeedSet::new(&[100, 1000], 100),
            futures_update_speeds: SpeedSet::new(&[0, 100, 250, 500], 0),
            snapshot_depths: vec![5, 10, 20],
            kline_intervals: [
                "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d",
                "3d", "1w", "1M",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            futures_second_bars: false,
            max_request_limit: 1000,
        }
    }

    /// Sets the spot update speeds.
    #[must_use]
    pub fn spot_update_speeds(mut self, speeds: SpeedSet) -> Self {
        self.spot_update_speeds = speeds;
        self
    }

    /// Sets the futures update speeds.
    #[must_use]
    pub fn futures_update_speeds(mut self, speeds: SpeedSet) -> Self {
        self.futures_update_speeds = speeds;
        self
    }

    /// Sets the supported snapshot depths.
    #[must_use]
    pub fn snapshot_depths(mut self, depths: &[u32]) -> Self {
        self.snapshot_depths = depths.to_vec();
        self
    }

    /// Sets the historical request ceiling.
    #[must_use]
    pub fn max_request_limit(mut self, limit: u32) -> Self {
        self.max_request_limit = limit;
        self
    }

    /// Returns the speed set for an account type.
    #[must_use]
    pub fn update_speeds(&self, account_type: AccountType) -> &SpeedSet {
        if account_type.is_futures() {
            &self.futures_update_speeds
        } else {
            &self.spot_update_speeds
        }
    }

    /// Largest supported snapshot depth; deeper requests use the diff stream.
    #[must_use]
    pub fn max_snapshot_depth(&self) -> u32 {
        self.snapshot_depths.iter().copied().max().unwrap_or(0)
    }

    /// Returns true if the venue publishes the book type.
    #[must_use]
    pub fn publishes(&self, book_type: BookType) -> bool {
        self.book_types.contains(&book_type)
    }

    /// Returns true if the interval is in the venue's vocabulary.
    #[must_use]
    pub fn supports_interval(&self, interval: &str) -> bool {
        self.kline_intervals.iter().any(|i| i == interval)
    }

    /// Returns true if second bars are aggregated for the account type.
    #[must_use]
    pub fn aggregates_seconds(&self, account_type: AccountType) -> bool {
        account_type.is_spot_or_margin() || self.futures_second_bars
    }
}

impl Default for VenueCapabilities {
    fn default() -> Self {
        Self::binance()
    }
}

/// Venue interval suffix for a time aggregation.
#[must_use]
pub const fn interval_suffix(aggregation: BarAggregation) -> Option<&'static str> {
    match aggregation {
        BarAggregation::Second => Some("s"),
        BarAggregation::Minute => Some("m"),
        BarAggregation::Hour => Some("h"),
        BarAggregation::Day => Some("d"),
        BarAggregation::Week => Some("w"),
        BarAggregation::Month => Some("M"),
        _ => None,
    }
}

/// Splits a venue interval such as `15m` into step and aggregation.
#[must_use]
pub fn parse_interval(interval: &str) -> Option<(u32, BarAggregation)> {
    let split = interval.find(|c: char| !c.is_ascii_digit())?;
    let (step, unit) = interval.split_at(split);
    let step = step.parse().ok()?;
    let aggregation = match unit {
        "s" => BarAggregation::Second,
        "m" => BarAggregation::Minute,
        "h" => BarAggregation::Hour,
        "d" => BarAggregation::Day,
        "w" => BarAggregation::Week,
        "M" => BarAggregation::Month,
        _ => return None,
    };
    Some((step, aggregation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binance_defaults() {
        let caps = VenueCapabilities::binance();
        assert_eq!(caps.max_snapshot_depth(), 20);
        assert_eq!(caps.max_request_limit, 1000);
        assert!(caps.publishes(BookType::L2Mbp));
        assert!(!caps.publishes(BookType::L3Mbo));
        assert_eq!(caps.update_speeds(AccountType::Spot).default, 100);
        assert_eq!(caps.update_speeds(AccountType::UsdtFutures).default, 0);
        assert!(caps.update_speeds(AccountType::CoinFutures).contains(250));
    }

    #[test]
    fn test_builder_overrides() {
        let caps = VenueCapabilities::binance()
            .snapshot_depths(&[5, 50])
            .max_request_limit(500)
            .futures_update_speeds(SpeedSet::new(&[100], 100));
        assert_eq!(caps.max_snapshot_depth(), 50);
        assert_eq!(caps.max_request_limit, 500);
        assert!(!caps.update_speeds(AccountType::UsdtFutures).contains(0));
    }

    #[test]
    fn test_aggregates_seconds() {
        let caps = VenueCapabilities::binance();
        assert!(caps.aggregates_seconds(AccountType::Spot));
        assert!(!caps.aggregates_seconds(AccountType::UsdtFutures));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("15m"), Some((15, BarAggregation::Minute)));
        assert_eq!(parse_interval("1M"), Some((1, BarAggregation::Month)));
        assert_eq!(parse_interval("12h"), Some((12, BarAggregation::Hour)));
        assert_eq!(parse_interval("m"), None);
        assert_eq!(parse_interval("5x"), None);
        assert_eq!(parse_interval("10"), None);
    }

    #[test]
    fn test_interval_suffix() {
        assert_eq!(interval_suffix(BarAggregation::Minute), Some("m"));
        assert_eq!(interval_suffix(BarAggregation::Millisecond), None);
        assert_eq!(interval_suffix(BarAggregation::Tick), None);
    }
}
