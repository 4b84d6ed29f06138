//! Subscription and request parameter validation.
//!
//! Every function is pure: it either returns the normalized parameters the
//! caller should use on the wire or the reason the venue cannot serve them.

use crate::capabilities::{VenueCapabilities, interval_suffix};
use crate::error::Rejection;
use venuefeed_core::{AccountType, BarAggregation, BarType, BookType, PriceType};

/// Which stream a book subscription uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookStream {
    /// Partial depth stream plus an HTTP snapshot of `depth` levels.
    Snapshot {
        /// Number of levels.
        depth: u32,
    },
    /// Incremental diff stream only.
    Diff,
}

/// Normalized order book subscription parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookParams {
    /// Stream selection.
    pub stream: BookStream,
    /// Update speed in milliseconds.
    pub update_speed: u32,
}

/// Normalized historical bar request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRequestParams {
    /// Venue interval, e.g. `1m`.
    pub interval: String,
    /// Result count after clamping.
    pub limit: u32,
}

/// Validates an order book subscription.
///
/// A depth of zero or none, or one beyond the deepest snapshot, selects the
/// diff stream. Any other depth must be one of the enumerated snapshot depths.
///
/// # Errors
/// Returns the `Rejection` describing the first unsupported parameter.
pub fn validate_book_subscription(
    caps: &VenueCapabilities,
    account_type: AccountType,
    book_type: BookType,
    depth: Option<u32>,
    update_speed: Option<u32>,
) -> Result<BookParams, Rejection> {
    if !caps.publishes(book_type) {
        return Err(Rejection::UnsupportedBookType { book_type });
    }

    let speeds = caps.update_speeds(account_type);
    let update_speed = update_speed.unwrap_or(speeds.default);
    if !speeds.contains(update_speed) {
        return Err(Rejection::InvalidUpdateSpeed {
            speed: update_speed,
            valid: speeds.allowed.clone(),
        });
    }

    let depth = depth.unwrap_or(0);
    let stream = if depth > 0 && depth <= caps.max_snapshot_depth() {
        if !caps.snapshot_depths.contains(&depth) {
            return Err(Rejection::InvalidDepth {
                depth,
                valid: caps.snapshot_depths.clone(),
            });
        }
        BookStream::Snapshot { depth }
    } else {
        BookStream::Diff
    };

    Ok(BookParams {
        stream,
        update_speed,
    })
}

/// Validates a bar subscription, returning the venue interval.
///
/// # Errors
/// Returns the `Rejection` describing why the venue cannot stream the bars.
pub fn validate_bar_subscription(
    caps: &VenueCapabilities,
    account_type: AccountType,
    bar_type: &BarType,
) -> Result<String, Rejection> {
    if !bar_type.is_externally_aggregated() {
        return Err(Rejection::NotExternallyAggregated {
            bar_type: bar_type.to_string(),
        });
    }
    venue_interval(caps, account_type, bar_type)
}

/// Validates a historical bar request and clamps its limit.
///
/// # Errors
/// Returns the `Rejection` describing why the venue cannot serve the request.
pub fn validate_bar_request(
    caps: &VenueCapabilities,
    account_type: AccountType,
    bar_type: &BarType,
    limit: Option<u32>,
) -> Result<BarRequestParams, Rejection> {
    if bar_type.is_internally_aggregated() {
        return Err(Rejection::NotExternallyAggregated {
            bar_type: bar_type.to_string(),
        });
    }
    let interval = venue_interval(caps, account_type, bar_type)?;
    if bar_type.spec.price_type != PriceType::Last {
        return Err(Rejection::UnsupportedPriceType {
            price_type: bar_type.spec.price_type,
            expected: PriceType::Last,
        });
    }
    Ok(BarRequestParams {
        interval,
        limit: clamp_limit(caps, limit),
    })
}

/// Clamps a historical result count: zero, none or anything above the
/// venue ceiling becomes the ceiling.
#[must_use]
pub fn clamp_limit(caps: &VenueCapabilities, limit: Option<u32>) -> u32 {
    match limit {
        Some(n) if n > 0 && n <= caps.max_request_limit => n,
        _ => caps.max_request_limit,
    }
}

fn venue_interval(
    caps: &VenueCapabilities,
    account_type: AccountType,
    bar_type: &BarType,
) -> Result<String, Rejection> {
    let spec = &bar_type.spec;
    if !spec.is_time_aggregated() {
        return Err(Rejection::NotTimeAggregated {
            bar_type: bar_type.to_string(),
        });
    }

    if spec.aggregation == BarAggregation::Second && !caps.aggregates_seconds(account_type) {
        return Err(Rejection::SecondBarsUnsupported { account_type });
    }

    let interval = match interval_suffix(spec.aggregation) {
        Some(suffix) => format!("{}{}", spec.step, suffix),
        None => {
            return Err(Rejection::UnsupportedInterval {
                interval: format!("{}-{}", spec.step, spec.aggregation),
            });
        }
    };
    if !caps.supports_interval(&interval) {
        return Err(Rejection::UnsupportedInterval { interval });
    }
    Ok(interval)
}
