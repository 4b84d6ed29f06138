//! Error types for the market data adapter.

use thiserror::Error;
use venuefeed_client::TransportError;
use venuefeed_core::{AccountType, BookType, CorrelationId, PriceType};

/// Reason a subscription or request was refused before any network action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The venue cannot publish this book granularity.
    #[error("{book_type} data is not published by the venue")]
    UnsupportedBookType {
        /// Requested book type.
        book_type: BookType,
    },

    /// Update speed not in the market mode's allowed set.
    #[error("invalid update speed {speed}ms, valid speeds are {valid:?} ms")]
    InvalidUpdateSpeed {
        /// Requested speed.
        speed: u32,
        /// Allowed speeds.
        valid: Vec<u32>,
    },

    /// Snapshot depth not in the venue's enumerated depths.
    #[error("invalid depth {depth}, valid depths are {valid:?}")]
    InvalidDepth {
        /// Requested depth.
        depth: u32,
        /// Allowed depths.
        valid: Vec<u32>,
    },

    /// Bar type is not clock driven.
    #[error("cannot use {bar_type}: only time bars are aggregated by the venue")]
    NotTimeAggregated {
        /// Offending bar type.
        bar_type: String,
    },

    /// Historical bars were requested for a locally aggregated bar type.
    #[error("cannot request {bar_type}: only externally aggregated bars are available")]
    NotExternallyAggregated {
        /// Offending bar type.
        bar_type: String,
    },

    /// Interval not in the venue's vocabulary.
    #[error("bar interval {interval} not supported by the venue")]
    UnsupportedInterval {
        /// Interval in venue notation, e.g. `7m`.
        interval: String,
    },

    /// Second bars requested on a mode that does not aggregate them.
    #[error("second interval bars are not aggregated for {account_type}")]
    SecondBarsUnsupported {
        /// Active account type.
        account_type: AccountType,
    },

    /// Historical bars requested for a price type other than last.
    #[error("only {expected} price bars are available, was {price_type}")]
    UnsupportedPriceType {
        /// Requested price type.
        price_type: PriceType,
        /// The only supported price type.
        expected: PriceType,
    },

    /// The venue does not publish this kind of history.
    #[error("historical {kind} are not published by the venue")]
    NotPublished {
        /// Data kind.
        kind: &'static str,
    },

    /// Instrument unknown to the registry.
    #[error("cannot find instrument {instrument_id}")]
    InstrumentNotFound {
        /// Requested instrument.
        instrument_id: String,
    },
}

/// Failure to decode an inbound frame or HTTP body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed or unexpected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A numeric string field could not be parsed.
    #[error("invalid {field}: {value}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// The symbol could not be determined.
    #[error("missing symbol in stream {stream}")]
    MissingSymbol {
        /// Stream tag of the frame.
        stream: String,
    },

    /// A kline interval could not be mapped to a bar specification.
    #[error("unknown kline interval {interval}")]
    UnknownInterval {
        /// Venue interval.
        interval: String,
    },

    /// Identifier construction failed.
    #[error("identifier error: {0}")]
    Identifier(#[from] venuefeed_core::Error),
}

/// Error type for data client operations.
#[derive(Debug, Error)]
pub enum DataClientError {
    /// The request was refused by the capability validator.
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A request with the same correlation id is still outstanding.
    #[error("correlation id {0} already has an outstanding request")]
    DuplicateCorrelation(CorrelationId),

    /// The client is not connected.
    #[error("not connected")]
    NotConnected,

    /// Configuration produced an invalid identifier.
    #[error("invalid identifier: {0}")]
    Identifier(#[from] venuefeed_core::Error),
}

/// Result type alias for data client operations.
pub type Result<T> = std::result::Result<T, DataClientError>;
