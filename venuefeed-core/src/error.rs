//! Error types for venuefeed core operations.

use thiserror::Error;

/// Core error type for identifier and value parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An identifier was empty after normalization.
    #[error("empty {kind} identifier")]
    EmptyIdentifier {
        /// Kind of identifier (symbol, venue, ...).
        kind: &'static str,
    },

    /// An instrument id string was not of the form `SYMBOL.VENUE`.
    #[error("invalid instrument id: {value}")]
    InvalidInstrumentId {
        /// Offending input.
        value: String,
    },

    /// A bar aggregation could not be parsed.
    #[error("invalid bar aggregation: {value}")]
    InvalidAggregation {
        /// Offending input.
        value: String,
    },

    /// A numeric field could not be parsed.
    #[error("invalid {field}: {value}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Offending input.
        value: String,
    },
}

/// Result type alias for venuefeed core operations.
pub type Result<T> = std::result::Result<T, Error>;
