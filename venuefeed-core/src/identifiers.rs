//! Identifier types.
//!
//! Identifiers are reference counted so that cloning one onto every record
//! decoded from the stream costs a pointer bump, not an allocation.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Canonical (venue independent) ticker symbol, e.g. `BTCUSDT-PERP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Creates a new symbol.
    ///
    /// # Errors
    /// Returns `Error::EmptyIdentifier` if `value` is empty.
    pub fn new(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::EmptyIdentifier { kind: "symbol" });
        }
        Ok(Self(Arc::from(value)))
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trading venue name, e.g. `BINANCE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Venue(Arc<str>);

impl Venue {
    /// Creates a new venue.
    ///
    /// # Errors
    /// Returns `Error::EmptyIdentifier` if `value` is empty.
    pub fn new(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::EmptyIdentifier { kind: "venue" });
        }
        Ok(Self(Arc::from(value)))
    }

    /// Returns the venue as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical instrument identifier: a symbol qualified by its venue.
///
/// Displayed and parsed as `SYMBOL.VENUE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId {
    /// Canonical symbol.
    pub symbol: Symbol,
    /// Venue the symbol trades on.
    pub venue: Venue,
}

impl InstrumentId {
    /// Creates a new instrument id.
    #[must_use]
    pub fn new(symbol: Symbol, venue: Venue) -> Self {
        Self { symbol, venue }
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

impl FromStr for InstrumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (symbol, venue) = s
            .rsplit_once('.')
            .ok_or_else(|| Error::InvalidInstrumentId {
                value: s.to_string(),
            })?;
        Ok(Self::new(Symbol::new(symbol)?, Venue::new(venue)?))
    }
}

/// Caller supplied token matching an asynchronous response to its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Creates a new random correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_id_display() {
        let id = InstrumentId::new(
            Symbol::new("BTCUSDT-PERP").unwrap(),
            Venue::new("BINANCE").unwrap(),
        );
        assert_eq!(id.to_string(), "BTCUSDT-PERP.BINANCE");
    }

    #[test]
    fn test_instrument_id_parse() {
        let id: InstrumentId = "ETHUSDT.BINANCE".parse().unwrap();
        assert_eq!(id.symbol.as_str(), "ETHUSDT");
        assert_eq!(id.venue.as_str(), "BINANCE");
    }

    #[test]
    fn test_instrument_id_parse_keeps_dotted_symbol() {
        let id: InstrumentId = "BRK.B.NYSE".parse().unwrap();
        assert_eq!(id.symbol.as_str(), "BRK.B");
        assert_eq!(id.venue.as_str(), "NYSE");
    }

    #[test]
    fn test_instrument_id_parse_invalid() {
        assert!("BTCUSDT".parse::<InstrumentId>().is_err());
        assert!(".BINANCE".parse::<InstrumentId>().is_err());
    }

    #[test]
    fn test_empty_symbol_rejected() {
        assert_eq!(
            Symbol::new(""),
            Err(Error::EmptyIdentifier { kind: "symbol" })
        );
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }
}
