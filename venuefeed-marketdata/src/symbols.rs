//! Venue symbol normalization and the symbol cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use venuefeed_core::{AccountType, InstrumentId, Symbol, Venue};

const PERP_SUFFIX: &str = "-PERP";
const VENUE_PERP_SUFFIX: &str = "_PERP";

/// Venue symbol as emitted on the wire, normalized to upper case without
/// separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VenueSymbol(String);

impl VenueSymbol {
    /// Normalizes a raw venue symbol: upper-cased, with spaces, `/` and a
    /// canonical `-PERP` suffix removed.
    ///
    /// # Errors
    /// Returns `Error::EmptyIdentifier` if nothing is left after normalization.
    pub fn new(raw: &str) -> venuefeed_core::Result<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != ' ' && *c != '/')
            .map(|c| c.to_ascii_uppercase())
            .collect::<String>()
            .replace(PERP_SUFFIX, "");
        if normalized.is_empty() {
            return Err(venuefeed_core::Error::EmptyIdentifier { kind: "symbol" });
        }
        Ok(Self(normalized))
    }

    /// Maps a canonical symbol back to the venue spelling.
    #[must_use]
    pub fn from_canonical(symbol: &Symbol, account_type: AccountType) -> Self {
        let s = symbol.as_str();
        let venue = match s.strip_suffix(PERP_SUFFIX) {
            Some(base) if account_type == AccountType::CoinFutures => {
                format!("{base}{VENUE_PERP_SUFFIX}")
            }
            Some(base) if account_type.is_futures() => base.to_string(),
            _ => s.to_string(),
        };
        Self(venue)
    }

    /// Returns the canonical symbol for the account type.
    ///
    /// Futures perpetuals gain a `-PERP` suffix; delivery contracts, which end
    /// in their expiry date, keep the venue spelling.
    #[must_use]
    pub fn to_canonical(&self, account_type: AccountType) -> String {
        let s = self.0.as_str();
        if account_type.is_spot_or_margin() || s.ends_with(PERP_SUFFIX) {
            return s.to_string();
        }
        if s.ends_with(|c: char| c.is_ascii_digit()) {
            return s.to_string();
        }
        match s.strip_suffix(VENUE_PERP_SUFFIX) {
            Some(base) => format!("{base}{PERP_SUFFIX}"),
            None => format!("{s}{PERP_SUFFIX}"),
        }
    }

    /// Returns the normalized symbol.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Bidirectional cache between venue symbols and canonical instrument ids.
///
/// Entries are never evicted; the cache is bounded by the venue's instrument
/// universe.
pub struct SymbolCache {
    account_type: AccountType,
    venue: Venue,
    inner: RwLock<CacheMaps>,
}

#[derive(Default)]
struct CacheMaps {
    ids: HashMap<String, InstrumentId>,
    symbols: HashMap<InstrumentId, VenueSymbol>,
}

impl SymbolCache {
    /// Creates an empty cache for an account type and venue.
    #[must_use]
    pub fn new(account_type: AccountType, venue: Venue) -> Self {
        Self {
            account_type,
            venue,
            inner: RwLock::new(CacheMaps::default()),
        }
    }

    /// Resolves a venue symbol to its canonical instrument id.
    ///
    /// The first resolution of a symbol derives and stores the id; later
    /// calls return the stored id. Concurrent first resolutions agree on a
    /// single id because the miss path re-checks under the write lock.
    ///
    /// # Errors
    /// Returns `Error::EmptyIdentifier` for a blank symbol.
    pub fn resolve(&self, venue_symbol: &str) -> venuefeed_core::Result<InstrumentId> {
        if let Some(id) = self.inner.read().ids.get(venue_symbol) {
            return Ok(id.clone());
        }

        let normalized = VenueSymbol::new(venue_symbol)?;
        let mut maps = self.inner.write();
        if let Some(id) = maps.ids.get(venue_symbol) {
            return Ok(id.clone());
        }

        let symbol = Symbol::new(&normalized.to_canonical(self.account_type))?;
        let id = InstrumentId::new(symbol, self.venue.clone());
        maps.ids.insert(venue_symbol.to_string(), id.clone());
        maps.symbols.entry(id.clone()).or_insert(normalized);
        Ok(id)
    }

    /// Returns the venue spelling for a canonical instrument id.
    #[must_use]
    pub fn venue_symbol(&self, instrument_id: &InstrumentId) -> VenueSymbol {
        if let Some(symbol) = self.inner.read().symbols.get(instrument_id) {
            return symbol.clone();
        }
        VenueSymbol::from_canonical(&instrument_id.symbol, self.account_type)
    }

    /// Returns the venue this cache qualifies ids with.
    #[must_use]
    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    /// Returns the number of cached venue symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().ids.len()
    }

    /// Returns true if nothing has been resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn venue() -> Venue {
        Venue::new("BINANCE").unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(VenueSymbol::new("btc/usdt").unwrap().as_str(), "BTCUSDT");
        assert_eq!(VenueSymbol::new(" eth usdt ").unwrap().as_str(), "ETHUSDT");
        assert!(VenueSymbol::new(" / ").is_err());
    }

    #[test]
    fn test_normalize_strips_perp_suffix() {
        let perp = VenueSymbol::new("btcusdt-perp").unwrap();
        assert_eq!(perp.as_str(), "BTCUSDT");
        assert_eq!(perp.to_canonical(AccountType::UsdtFutures), "BTCUSDT-PERP");
        assert_eq!(perp.to_canonical(AccountType::Spot), "BTCUSDT");
        assert!(VenueSymbol::new("-PERP").is_err());

        let cache = SymbolCache::new(AccountType::UsdtFutures, venue());
        assert_eq!(
            cache.resolve("BTCUSDT-PERP").unwrap(),
            cache.resolve("BTCUSDT").unwrap()
        );
    }

    #[test]
    fn test_to_canonical() {
        let usdt = VenueSymbol::new("BTCUSDT").unwrap();
        assert_eq!(usdt.to_canonical(AccountType::Spot), "BTCUSDT");
        assert_eq!(usdt.to_canonical(AccountType::UsdtFutures), "BTCUSDT-PERP");

        let coin = VenueSymbol::new("BTCUSD_PERP").unwrap();
        assert_eq!(coin.to_canonical(AccountType::CoinFutures), "BTCUSD-PERP");

        let delivery = VenueSymbol::new("BTCUSD_230929").unwrap();
        assert_eq!(
            delivery.to_canonical(AccountType::CoinFutures),
            "BTCUSD_230929"
        );
    }

    #[test]
    fn test_from_canonical() {
        let perp = Symbol::new("BTCUSDT-PERP").unwrap();
        assert_eq!(
            VenueSymbol::from_canonical(&perp, AccountType::UsdtFutures).as_str(),
            "BTCUSDT"
        );
        let coin = Symbol::new("BTCUSD-PERP").unwrap();
        assert_eq!(
            VenueSymbol::from_canonical(&coin, AccountType::CoinFutures).as_str(),
            "BTCUSD_PERP"
        );
        let spot = Symbol::new("ETHUSDT").unwrap();
        assert_eq!(
            VenueSymbol::from_canonical(&spot, AccountType::Spot).as_str(),
            "ETHUSDT"
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let cache = SymbolCache::new(AccountType::UsdtFutures, venue());
        let first = cache.resolve("BTCUSDT").unwrap();
        let second = cache.resolve("BTCUSDT").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "BTCUSDT-PERP.BINANCE");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_venue_symbol_round_trip() {
        let cache = SymbolCache::new(AccountType::CoinFutures, venue());
        let id = cache.resolve("BTCUSD_PERP").unwrap();
        assert_eq!(cache.venue_symbol(&id).as_str(), "BTCUSD_PERP");

        let unseen: InstrumentId = "ETHUSD-PERP.BINANCE".parse().unwrap();
        assert_eq!(cache.venue_symbol(&unseen).as_str(), "ETHUSD_PERP");
    }

    #[test]
    fn test_concurrent_first_resolution_agrees() {
        let cache = Arc::new(SymbolCache::new(AccountType::Spot, venue()));
        let ids: Vec<InstrumentId> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    scope.spawn(move || cache.resolve("SOLUSDT").unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resolve_blank_symbol_fails() {
        let cache = SymbolCache::new(AccountType::Spot, venue());
        assert!(cache.resolve("").is_err());
        assert!(cache.is_empty());
    }
}
