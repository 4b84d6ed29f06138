//! Instrument registry interface and an in-memory store.

use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use venuefeed_core::{Instrument, InstrumentId};

/// Source of the venue's tradable instruments.
#[async_trait]
pub trait InstrumentRegistry: Send + Sync {
    /// Performs the initial load.
    ///
    /// # Errors
    /// Returns an error if the instruments cannot be loaded.
    async fn initialize(&self) -> Result<()>;

    /// Reloads and returns every instrument.
    ///
    /// # Errors
    /// Returns an error if the instruments cannot be loaded.
    async fn load_all(&self) -> Result<Vec<Instrument>>;

    /// Looks up a loaded instrument.
    fn find(&self, instrument_id: &InstrumentId) -> Option<Instrument>;

    /// Returns every loaded instrument.
    fn all(&self) -> Vec<Instrument>;
}

/// Instrument definitions held in memory, indexed by id and raw symbol.
///
/// Suits deployments that fetch instrument metadata elsewhere and hand it in.
#[derive(Default)]
pub struct InstrumentStore {
    inner: RwLock<StoreMaps>,
}

#[derive(Default)]
struct StoreMaps {
    instruments: HashMap<InstrumentId, Instrument>,
    symbol_index: HashMap<String, InstrumentId>,
}

impl InstrumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `instruments`.
    #[must_use]
    pub fn with_instruments(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let store = Self::new();
        for instrument in instruments {
            store.add(instrument);
        }
        store
    }

    /// Adds or replaces an instrument.
    pub fn add(&self, instrument: Instrument) {
        let mut maps = self.inner.write();
        maps.symbol_index
            .insert(instrument.raw_symbol.clone(), instrument.id.clone());
        maps.instruments.insert(instrument.id.clone(), instrument);
    }

    /// Removes an instrument.
    pub fn remove(&self, instrument_id: &InstrumentId) -> Option<Instrument> {
        let mut maps = self.inner.write();
        let instrument = maps.instruments.remove(instrument_id)?;
        maps.symbol_index.remove(&instrument.raw_symbol);
        Some(instrument)
    }

    /// Gets an instrument by its venue symbol.
    #[must_use]
    pub fn get_by_raw_symbol(&self, raw_symbol: &str) -> Option<Instrument> {
        let maps = self.inner.read();
        maps.symbol_index
            .get(raw_symbol)
            .and_then(|id| maps.instruments.get(id))
            .cloned()
    }

    /// Returns the number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().instruments.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().instruments.is_empty()
    }
}

#[async_trait]
impl InstrumentRegistry for InstrumentStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Instrument>> {
        Ok(self.all())
    }

    fn find(&self, instrument_id: &InstrumentId) -> Option<Instrument> {
        self.inner.read().instruments.get(instrument_id).cloned()
    }

    fn all(&self) -> Vec<Instrument> {
        self.inner.read().instruments.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::instrument;

    #[test]
    fn test_store_indexes() {
        let store = InstrumentStore::with_instruments([instrument("BTCUSDT"), instrument("ETHUSDT")]);
        assert_eq!(store.len(), 2);

        let btc: InstrumentId = "BTCUSDT.BINANCE".parse().unwrap();
        assert_eq!(store.find(&btc).unwrap().raw_symbol, "BTCUSDT");
        assert_eq!(store.get_by_raw_symbol("ETHUSDT").unwrap().base_currency, "ETH");

        assert!(store.remove(&btc).is_some());
        assert!(store.get_by_raw_symbol("BTCUSDT").is_none());
        assert!(store.find(&btc).is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_store_as_registry() {
        let store = InstrumentStore::with_instruments([instrument("SOLUSDT")]);
        store.initialize().await.unwrap();
        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].quote_currency, "USDT");
        assert!(!store.is_empty());
    }
}
