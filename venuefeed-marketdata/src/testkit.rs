//! Shared fixtures for the crate's tests.

use crate::error::{DataClientError, Result};
use crate::registry::{InstrumentRegistry, InstrumentStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use venuefeed_client::TransportError;
use venuefeed_core::{Instrument, InstrumentId};

/// Spot instrument quoted in USDT on `BINANCE`.
pub fn instrument(raw_symbol: &str) -> Instrument {
    let base = raw_symbol.strip_suffix("USDT").unwrap_or(raw_symbol);
    Instrument {
        id: format!("{raw_symbol}.BINANCE").parse().unwrap(),
        raw_symbol: raw_symbol.to_string(),
        base_currency: base.to_string(),
        quote_currency: "USDT".to_string(),
        price_precision: 2,
        size_precision: 5,
        price_increment: 0.01,
        size_increment: 0.000_01,
        is_active: true,
    }
}

/// Registry counting its calls, with optional latency and failure.
pub struct CountingRegistry {
    store: InstrumentStore,
    initialized: AtomicUsize,
    loads_started: AtomicUsize,
    loads_completed: AtomicUsize,
    load_delay: Option<Duration>,
    fail: AtomicBool,
}

impl CountingRegistry {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            store: InstrumentStore::with_instruments(instruments),
            initialized: AtomicUsize::new(0),
            loads_started: AtomicUsize::new(0),
            loads_completed: AtomicUsize::new(0),
            load_delay: None,
            fail: AtomicBool::new(false),
        }
    }

    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::SeqCst)
    }

    pub fn loads_completed(&self) -> usize {
        self.loads_completed.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DataClientError::Transport(TransportError::Io(
                "registry unavailable".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl InstrumentRegistry for CountingRegistry {
    async fn initialize(&self) -> Result<()> {
        self.check()?;
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Instrument>> {
        self.loads_started.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        self.loads_completed.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.all())
    }

    fn find(&self, instrument_id: &InstrumentId) -> Option<Instrument> {
        self.store.find(instrument_id)
    }

    fn all(&self) -> Vec<Instrument> {
        self.store.all()
    }
}

/// Venue frames and HTTP bodies.
pub mod frames {
    fn lower(symbol: &str) -> String {
        symbol.to_ascii_lowercase()
    }

    pub fn book_ticker(symbol: &str) -> String {
        format!(
            r#"{{"stream":"{}@bookTicker","data":{{"u":400900217,"s":"{symbol}",
            "b":"25.35","B":"31.21","a":"25.36","A":"40.66"}}}}"#,
            lower(symbol)
        )
    }

    pub fn ticker(symbol: &str) -> String {
        format!(
            r#"{{"stream":"{}@ticker","data":{{"e":"24hrTicker","E":1672515782136,
            "s":"{symbol}","p":"0.0015","P":"250.00","w":"0.0018","x":"0.0009",
            "c":"0.0025","Q":"10","b":"0.0024","B":"10","a":"0.0026","A":"100",
            "o":"0.0010","h":"0.0025","l":"0.0010","v":"10000","q":"18",
            "O":0,"C":86400000,"F":0,"L":18150,"n":18151}}}}"#,
            lower(symbol)
        )
    }

    pub fn trade(symbol: &str, id: u64, buyer_maker: bool) -> String {
        format!(
            r#"{{"stream":"{}@trade","data":{{"e":"trade","E":1672515782136,
            "s":"{symbol}","t":{id},"p":"0.001","q":"100","b":88,"a":50,
            "T":1672515782136,"m":{buyer_maker},"M":true}}}}"#,
            lower(symbol)
        )
    }

    pub fn agg_trade(symbol: &str, id: u64, buyer_maker: bool) -> String {
        format!(
            r#"{{"stream":"{}@aggTrade","data":{{"e":"aggTrade","E":1672515782136,
            "s":"{symbol}","a":{id},"p":"0.001","q":"100","f":100,"l":105,
            "T":1672515782136,"m":{buyer_maker},"M":true}}}}"#,
            lower(symbol)
        )
    }

    pub fn kline(symbol: &str, interval: &str, closed: bool) -> String {
        format!(
            r#"{{"stream":"{}@kline_{interval}","data":{{"e":"kline","E":1672515782136,
            "s":"{symbol}","k":{{"t":1672515780000,"T":1672515839999,"s":"{symbol}",
            "i":"{interval}","f":100,"L":200,"o":"0.0010","c":"0.0020","h":"0.0025",
            "l":"0.0015","v":"1000","n":100,"x":{closed},"q":"1.0000","V":"500",
            "Q":"0.500","B":"123456"}}}}}}"#,
            lower(symbol)
        )
    }

    /// Diff depth frame with one bid update and one ask removal.
    pub fn depth_update(symbol: &str, first: u64, last: u64) -> String {
        format!(
            r#"{{"stream":"{}@depth@100ms","data":{{"e":"depthUpdate","E":1672515782136,
            "s":"{symbol}","U":{first},"u":{last},
            "b":[["0.0024","10"]],"a":[["0.0026","0"]]}}}}"#,
            lower(symbol)
        )
    }

    pub fn spot_partial_depth(symbol: &str, depth: u32, last_update_id: u64) -> String {
        format!(
            r#"{{"stream":"{}@depth{depth}@100ms","data":{{"lastUpdateId":{last_update_id},
            "bids":[["0.0024","10"]],"asks":[["0.0026","100"]]}}}}"#,
            lower(symbol)
        )
    }

    pub fn futures_partial_depth(symbol: &str, depth: u32, last: u64) -> String {
        format!(
            r#"{{"stream":"{}@depth{depth}@500ms","data":{{"e":"depthUpdate",
            "E":1672515782136,"T":1672515782134,"s":"{symbol}","U":{},"u":{last},
            "pu":{},"b":[["16800.1","1.5"]],"a":[["16800.2","2.5"]]}}}}"#,
            lower(symbol),
            last.saturating_sub(2),
            last.saturating_sub(3),
        )
    }

    pub fn depth_snapshot(last_update_id: u64) -> String {
        format!(
            r#"{{"lastUpdateId":{last_update_id},"bids":[["1.0","2.0"]],"asks":[["1.1","3.0"]]}}"#
        )
    }

    pub fn http_trades(count: u64) -> String {
        let rows: Vec<String> = (1..=count)
            .map(|id| {
                format!(
                    r#"{{"id":{id},"price":"4.0","qty":"12.0","quoteQty":"48.0",
                    "time":{},"isBuyerMaker":true,"isBestMatch":true}}"#,
                    1_499_865_549_590 + id
                )
            })
            .collect();
        format!("[{}]", rows.join(","))
    }

    pub fn http_agg_trades(count: u64) -> String {
        let rows: Vec<String> = (1..=count)
            .map(|id| {
                format!(
                    r#"{{"a":{id},"p":"0.0163","q":"4.70","f":27781,"l":27781,
                    "T":{},"m":false,"M":true}}"#,
                    1_498_793_709_153 + id
                )
            })
            .collect();
        format!("[{}]", rows.join(","))
    }

    /// Klines one hour apart, oldest first.
    pub fn http_klines(count: u64) -> String {
        let rows: Vec<String> = (0..count)
            .map(|i| {
                let open = 1_499_040_000_000 + i * 3_600_000;
                format!(
                    r#"[{open},"0.0163","0.8","0.0157","0.0157","148976.1",{},
                    "2434.19",308,"1756.87","28.46","0"]"#,
                    open + 3_599_999
                )
            })
            .collect();
        format!("[{}]", rows.join(","))
    }
}
