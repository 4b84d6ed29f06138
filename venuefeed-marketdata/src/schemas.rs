//! Venue wire schemas.
//!
//! Numeric values arrive as JSON strings and are kept as strings here; the
//! decoders parse them field by field so a bad value names its field.

use serde::Deserialize;
use serde::de::IgnoredAny;

/// A `[price, quantity]` level as sent by the venue.
pub type RawLevel = [String; 2];

/// Thin envelope used to route a combined-stream frame.
#[derive(Debug, Deserialize)]
pub struct StreamEnvelope {
    /// Stream tag, e.g. `btcusdt@depth@100ms`.
    pub stream: String,
}

/// Combined-stream frame with a typed payload.
#[derive(Debug, Deserialize)]
pub struct StreamMessage<T> {
    /// Stream tag.
    pub stream: String,
    /// Payload.
    pub data: T,
}

/// Diff depth event. Futures partial depth frames share this shape.
#[derive(Debug, Deserialize)]
pub struct DepthUpdateMsg {
    /// Event time.
    #[serde(rename = "E")]
    pub event_time: u64,
    /// Transaction time, futures only.
    #[serde(rename = "T")]
    pub transaction_time: Option<u64>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// First update id in the event.
    #[serde(rename = "U")]
    pub first_update_id: u64,
    /// Final update id in the event.
    #[serde(rename = "u")]
    pub final_update_id: u64,
    /// Final update id of the previous event, futures only.
    #[serde(rename = "pu")]
    pub prev_final_update_id: Option<u64>,
    /// Bid levels.
    #[serde(rename = "b")]
    pub bids: Vec<RawLevel>,
    /// Ask levels.
    #[serde(rename = "a")]
    pub asks: Vec<RawLevel>,
}

/// Full book levels with the update id they reflect.
///
/// Used for the HTTP depth snapshot and the spot partial depth stream, which
/// carries no symbol.
#[derive(Debug, Deserialize)]
pub struct DepthSnapshotMsg {
    /// Last update id reflected in the levels.
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    /// Message output time, futures only.
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Transaction time, futures only.
    #[serde(rename = "T")]
    pub transaction_time: Option<u64>,
    /// Bid levels.
    pub bids: Vec<RawLevel>,
    /// Ask levels.
    pub asks: Vec<RawLevel>,
}

/// Partial depth payload in either market mode's shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PartialDepthMsg {
    /// Spot: levels only.
    Spot(DepthSnapshotMsg),
    /// Futures: diff event shape with the symbol.
    Futures(DepthUpdateMsg),
}

/// Best bid/offer event.
#[derive(Debug, Deserialize)]
pub struct BookTickerMsg {
    /// Order book update id.
    #[serde(rename = "u")]
    pub update_id: u64,
    /// Event time, futures only.
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Transaction time, futures only.
    #[serde(rename = "T")]
    pub transaction_time: Option<u64>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Best bid price.
    #[serde(rename = "b")]
    pub bid_price: String,
    /// Best bid quantity.
    #[serde(rename = "B")]
    pub bid_qty: String,
    /// Best ask price.
    #[serde(rename = "a")]
    pub ask_price: String,
    /// Best ask quantity.
    #[serde(rename = "A")]
    pub ask_qty: String,
}

/// Rolling 24 hour statistics event.
#[derive(Debug, Deserialize)]
pub struct TickerMsg {
    /// Event time.
    #[serde(rename = "E")]
    pub event_time: u64,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Price change.
    #[serde(rename = "p")]
    pub price_change: String,
    /// Price change percent.
    #[serde(rename = "P")]
    pub price_change_percent: String,
    /// Weighted average price.
    #[serde(rename = "w")]
    pub weighted_avg_price: String,
    /// Last price.
    #[serde(rename = "c")]
    pub last_price: String,
    /// Last quantity.
    #[serde(rename = "Q")]
    pub last_qty: String,
    /// Open price.
    #[serde(rename = "o")]
    pub open_price: String,
    /// High price.
    #[serde(rename = "h")]
    pub high_price: String,
    /// Low price.
    #[serde(rename = "l")]
    pub low_price: String,
    /// Total traded base asset volume.
    #[serde(rename = "v")]
    pub volume: String,
    /// Total traded quote asset volume.
    #[serde(rename = "q")]
    pub quote_volume: String,
    /// Number of trades.
    #[serde(rename = "n")]
    pub count: u64,
}

/// Candlestick event wrapper.
#[derive(Debug, Deserialize)]
pub struct KlineMsg {
    /// Event time.
    #[serde(rename = "E")]
    pub event_time: u64,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Candle.
    #[serde(rename = "k")]
    pub kline: KlineData,
}

/// Candle carried by a kline event.
#[derive(Debug, Deserialize)]
pub struct KlineData {
    /// Open time.
    #[serde(rename = "t")]
    pub open_time: u64,
    /// Close time.
    #[serde(rename = "T")]
    pub close_time: u64,
    /// Interval, e.g. `1m`.
    #[serde(rename = "i")]
    pub interval: String,
    /// Open price.
    #[serde(rename = "o")]
    pub open: String,
    /// Close price.
    #[serde(rename = "c")]
    pub close: String,
    /// High price.
    #[serde(rename = "h")]
    pub high: String,
    /// Low price.
    #[serde(rename = "l")]
    pub low: String,
    /// Base asset volume.
    #[serde(rename = "v")]
    pub volume: String,
    /// Number of trades.
    #[serde(rename = "n")]
    pub count: u64,
    /// Whether the candle is closed.
    #[serde(rename = "x")]
    pub is_closed: bool,
    /// Quote asset volume.
    #[serde(rename = "q")]
    pub quote_volume: String,
    /// Taker buy base asset volume.
    #[serde(rename = "V")]
    pub taker_buy_base_volume: String,
    /// Taker buy quote asset volume.
    #[serde(rename = "Q")]
    pub taker_buy_quote_volume: String,
}

/// Aggregated trade event.
#[derive(Debug, Deserialize)]
pub struct AggTradeMsg {
    /// Event time.
    #[serde(rename = "E")]
    pub event_time: u64,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Aggregate trade id.
    #[serde(rename = "a")]
    pub agg_trade_id: u64,
    /// Price.
    #[serde(rename = "p")]
    pub price: String,
    /// Quantity.
    #[serde(rename = "q")]
    pub quantity: String,
    /// Trade time.
    #[serde(rename = "T")]
    pub trade_time: u64,
    /// Whether the buyer is the maker.
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

/// Raw trade event.
#[derive(Debug, Deserialize)]
pub struct TradeMsg {
    /// Event time.
    #[serde(rename = "E")]
    pub event_time: u64,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Trade id.
    #[serde(rename = "t")]
    pub trade_id: u64,
    /// Price.
    #[serde(rename = "p")]
    pub price: String,
    /// Quantity.
    #[serde(rename = "q")]
    pub quantity: String,
    /// Trade time.
    #[serde(rename = "T")]
    pub trade_time: u64,
    /// Whether the buyer is the maker.
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

/// Entry of the recent trades endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    /// Trade id.
    pub id: u64,
    /// Price.
    pub price: String,
    /// Quantity.
    pub qty: String,
    /// Trade time.
    pub time: u64,
    /// Whether the buyer is the maker.
    pub is_buyer_maker: bool,
}

/// Entry of the aggregated trades endpoint.
#[derive(Debug, Deserialize)]
pub struct AggTradeResponse {
    /// Aggregate trade id.
    #[serde(rename = "a")]
    pub agg_trade_id: u64,
    /// Price.
    #[serde(rename = "p")]
    pub price: String,
    /// Quantity.
    #[serde(rename = "q")]
    pub quantity: String,
    /// Trade time.
    #[serde(rename = "T")]
    pub trade_time: u64,
    /// Whether the buyer is the maker.
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

/// Row of the klines endpoint: a fixed twelve element array.
#[derive(Debug, Deserialize)]
pub struct KlineRow(
    /// Open time.
    pub u64,
    /// Open.
    pub String,
    /// High.
    pub String,
    /// Low.
    pub String,
    /// Close.
    pub String,
    /// Volume.
    pub String,
    /// Close time.
    pub u64,
    /// Quote asset volume.
    pub String,
    /// Number of trades.
    pub u64,
    /// Taker buy base asset volume.
    pub String,
    /// Taker buy quote asset volume.
    pub String,
    /// Unused.
    pub IgnoredAny,
);
