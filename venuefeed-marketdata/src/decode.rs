//! Decoders from venue wire frames to canonical records.
//!
//! Stream decoders take the raw combined-stream frame and resolve the
//! instrument through the [`SymbolCache`]. HTTP decoders take the response
//! body and the instrument the request was issued for.

use crate::capabilities::parse_interval;
use crate::error::DecodeError;
use crate::schemas::{
    AggTradeMsg, AggTradeResponse, BookTickerMsg, DepthSnapshotMsg, DepthUpdateMsg, KlineData,
    KlineMsg, KlineRow, PartialDepthMsg, RawLevel, StreamEnvelope, StreamMessage, TickerMsg,
    TradeMsg, TradeResponse,
};
use crate::symbols::SymbolCache;
use serde::de::DeserializeOwned;
use venuefeed_core::time::millis_to_nanos;
use venuefeed_core::{
    AggregationSource, AggressorSide, Bar, BarSpecification, BarType, BookDeltaBatch,
    InstrumentId, PriceType, QuoteTick, Ticker, TradeTick, UnixNanos,
};

type Result<T> = std::result::Result<T, DecodeError>;

fn parse_f64(field: &'static str, value: &str) -> Result<f64> {
    value.parse().map_err(|_| DecodeError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_levels(levels: &[RawLevel]) -> Result<Vec<(f64, f64)>> {
    levels
        .iter()
        .map(|[price, qty]| Ok((parse_f64("price", price)?, parse_f64("quantity", qty)?)))
        .collect()
}

fn message<T: DeserializeOwned>(frame: &[u8]) -> Result<StreamMessage<T>> {
    Ok(serde_json::from_slice(frame)?)
}

/// Extracts the stream tag of a frame.
///
/// # Errors
/// Returns `DecodeError::Json` if the frame is not a combined-stream envelope.
pub fn decode_stream_tag(frame: &[u8]) -> Result<String> {
    let envelope: StreamEnvelope = serde_json::from_slice(frame)?;
    Ok(envelope.stream)
}

/// Decodes a best bid/offer frame.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed.
pub fn decode_quote(frame: &[u8], cache: &SymbolCache, ts_init: UnixNanos) -> Result<QuoteTick> {
    let msg: StreamMessage<BookTickerMsg> = message(frame)?;
    let data = msg.data;
    let ts_event = data
        .transaction_time
        .or(data.event_time)
        .map_or(ts_init, millis_to_nanos);
    Ok(QuoteTick {
        instrument_id: cache.resolve(&data.symbol)?,
        bid_price: parse_f64("bid_price", &data.bid_price)?,
        ask_price: parse_f64("ask_price", &data.ask_price)?,
        bid_size: parse_f64("bid_qty", &data.bid_qty)?,
        ask_size: parse_f64("ask_qty", &data.ask_qty)?,
        ts_event,
        ts_init,
    })
}

/// Decodes a 24 hour ticker frame.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed.
pub fn decode_ticker(frame: &[u8], cache: &SymbolCache, ts_init: UnixNanos) -> Result<Ticker> {
    let data = message::<TickerMsg>(frame)?.data;
    Ok(Ticker {
        instrument_id: cache.resolve(&data.symbol)?,
        price_change: parse_f64("price_change", &data.price_change)?,
        price_change_percent: parse_f64("price_change_percent", &data.price_change_percent)?,
        weighted_avg_price: parse_f64("weighted_avg_price", &data.weighted_avg_price)?,
        last_price: parse_f64("last_price", &data.last_price)?,
        last_qty: parse_f64("last_qty", &data.last_qty)?,
        open_price: parse_f64("open_price", &data.open_price)?,
        high_price: parse_f64("high_price", &data.high_price)?,
        low_price: parse_f64("low_price", &data.low_price)?,
        volume: parse_f64("volume", &data.volume)?,
        quote_volume: parse_f64("quote_volume", &data.quote_volume)?,
        count: data.count,
        ts_event: millis_to_nanos(data.event_time),
        ts_init,
    })
}

/// Decodes a raw trade frame.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed.
pub fn decode_trade(frame: &[u8], cache: &SymbolCache, ts_init: UnixNanos) -> Result<TradeTick> {
    let data = message::<TradeMsg>(frame)?.data;
    Ok(TradeTick {
        instrument_id: cache.resolve(&data.symbol)?,
        price: parse_f64("price", &data.price)?,
        size: parse_f64("quantity", &data.quantity)?,
        aggressor_side: AggressorSide::from_buyer_maker(data.is_buyer_maker),
        trade_id: data.trade_id.to_string(),
        ts_event: millis_to_nanos(data.trade_time),
        ts_init,
    })
}

/// Decodes an aggregated trade frame.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed.
pub fn decode_agg_trade(
    frame: &[u8],
    cache: &SymbolCache,
    ts_init: UnixNanos,
) -> Result<TradeTick> {
    let data = message::<AggTradeMsg>(frame)?.data;
    Ok(TradeTick {
        instrument_id: cache.resolve(&data.symbol)?,
        price: parse_f64("price", &data.price)?,
        size: parse_f64("quantity", &data.quantity)?,
        aggressor_side: AggressorSide::from_buyer_maker(data.is_buyer_maker),
        trade_id: data.agg_trade_id.to_string(),
        ts_event: millis_to_nanos(data.trade_time),
        ts_init,
    })
}

/// Decodes a kline frame. Returns `None` while the candle is still open.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed or the interval unknown.
pub fn decode_kline(
    frame: &[u8],
    cache: &SymbolCache,
    ts_init: UnixNanos,
) -> Result<Option<Bar>> {
    let data = message::<KlineMsg>(frame)?.data;
    if !data.kline.is_closed {
        return Ok(None);
    }
    let instrument_id = cache.resolve(&data.symbol)?;
    let bar_type = external_bar_type(instrument_id, &data.kline.interval)?;
    kline_to_bar(bar_type, &data.kline, ts_init).map(Some)
}

/// Decodes a diff depth frame into an update batch.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed.
pub fn decode_depth_update(
    frame: &[u8],
    cache: &SymbolCache,
    ts_init: UnixNanos,
) -> Result<BookDeltaBatch> {
    let data = message::<DepthUpdateMsg>(frame)?.data;
    Ok(BookDeltaBatch::update(
        cache.resolve(&data.symbol)?,
        &parse_levels(&data.bids)?,
        &parse_levels(&data.asks)?,
        data.final_update_id,
        millis_to_nanos(data.transaction_time.unwrap_or(data.event_time)),
        ts_init,
    ))
}

/// Decodes a partial depth frame into a snapshot batch.
///
/// Spot frames carry no symbol, so it is taken from the stream tag.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed or has no symbol.
pub fn decode_partial_depth(
    frame: &[u8],
    cache: &SymbolCache,
    ts_init: UnixNanos,
) -> Result<BookDeltaBatch> {
    let msg = message::<PartialDepthMsg>(frame)?;
    match msg.data {
        PartialDepthMsg::Spot(data) => {
            let symbol = symbol_from_stream(&msg.stream)?;
            snapshot_batch(cache.resolve(&symbol)?, &data, ts_init)
        }
        PartialDepthMsg::Futures(data) => Ok(BookDeltaBatch::snapshot(
            cache.resolve(&data.symbol)?,
            &parse_levels(&data.bids)?,
            &parse_levels(&data.asks)?,
            data.final_update_id,
            millis_to_nanos(data.transaction_time.unwrap_or(data.event_time)),
            ts_init,
        )),
    }
}

/// Decodes an HTTP depth snapshot body.
///
/// # Errors
/// Returns `DecodeError` if the body is malformed.
pub fn decode_depth_snapshot(
    body: &[u8],
    instrument_id: InstrumentId,
    ts_init: UnixNanos,
) -> Result<BookDeltaBatch> {
    let data: DepthSnapshotMsg = serde_json::from_slice(body)?;
    snapshot_batch(instrument_id, &data, ts_init)
}

/// Decodes an HTTP recent trades body.
///
/// # Errors
/// Returns `DecodeError` if the body is malformed.
pub fn decode_trades(
    body: &[u8],
    instrument_id: &InstrumentId,
    ts_init: UnixNanos,
) -> Result<Vec<TradeTick>> {
    let rows: Vec<TradeResponse> = serde_json::from_slice(body)?;
    rows.into_iter()
        .map(|row| {
            Ok(TradeTick {
                instrument_id: instrument_id.clone(),
                price: parse_f64("price", &row.price)?,
                size: parse_f64("qty", &row.qty)?,
                aggressor_side: AggressorSide::from_buyer_maker(row.is_buyer_maker),
                trade_id: row.id.to_string(),
                ts_event: millis_to_nanos(row.time),
                ts_init,
            })
        })
        .collect()
}

/// Decodes an HTTP aggregated trades body.
///
/// # Errors
/// Returns `DecodeError` if the body is malformed.
pub fn decode_agg_trades(
    body: &[u8],
    instrument_id: &InstrumentId,
    ts_init: UnixNanos,
) -> Result<Vec<TradeTick>> {
    let rows: Vec<AggTradeResponse> = serde_json::from_slice(body)?;
    rows.into_iter()
        .map(|row| {
            Ok(TradeTick {
                instrument_id: instrument_id.clone(),
                price: parse_f64("price", &row.price)?,
                size: parse_f64("quantity", &row.quantity)?,
                aggressor_side: AggressorSide::from_buyer_maker(row.is_buyer_maker),
                trade_id: row.agg_trade_id.to_string(),
                ts_event: millis_to_nanos(row.trade_time),
                ts_init,
            })
        })
        .collect()
}

/// Decodes an HTTP klines body, oldest first.
///
/// # Errors
/// Returns `DecodeError` if the body is malformed.
pub fn decode_klines(body: &[u8], bar_type: &BarType, ts_init: UnixNanos) -> Result<Vec<Bar>> {
    let rows: Vec<KlineRow> = serde_json::from_slice(body)?;
    rows.into_iter()
        .map(|row| {
            Ok(Bar {
                bar_type: bar_type.clone(),
                open: parse_f64("open", &row.1)?,
                high: parse_f64("high", &row.2)?,
                low: parse_f64("low", &row.3)?,
                close: parse_f64("close", &row.4)?,
                volume: parse_f64("volume", &row.5)?,
                quote_volume: parse_f64("quote_volume", &row.7)?,
                count: row.8,
                taker_buy_base_volume: parse_f64("taker_buy_base_volume", &row.9)?,
                taker_buy_quote_volume: parse_f64("taker_buy_quote_volume", &row.10)?,
                ts_event: millis_to_nanos(row.6),
                ts_init,
            })
        })
        .collect()
}

fn snapshot_batch(
    instrument_id: InstrumentId,
    data: &DepthSnapshotMsg,
    ts_init: UnixNanos,
) -> Result<BookDeltaBatch> {
    let ts_event = data
        .transaction_time
        .or(data.event_time)
        .map_or(ts_init, millis_to_nanos);
    Ok(BookDeltaBatch::snapshot(
        instrument_id,
        &parse_levels(&data.bids)?,
        &parse_levels(&data.asks)?,
        data.last_update_id,
        ts_event,
        ts_init,
    ))
}

fn symbol_from_stream(stream: &str) -> Result<String> {
    match stream.split('@').next() {
        Some(symbol) if !symbol.is_empty() => Ok(symbol.to_ascii_uppercase()),
        _ => Err(DecodeError::MissingSymbol {
            stream: stream.to_string(),
        }),
    }
}

fn external_bar_type(instrument_id: InstrumentId, interval: &str) -> Result<BarType> {
    let (step, aggregation) =
        parse_interval(interval).ok_or_else(|| DecodeError::UnknownInterval {
            interval: interval.to_string(),
        })?;
    Ok(BarType::new(
        instrument_id,
        BarSpecification::new(step, aggregation, PriceType::Last),
        AggregationSource::External,
    ))
}

fn kline_to_bar(bar_type: BarType, kline: &KlineData, ts_init: UnixNanos) -> Result<Bar> {
    Ok(Bar {
        bar_type,
        open: parse_f64("open", &kline.open)?,
        high: parse_f64("high", &kline.high)?,
        low: parse_f64("low", &kline.low)?,
        close: parse_f64("close", &kline.close)?,
        volume: parse_f64("volume", &kline.volume)?,
        quote_volume: parse_f64("quote_volume", &kline.quote_volume)?,
        count: kline.count,
        taker_buy_base_volume: parse_f64("taker_buy_base_volume", &kline.taker_buy_base_volume)?,
        taker_buy_quote_volume: parse_f64(
            "taker_buy_quote_volume",
            &kline.taker_buy_quote_volume,
        )?,
        ts_event: millis_to_nanos(kline.close_time),
        ts_init,
    })
}
