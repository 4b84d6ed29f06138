//! Replays recorded venue frames through a market data client.
//!
//! Run with: `cargo run --example replay`
//!
//! The transport is the in-memory mock, so no network is needed. Set
//! `RUST_LOG=debug` to watch book synchronization.

use std::sync::Arc;
use std::time::Duration;
use venuefeed::client::mock::MockTransport;
use venuefeed::prelude::*;

const DEPTH_SNAPSHOT: &str =
    r#"{"lastUpdateId":160,"bids":[["0.0024","10"]],"asks":[["0.0026","100"]]}"#;

const FRAMES: &[&str] = &[
    r#"{"stream":"btcusdt@depth@100ms","data":{"e":"depthUpdate","E":1672515782136,
    "s":"BTCUSDT","U":157,"u":160,"b":[["0.0024","10"]],"a":[["0.0026","100"]]}}"#,
    r#"{"stream":"btcusdt@depth@100ms","data":{"e":"depthUpdate","E":1672515782137,
    "s":"BTCUSDT","U":161,"u":165,"b":[["0.0024","12"]],"a":[["0.0026","0"]]}}"#,
    r#"{"stream":"btcusdt@bookTicker","data":{"u":400900217,"s":"BTCUSDT",
    "b":"0.0024","B":"12","a":"0.0027","A":"40"}}"#,
    r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1672515782136,"s":"BTCUSDT",
    "t":12345,"p":"0.0025","q":"100","T":1672515782136,"m":true,"M":true}}"#,
    r#"{"stream":"btcusdt@unknown","data":{}}"#,
];

fn instrument() -> Result<Instrument, CoreError> {
    Ok(Instrument {
        id: "BTCUSDT.BINANCE".parse()?,
        raw_symbol: "BTCUSDT".to_string(),
        base_currency: "BTC".to_string(),
        quote_currency: "USDT".to_string(),
        price_precision: 4,
        size_precision: 0,
        price_increment: 0.0001,
        size_increment: 1.0,
        is_active: true,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let transport = Arc::new(MockTransport::new());
    transport.respond("/api/v3/depth", DEPTH_SNAPSHOT);
    transport.delay("/api/v3/depth", Duration::from_millis(50));

    let registry = Arc::new(InstrumentStore::with_instruments([instrument()?]));
    let (sink, receiver) = venuefeed::channel::channel(1024);

    let client = Arc::new(
        MarketDataClientBuilder::new(transport.clone(), registry, Arc::new(sink))
            .account_type(AccountType::Spot)
            .build()?,
    );
    client.connect().await?;

    let btc: InstrumentId = "BTCUSDT.BINANCE".parse()?;
    let subscribe = {
        let client = Arc::clone(&client);
        let btc = btc.clone();
        tokio::spawn(async move {
            client
                .subscribe_order_book(&btc, BookType::L2Mbp, Some(10), None)
                .await
        })
    };
    client.subscribe_quotes(&btc).await?;
    client.subscribe_trades(&btc).await?;

    // Frames arriving before the snapshot are buffered.
    tokio::time::sleep(Duration::from_millis(10)).await;
    for frame in FRAMES {
        client.handle_frame(frame.as_bytes());
    }
    subscribe.await??;
    tracing::info!("Book state: {:?}", client.book_state(&btc));

    let token = CorrelationId::new();
    client.request_instrument(&btc, token)?;

    for event in receiver.drain() {
        match event {
            FeedEvent::Data(Data::Deltas(batch)) => println!(
                "[Book] {} seq={} snapshot={} deltas={}",
                batch.instrument_id,
                batch.sequence,
                batch.is_snapshot,
                batch.len()
            ),
            FeedEvent::Data(data) => println!("[Data] {data:?}"),
            FeedEvent::Response(response) => {
                println!("[Response] {} {:?}", response.correlation_id, response.payload)
            }
        }
    }

    let stats = client.stats();
    println!(
        "\nframes={} decode_errors={} unrecognized={} dropped={}",
        stats.frames, stats.decode_errors, stats.unrecognized, stats.dropped
    );

    client.disconnect().await?;
    Ok(())
}
