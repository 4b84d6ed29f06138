//! Prelude module for convenient imports.
//!
//! ```ignore
//! use venuefeed::prelude::*;
//! ```

// Model
pub use venuefeed_core::error::{Error as CoreError, Result as CoreResult};
pub use venuefeed_core::{
    AccountType, AggregationSource, AggressorSide, Bar, BarAggregation, BarSpecification,
    BarType, BookAction, BookDelta, BookDeltaBatch, BookType, CorrelationId, Data, Instrument,
    InstrumentId, OrderSide, PriceType, QuoteTick, Symbol, Ticker, TradeTick, Venue,
};

// Sinks
pub use venuefeed_channel::{
    CollectingSink, DataResponse, DataSink, FeedEvent, FeedReceiver, FeedSender, ResponsePayload,
};

// Transport
pub use venuefeed_client::{HttpRequest, MarketHttpClient, StreamClient, Transport, TransportError};

// Adapter
pub use venuefeed_marketdata::{
    BookSyncState, DataClientConfig, DataClientError, DispatchStatsSnapshot, InstrumentRegistry,
    InstrumentStore, MarketDataClient, MarketDataClientBuilder, Rejection, RouteTable,
    SubscriptionKey, VenueCapabilities,
};
