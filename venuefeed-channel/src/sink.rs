//! Consumer callback interface.

use venuefeed_core::{Bar, CorrelationId, Data, Instrument, InstrumentId, TradeTick};

/// Payload of a correlated historical response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// Instrument definitions.
    Instruments(Vec<Instrument>),
    /// Historical trades, oldest first.
    Trades(Vec<TradeTick>),
    /// Completed historical bars plus the still open bar, if the venue sent one.
    Bars {
        /// Closed bars, oldest first.
        bars: Vec<Bar>,
        /// The current, not yet closed, interval.
        partial: Option<Bar>,
    },
}

/// Response to a historical request, keyed by the caller's token.
#[derive(Debug, Clone, PartialEq)]
pub struct DataResponse {
    /// Token supplied with the request.
    pub correlation_id: CorrelationId,
    /// Instrument the request was for.
    pub instrument_id: InstrumentId,
    /// Response payload.
    pub payload: ResponsePayload,
}

/// Everything the adapter can push to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Streaming record.
    Data(Data),
    /// Correlated response.
    Response(DataResponse),
}

/// Receives normalized records from the adapter.
///
/// Implementations must not block: they are invoked from the stream
/// dispatch path.
pub trait DataSink: Send + Sync {
    /// Called for every streaming record.
    fn on_data(&self, data: Data);

    /// Called once per successful historical request.
    fn on_response(&self, response: DataResponse);
}
