//! In-memory sink that keeps every event it receives.

use crate::sink::{DataResponse, DataSink, FeedEvent};
use parking_lot::Mutex;
use venuefeed_core::{BookDeltaBatch, Data};

/// Sink recording events in arrival order.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<FeedEvent>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event received so far.
    #[must_use]
    pub fn events(&self) -> Vec<FeedEvent> {
        self.events.lock().clone()
    }

    /// Returns only the streaming records.
    #[must_use]
    pub fn data(&self) -> Vec<Data> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Data(d) => Some(d.clone()),
                FeedEvent::Response(_) => None,
            })
            .collect()
    }

    /// Returns only the book delta batches.
    #[must_use]
    pub fn book_batches(&self) -> Vec<BookDeltaBatch> {
        self.data()
            .into_iter()
            .filter_map(|d| match d {
                Data::Deltas(batch) => Some(batch),
                _ => None,
            })
            .collect()
    }

    /// Returns only the correlated responses.
    #[must_use]
    pub fn responses(&self) -> Vec<DataResponse> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Response(r) => Some(r.clone()),
                FeedEvent::Data(_) => None,
            })
            .collect()
    }

    /// Returns the number of events received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing has been received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl DataSink for CollectingSink {
    fn on_data(&self, data: Data) {
        self.events.lock().push(FeedEvent::Data(data));
    }

    fn on_response(&self, response: DataResponse) {
        self.events.lock().push(FeedEvent::Response(response));
    }
}
