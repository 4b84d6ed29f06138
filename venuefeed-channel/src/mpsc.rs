//! MPSC feed channel.
//!
//! The sender half implements [`DataSink`] so it can be handed directly to the
//! adapter; the receiver half is drained by the consumer.
//!
//! Book deltas, instruments and responses are never dropped for lack of
//! room: when the channel is full they wait in an ordered backlog shared by
//! both halves. Quotes, trades, bars and tickers are dropped instead, and
//! so is anything arriving while the backlog is non-empty, which keeps the
//! delivery order intact.

use crate::sink::{DataResponse, DataSink, FeedEvent};
use crossbeam_channel::{
    Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use venuefeed_core::Data;

/// Creates a bounded feed channel pair.
///
/// # Arguments
/// * `capacity` - Maximum number of events the channel holds before
///   lossless events overflow into the backlog
///
/// # Returns
/// A tuple of (sender, receiver).
#[must_use]
pub fn channel(capacity: usize) -> (FeedSender, FeedReceiver) {
    let (sender, receiver) = bounded(capacity);
    wrap(sender, receiver)
}

/// Creates an unbounded feed channel pair.
#[must_use]
pub fn unbounded() -> (FeedSender, FeedReceiver) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    wrap(sender, receiver)
}

fn wrap(sender: Sender<FeedEvent>, receiver: Receiver<FeedEvent>) -> (FeedSender, FeedReceiver) {
    let backlog = Arc::new(Mutex::new(VecDeque::new()));
    (
        FeedSender {
            inner: sender,
            backlog: Arc::clone(&backlog),
            dropped: Arc::new(AtomicU64::new(0)),
        },
        FeedReceiver {
            inner: receiver,
            backlog,
        },
    )
}

/// Returns true for events whose loss would corrupt consumer state.
fn is_lossless(event: &FeedEvent) -> bool {
    matches!(
        event,
        FeedEvent::Data(Data::Deltas(_) | Data::Instrument(_)) | FeedEvent::Response(_)
    )
}

/// Sender half of a feed channel.
///
/// Sends never block. Lossy events that do not fit are counted and dropped.
#[derive(Clone)]
pub struct FeedSender {
    inner: Sender<FeedEvent>,
    backlog: Arc<Mutex<VecDeque<FeedEvent>>>,
    dropped: Arc<AtomicU64>,
}

impl FeedSender {
    /// Non-blocking send attempt straight into the channel, bypassing the
    /// backlog.
    ///
    /// # Errors
    /// Returns the event if the channel is full or disconnected.
    #[inline]
    pub fn try_send(&self, event: FeedEvent) -> Result<(), TrySendError<FeedEvent>> {
        self.inner.try_send(event)
    }

    /// Returns the number of events dropped because the channel was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns the number of events waiting in the backlog.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.backlog.lock().len()
    }

    /// Returns the number of events currently queued, backlog included.
    #[must_use]
    pub fn len(&self) -> usize {
        let backlog = self.backlog.lock();
        self.inner.len() + backlog.len()
    }

    /// Returns true if no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: FeedEvent) {
        let mut backlog = self.backlog.lock();
        while let Some(pending) = backlog.pop_front() {
            match self.inner.try_send(pending) {
                Ok(()) => {}
                Err(TrySendError::Full(pending)) => {
                    backlog.push_front(pending);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => {
                    let lost = backlog.len() as u64 + 1;
                    backlog.clear();
                    self.dropped.fetch_add(lost, Ordering::Relaxed);
                }
            }
        }

        let event = if backlog.is_empty() {
            match self.inner.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(event)) => event,
                Err(TrySendError::Disconnected(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Feed receiver gone, event dropped");
                    return;
                }
            }
        } else {
            event
        };

        if is_lossless(&event) {
            backlog.push_back(event);
            tracing::debug!("Feed channel full, {} events in backlog", backlog.len());
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Feed channel full, event dropped");
        }
    }
}

impl DataSink for FeedSender {
    fn on_data(&self, data: Data) {
        self.push(FeedEvent::Data(data));
    }

    fn on_response(&self, response: DataResponse) {
        self.push(FeedEvent::Response(response));
    }
}

/// Receiver half of a feed channel.
///
/// Events come out in the order they were accepted: the channel first, then
/// the backlog behind it.
pub struct FeedReceiver {
    inner: Receiver<FeedEvent>,
    backlog: Arc<Mutex<VecDeque<FeedEvent>>>,
}

impl FeedReceiver {
    /// Non-blocking receive.
    ///
    /// # Returns
    /// `Some(event)` if available, `None` if nothing is queued.
    pub fn try_recv(&self) -> Option<FeedEvent> {
        let mut backlog = self.backlog.lock();
        match self.inner.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => backlog.pop_front(),
        }
    }

    /// Blocking receive.
    ///
    /// # Returns
    /// `Some(event)` if received, `None` once every sender is gone and
    /// nothing is queued.
    pub fn recv(&self) -> Option<FeedEvent> {
        if let Some(event) = self.try_recv() {
            return Some(event);
        }
        match self.inner.recv() {
            Ok(event) => Some(event),
            Err(_) => self.backlog.lock().pop_front(),
        }
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FeedEvent> {
        if let Some(event) = self.try_recv() {
            return Some(event);
        }
        match self.inner.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.backlog.lock().pop_front(),
        }
    }

    /// Drains all currently available events.
    pub fn drain(&self) -> impl Iterator<Item = FeedEvent> + '_ {
        std::iter::from_fn(|| self.try_recv())
    }
}
