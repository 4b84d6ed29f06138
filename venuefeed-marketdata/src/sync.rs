//! Order book snapshot/diff reconciliation.
//!
//! The venue's diff stream and the snapshot request race independently.
//! Deltas that arrive before the snapshot are buffered per instrument and
//! reconciled against the snapshot's sequence number once it lands, so the
//! consumer sees a gap-free book without replaying an update twice.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use venuefeed_channel::DataSink;
use venuefeed_core::{BookDeltaBatch, Data, InstrumentId};

/// Synchronization state of one instrument's book.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BookSyncState {
    /// Not tracked: batches are dropped.
    #[default]
    Unbuffered,
    /// Waiting for a snapshot; deltas are held in arrival order.
    Buffering(Vec<BookDeltaBatch>),
    /// Reconciled: deltas are forwarded immediately.
    Synced {
        /// Sequence of the last forwarded snapshot, if any.
        snapshot_sequence: Option<u64>,
    },
}

impl BookSyncState {
    /// Returns true while deltas are being held back.
    #[must_use]
    pub fn is_buffering(&self) -> bool {
        matches!(self, Self::Buffering(_))
    }

    /// Returns true once the book is reconciled.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

type BookHandle = Arc<Mutex<BookSyncState>>;

/// Per-instrument book state machines.
///
/// The map lock is only held to find or insert an instrument's handle; all
/// state transitions happen under that instrument's own lock, so unrelated
/// books never contend.
pub struct BookSynchronizer {
    sink: Arc<dyn DataSink>,
    books: RwLock<HashMap<InstrumentId, BookHandle>>,
}

impl BookSynchronizer {
    /// Creates a synchronizer forwarding to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn DataSink>) -> Self {
        Self {
            sink,
            books: RwLock::new(HashMap::new()),
        }
    }

    /// Starts buffering for an instrument.
    ///
    /// A book that is already buffering keeps what it holds: the diff stream
    /// is shared by every subscription to the instrument.
    pub fn begin_buffering(&self, instrument_id: &InstrumentId) {
        let handle = self
            .books
            .write()
            .entry(instrument_id.clone())
            .or_default()
            .clone();
        let mut state = handle.lock();
        if !state.is_buffering() {
            *state = BookSyncState::Buffering(Vec::new());
            tracing::debug!("Buffering book deltas for {instrument_id}");
        }
    }

    /// Handles an incremental batch from the diff stream.
    pub fn on_delta(&self, batch: BookDeltaBatch) {
        let Some(handle) = self.handle(&batch.instrument_id) else {
            untracked(&batch);
            return;
        };

        let mut state = handle.lock();
        match &mut *state {
            BookSyncState::Buffering(pending) => pending.push(batch),
            BookSyncState::Synced {
                snapshot_sequence: Some(seq),
            } if batch.sequence <= *seq => {
                tracing::debug!(
                    "Dropping stale deltas {} <= snapshot {seq} for {}",
                    batch.sequence, batch.instrument_id
                );
            }
            BookSyncState::Synced { .. } => self.forward(batch),
            BookSyncState::Unbuffered => untracked(&batch),
        }
    }

    /// Handles a snapshot, from the HTTP request or a partial depth stream.
    ///
    /// While buffering, the snapshot is forwarded and followed by every
    /// buffered batch newer than it. Once synced, snapshots older than the
    /// last forwarded one are dropped.
    pub fn on_snapshot(&self, snapshot: BookDeltaBatch) {
        let Some(handle) = self.handle(&snapshot.instrument_id) else {
            untracked(&snapshot);
            return;
        };

        let mut state = handle.lock();
        let sequence = snapshot.sequence;
        match std::mem::take(&mut *state) {
            BookSyncState::Buffering(pending) => {
                let instrument_id = snapshot.instrument_id.clone();
                self.forward(snapshot);
                let mut discarded = 0usize;
                for batch in pending {
                    if batch.sequence <= sequence {
                        discarded += 1;
                    } else {
                        self.forward(batch);
                    }
                }
                tracing::debug!(
                    "Book synced for {instrument_id} at {sequence}, discarded {discarded} buffered"
                );
            }
            BookSyncState::Synced {
                snapshot_sequence: Some(last),
            } if sequence < last => {
                tracing::debug!(
                    "Dropping stale snapshot {sequence} < {last} for {}",
                    snapshot.instrument_id
                );
                *state = BookSyncState::Synced {
                    snapshot_sequence: Some(last),
                };
                return;
            }
            BookSyncState::Synced { .. } => self.forward(snapshot),
            BookSyncState::Unbuffered => {
                untracked(&snapshot);
                return;
            }
        }
        *state = BookSyncState::Synced {
            snapshot_sequence: Some(sequence),
        };
    }

    /// Completes a subscription that takes no snapshot.
    ///
    /// The diff stream is gap-free on its own, so buffered batches are
    /// forwarded in arrival order.
    pub fn mark_synced(&self, instrument_id: &InstrumentId) {
        let Some(handle) = self.handle(instrument_id) else {
            return;
        };

        let mut state = handle.lock();
        match std::mem::take(&mut *state) {
            BookSyncState::Buffering(pending) => {
                for batch in pending {
                    self.forward(batch);
                }
                *state = BookSyncState::Synced {
                    snapshot_sequence: None,
                };
            }
            other => *state = other,
        }
    }

    /// Stops tracking an instrument. Returns true if it was tracked.
    ///
    /// A batch racing with the removal is either forwarded before this
    /// returns or dropped.
    pub fn remove(&self, instrument_id: &InstrumentId) -> bool {
        let Some(handle) = self.books.write().remove(instrument_id) else {
            return false;
        };
        *handle.lock() = BookSyncState::Unbuffered;
        true
    }

    /// Puts every tracked book back into buffering.
    ///
    /// Sequence continuity cannot be assumed across a transport gap.
    pub fn reset_all(&self) {
        let handles: Vec<BookHandle> = self.books.read().values().cloned().collect();
        for handle in handles {
            *handle.lock() = BookSyncState::Buffering(Vec::new());
        }
    }

    /// Returns a copy of an instrument's state.
    #[must_use]
    pub fn state(&self, instrument_id: &InstrumentId) -> BookSyncState {
        self.handle(instrument_id)
            .map(|handle| handle.lock().clone())
            .unwrap_or_default()
    }

    /// Returns the tracked instruments.
    #[must_use]
    pub fn tracked(&self) -> Vec<InstrumentId> {
        self.books.read().keys().cloned().collect()
    }

    fn handle(&self, instrument_id: &InstrumentId) -> Option<BookHandle> {
        self.books.read().get(instrument_id).cloned()
    }

    fn forward(&self, batch: BookDeltaBatch) {
        self.sink.on_data(Data::Deltas(batch));
    }
}

fn untracked(batch: &BookDeltaBatch) {
    tracing::debug!(
        "Dropping book batch {} for untracked {}",
        batch.sequence, batch.instrument_id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use venuefeed_channel::CollectingSink;

    fn id(s: &str) -> InstrumentId {
        format!("{s}.BINANCE").parse().unwrap()
    }

    fn delta(instrument: &InstrumentId, seq: u64) -> BookDeltaBatch {
        BookDeltaBatch::update(instrument.clone(), &[(100.0, 1.0)], &[], seq, 0, 0)
    }

    fn snapshot(instrument: &InstrumentId, seq: u64) -> BookDeltaBatch {
        BookDeltaBatch::snapshot(instrument.clone(), &[(100.0, 1.0)], &[(101.0, 1.0)], seq, 0, 0)
    }

    fn setup() -> (Arc<CollectingSink>, BookSynchronizer) {
        let sink = Arc::new(CollectingSink::new());
        let sync = BookSynchronizer::new(sink.clone());
        (sink, sync)
    }

    fn sequences(sink: &CollectingSink) -> Vec<(u64, bool)> {
        sink.book_batches()
            .iter()
            .map(|b| (b.sequence, b.is_snapshot))
            .collect()
    }

    #[test]
    fn test_untracked_is_dropped() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.on_delta(delta(&btc, 1));
        sync.on_snapshot(snapshot(&btc, 2));
        assert!(sink.is_empty());
        assert_eq!(sync.state(&btc), BookSyncState::Unbuffered);
    }

    #[test]
    fn test_begin_buffering_keeps_pending() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.begin_buffering(&btc);
        sync.on_delta(delta(&btc, 5));
        sync.on_delta(delta(&btc, 9));
        sync.begin_buffering(&btc);
        sync.on_delta(delta(&btc, 12));
        sync.mark_synced(&btc);
        assert_eq!(
            sequences(&sink),
            vec![(5, false), (9, false), (12, false)]
        );
    }

    #[test]
    fn test_batches_after_remove_are_dropped() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.begin_buffering(&btc);
        sync.on_delta(delta(&btc, 3));
        let handle = sync.handle(&btc).unwrap();
        assert!(sync.remove(&btc));

        assert_eq!(*handle.lock(), BookSyncState::Unbuffered);
        sync.on_snapshot(snapshot(&btc, 4));
        sync.mark_synced(&btc);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_buffer_then_flush() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.begin_buffering(&btc);

        for seq in [98, 99, 100, 101, 102] {
            sync.on_delta(delta(&btc, seq));
        }
        assert!(sink.is_empty());
        assert!(sync.state(&btc).is_buffering());

        sync.on_snapshot(snapshot(&btc, 100));
        assert_eq!(
            sequences(&sink),
            vec![(100, true), (101, false), (102, false)]
        );
        assert!(sync.state(&btc).is_synced());

        sync.on_delta(delta(&btc, 103));
        assert_eq!(sink.book_batches().last().unwrap().sequence, 103);
    }

    #[test]
    fn test_synced_drops_stale_deltas() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.begin_buffering(&btc);
        sync.on_delta(delta(&btc, 5));
        sync.on_snapshot(snapshot(&btc, 10));

        sync.on_delta(delta(&btc, 8));
        sync.on_delta(delta(&btc, 10));
        sync.on_delta(delta(&btc, 11));
        assert_eq!(sequences(&sink), vec![(10, true), (11, false)]);
    }

    #[test]
    fn test_gap_free_for_any_snapshot_position() {
        for snap in 0..=12u64 {
            let (sink, sync) = setup();
            let btc = id("BTCUSDT");
            sync.begin_buffering(&btc);
            for seq in 1..=6 {
                sync.on_delta(delta(&btc, seq));
            }
            sync.on_snapshot(snapshot(&btc, snap));
            for seq in 7..=10 {
                sync.on_delta(delta(&btc, seq));
            }

            let delivered = sink.book_batches();
            assert!(delivered[0].is_snapshot);
            let deltas: Vec<u64> = delivered[1..].iter().map(|b| b.sequence).collect();
            assert!(deltas.iter().all(|s| *s > snap));
            assert!(deltas.windows(2).all(|w| w[0] < w[1]));
            let expected: Vec<u64> = ((snap + 1).max(1)..=10).collect();
            assert_eq!(deltas, expected);
        }
    }

    #[test]
    fn test_stale_snapshot_dropped_after_sync() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.begin_buffering(&btc);
        sync.on_snapshot(snapshot(&btc, 50));
        sync.on_snapshot(snapshot(&btc, 40));
        sync.on_snapshot(snapshot(&btc, 60));
        assert_eq!(sequences(&sink), vec![(50, true), (60, true)]);
        assert_eq!(
            sync.state(&btc),
            BookSyncState::Synced {
                snapshot_sequence: Some(60)
            }
        );
    }

    #[test]
    fn test_mark_synced_flushes_in_order() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.begin_buffering(&btc);
        sync.on_delta(delta(&btc, 3));
        sync.on_delta(delta(&btc, 4));
        sync.mark_synced(&btc);
        assert_eq!(sequences(&sink), vec![(3, false), (4, false)]);

        sync.on_delta(delta(&btc, 1));
        assert_eq!(sink.book_batches().len(), 3);
    }

    #[test]
    fn test_instruments_are_independent() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        let eth = id("ETHUSDT");
        sync.begin_buffering(&btc);
        sync.begin_buffering(&eth);
        sync.on_delta(delta(&btc, 2));
        sync.on_delta(delta(&eth, 7));
        sync.on_snapshot(snapshot(&eth, 5));

        let batches = sink.book_batches();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.instrument_id == eth));
        assert!(sync.state(&btc).is_buffering());
    }

    #[test]
    fn test_reset_all_and_remove() {
        let (sink, sync) = setup();
        let btc = id("BTCUSDT");
        sync.begin_buffering(&btc);
        sync.on_snapshot(snapshot(&btc, 1));
        sync.reset_all();
        assert!(sync.state(&btc).is_buffering());

        sync.on_delta(delta(&btc, 2));
        assert_eq!(sink.book_batches().len(), 1);

        assert!(sync.remove(&btc));
        assert!(!sync.remove(&btc));
        assert!(sync.tracked().is_empty());
        sync.on_delta(delta(&btc, 3));
        assert_eq!(sink.book_batches().len(), 1);
    }
}
