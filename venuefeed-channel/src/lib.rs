//! # venuefeed Channel
//!
//! Delivery of normalized market data to the consumer.
//!
//! This crate provides:
//! - [`DataSink`] - the callback interface the adapter pushes records through
//! - [`mpsc`] - a crossbeam backed sink feeding a single consumer thread
//! - [`collect`] - an in-memory sink that records every event

pub mod collect;
pub mod mpsc;
pub mod sink;

pub use collect::CollectingSink;
pub use mpsc::{FeedReceiver, FeedSender, channel, unbounded};
pub use sink::{DataResponse, DataSink, FeedEvent, ResponsePayload};
