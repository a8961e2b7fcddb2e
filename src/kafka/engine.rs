//! The seam between the batch loops and the transport engine.
//!
//! [`Consumer`](super::Consumer) and [`Producer`](super::Producer) only ever
//! talk to the log through these traits. The librdkafka-backed
//! implementations live in [`super::transport`].

use super::types::{OutboundRecord, Record, TopicPartitionOffset};
use std::time::Duration;

/// An error code from the transport engine's shared error-code table.
/// Zero is success; everything else is passed through untranslated.
pub type StatusCode = i32;

pub const NO_ERROR: StatusCode = 0;

/// Result of one retrieval attempt. Exactly one per poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Record(Record),
    EndOfPartition,
    TimedOut,
    TransportError(String),
}

pub trait ConsumerEngine {
    /// Replaces the current subscription with `topics`.
    fn subscribe(&mut self, topics: &[&str]) -> StatusCode;

    /// Replaces the current assignment with explicit starting positions.
    fn assign(&mut self, assignments: &[TopicPartitionOffset]) -> StatusCode;

    /// Drops any subscription or assignment.
    fn unsubscribe(&mut self);

    /// Waits at most `timeout` for the next record.
    fn poll(&mut self, timeout: Duration) -> RetrievalOutcome;
}

pub trait ProducerEngine {
    /// Queues a record for asynchronous delivery. The engine copies the key
    /// and payload before returning.
    fn submit(&mut self, record: &OutboundRecord) -> StatusCode;

    /// Waits at most `timeout` for queued records to be handed off.
    fn flush(&mut self, timeout: Duration) -> StatusCode;

    /// Length of the engine's outbound queue: records not yet acknowledged
    /// plus pending engine events such as delivery reports and errors. Zero
    /// only once both have drained.
    fn in_flight(&self) -> usize;
}
