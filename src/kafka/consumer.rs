use super::engine::{ConsumerEngine, RetrievalOutcome, StatusCode, NO_ERROR};
use super::transport::RdKafkaConsumerEngine;
use super::types::{Record, TopicPartitionOffset};
use crate::config::EngineConfig;
use std::time::Duration;
use tracing::{debug, instrument, warn};

// Upper bound on the up-front allocation for a batch; the vector still grows
// past it when the log delivers.
const PREALLOC_LIMIT: usize = 1024;

/// How a consumer is currently attached to the log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubscriptionMode {
    #[default]
    None,
    /// Group-managed: the broker assigns partitions and tracks offsets.
    Subscribed(Vec<String>),
    /// Client-managed: fixed partitions and starting offsets.
    Assigned(Vec<TopicPartitionOffset>),
}

/// Why a batch stopped before or at `max_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Filled,
    EndOfPartition,
    TimedOut,
    TransportError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedBatch {
    pub records: Vec<Record>,
    pub stop: StopReason,
}

/// An exclusively owned consumer session.
///
/// Every operation takes `&mut self`: a session is driven by one owner at a
/// time. Move the handle to hand it to another thread.
pub struct Consumer<E = RdKafkaConsumerEngine> {
    engine: E,
    config: EngineConfig,
    mode: SubscriptionMode,
}

impl<E: ConsumerEngine> Consumer<E> {
    pub fn new(engine: E, config: EngineConfig) -> Self {
        Self {
            engine,
            config,
            mode: SubscriptionMode::None,
        }
    }

    /// The configuration this consumer was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> &SubscriptionMode {
        &self.mode
    }

    /// Subscribes to `topics`, replacing any previous subscription.
    ///
    /// Returns the engine's status code unchanged; `0` is success.
    #[instrument(skip(self, topics), fields(topics = topics.len()))]
    pub fn subscribe<T: AsRef<str>>(&mut self, topics: &[T]) -> StatusCode {
        let names: Vec<&str> = topics.iter().map(AsRef::as_ref).collect();
        let code = self.engine.subscribe(&names);

        if code == NO_ERROR {
            debug!(?names, "Subscribed");
            self.mode =
                SubscriptionMode::Subscribed(names.iter().map(|n| n.to_string()).collect());
        } else {
            warn!(code, "Subscribe rejected by engine");
        }
        code
    }

    /// Assigns explicit partitions and starting offsets, bypassing group
    /// coordination.
    ///
    /// Mixing this with [`subscribe`](Self::subscribe) on one handle is not
    /// reconciled here; whatever the engine reports is returned.
    #[instrument(skip(self, assignments), fields(partitions = assignments.len()))]
    pub fn assign(&mut self, assignments: &[TopicPartitionOffset]) -> StatusCode {
        let code = self.engine.assign(assignments);

        if code == NO_ERROR {
            debug!("Assigned {} partition(s)", assignments.len());
            self.mode = SubscriptionMode::Assigned(assignments.to_vec());
        } else {
            warn!(code, "Assign rejected by engine");
        }
        code
    }

    pub fn unsubscribe(&mut self) {
        self.engine.unsubscribe();
        self.mode = SubscriptionMode::None;
    }

    /// Retrieves up to `max_count` records, waiting at most `timeout` for
    /// each one.
    ///
    /// End of partition, a timeout, or a transport error end the batch
    /// early and never surface as errors: a result shorter than `max_count`
    /// is the signal. Transport errors are logged.
    pub fn consume_batch(&mut self, max_count: usize, timeout: Duration) -> Vec<Record> {
        self.consume_batch_with_outcome(max_count, timeout).records
    }

    /// Like [`consume_batch`](Self::consume_batch), also reporting why the
    /// batch stopped.
    pub fn consume_batch_with_outcome(
        &mut self,
        max_count: usize,
        timeout: Duration,
    ) -> ConsumedBatch {
        let mut records = Vec::with_capacity(max_count.min(PREALLOC_LIMIT));

        let stop = loop {
            if records.len() >= max_count {
                break StopReason::Filled;
            }

            match self.engine.poll(timeout) {
                RetrievalOutcome::Record(record) => records.push(record),
                RetrievalOutcome::EndOfPartition => {
                    debug!("No additional messages available");
                    break StopReason::EndOfPartition;
                }
                RetrievalOutcome::TimedOut => {
                    debug!("Timeout was reached with no new messages");
                    break StopReason::TimedOut;
                }
                RetrievalOutcome::TransportError(message) => {
                    warn!("Consume failed: {}", message);
                    break StopReason::TransportError(message);
                }
            }
        };

        debug!(
            requested = max_count,
            received = records.len(),
            ?stop,
            "Consume batch finished"
        );
        ConsumedBatch { records, stop }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedEngine {
        outcomes: VecDeque<RetrievalOutcome>,
        polls: usize,
        subscribe_code: StatusCode,
        assign_code: StatusCode,
        subscribed: Vec<Vec<String>>,
    }

    impl ScriptedEngine {
        fn with_outcomes(outcomes: Vec<RetrievalOutcome>) -> Self {
            Self {
                outcomes: outcomes.into(),
                ..Default::default()
            }
        }
    }

    impl ConsumerEngine for ScriptedEngine {
        fn subscribe(&mut self, topics: &[&str]) -> StatusCode {
            self.subscribed
                .push(topics.iter().map(|t| t.to_string()).collect());
            self.subscribe_code
        }

        fn assign(&mut self, _assignments: &[TopicPartitionOffset]) -> StatusCode {
            self.assign_code
        }

        fn unsubscribe(&mut self) {}

        fn poll(&mut self, _timeout: Duration) -> RetrievalOutcome {
            self.polls += 1;
            self.outcomes
                .pop_front()
                .unwrap_or(RetrievalOutcome::TimedOut)
        }
    }

    fn record(offset: i64) -> RetrievalOutcome {
        RetrievalOutcome::Record(Record {
            topic: "orders".to_string(),
            partition: 0,
            offset,
            key: Bytes::from(format!("k{}", offset)),
            payload: Bytes::from(format!("v{}", offset)),
        })
    }

    fn consumer(outcomes: Vec<RetrievalOutcome>) -> Consumer<ScriptedEngine> {
        Consumer::new(ScriptedEngine::with_outcomes(outcomes), EngineConfig::default())
    }

    #[test]
    fn test_zero_max_count_never_polls() {
        let mut consumer = consumer(vec![record(0)]);
        let batch = consumer.consume_batch_with_outcome(0, Duration::from_millis(10));

        assert!(batch.records.is_empty());
        assert_eq!(batch.stop, StopReason::Filled);
        assert_eq!(consumer.engine.polls, 0);
    }

    #[test]
    fn test_full_batch_stops_at_max_count() {
        let mut consumer = consumer(vec![record(0), record(1), record(2), record(3)]);
        let batch = consumer.consume_batch_with_outcome(3, Duration::from_millis(10));

        assert_eq!(batch.stop, StopReason::Filled);
        let offsets: Vec<i64> = batch.records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
        assert_eq!(consumer.engine.polls, 3);
    }

    #[test]
    fn test_end_of_partition_returns_short_batch() {
        let mut consumer = consumer(vec![record(5), RetrievalOutcome::EndOfPartition, record(6)]);
        let batch = consumer.consume_batch_with_outcome(10, Duration::from_millis(10));

        assert_eq!(batch.stop, StopReason::EndOfPartition);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].offset, 5);
        assert_eq!(consumer.engine.polls, 2);
    }

    #[test]
    fn test_timeout_returns_accumulated_records() {
        let mut consumer = consumer(vec![record(0), record(1), RetrievalOutcome::TimedOut]);
        let records = consumer.consume_batch(5, Duration::from_millis(10));

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_transport_error_returns_partial_batch() {
        let mut consumer = consumer(vec![
            record(0),
            RetrievalOutcome::TransportError("Broker: Not leader for partition".to_string()),
            record(1),
        ]);
        let batch = consumer.consume_batch_with_outcome(5, Duration::from_millis(10));

        assert_eq!(batch.records.len(), 1);
        assert_eq!(
            batch.stop,
            StopReason::TransportError("Broker: Not leader for partition".to_string())
        );
    }

    #[test]
    fn test_empty_topic_returns_empty_batch() {
        let mut consumer = consumer(vec![]);
        let records = consumer.consume_batch(5, Duration::from_millis(10));

        assert!(records.is_empty());
        assert_eq!(consumer.engine.polls, 1);
    }

    #[test]
    fn test_record_fields_are_preserved() {
        let mut consumer = consumer(vec![record(41)]);
        let records = consumer.consume_batch(1, Duration::from_millis(10));

        assert_eq!(records[0].topic, "orders");
        assert_eq!(records[0].partition, 0);
        assert_eq!(records[0].offset, 41);
        assert_eq!(records[0].key, Bytes::from_static(b"k41"));
        assert_eq!(records[0].payload, Bytes::from_static(b"v41"));
    }

    #[test]
    fn test_subscribe_replaces_mode() {
        let mut consumer = consumer(vec![]);

        assert_eq!(consumer.subscribe(&["orders"]), NO_ERROR);
        assert_eq!(consumer.subscribe(&["payments", "refunds"]), NO_ERROR);

        assert_eq!(
            consumer.mode(),
            &SubscriptionMode::Subscribed(vec!["payments".to_string(), "refunds".to_string()])
        );
        assert_eq!(consumer.engine.subscribed.len(), 2);
    }

    #[test]
    fn test_failed_assign_keeps_previous_mode() {
        let mut consumer = consumer(vec![]);
        consumer.subscribe(&["orders"]);

        consumer.engine.assign_code = -172;
        let code = consumer.assign(&[TopicPartitionOffset::new("orders", 0, 0)]);

        assert_eq!(code, -172);
        assert!(matches!(consumer.mode(), SubscriptionMode::Subscribed(_)));
    }

    #[test]
    fn test_subscribe_passes_engine_code_through() {
        let mut consumer = consumer(vec![]);
        consumer.engine.subscribe_code = -186;

        assert_eq!(consumer.subscribe(&["bad topic"]), -186);
        assert_eq!(consumer.mode(), &SubscriptionMode::None);
    }

    #[test]
    fn test_unsubscribe_clears_mode() {
        let mut consumer = consumer(vec![]);
        consumer.assign(&[TopicPartitionOffset::new("orders", 0, 0)]);
        consumer.unsubscribe();

        assert_eq!(consumer.mode(), &SubscriptionMode::None);
    }
}
