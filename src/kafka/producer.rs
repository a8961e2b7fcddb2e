use super::engine::{ProducerEngine, StatusCode, NO_ERROR};
use super::transport::RdKafkaProducerEngine;
use super::types::OutboundRecord;
use crate::config::EngineConfig;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Returned by [`Producer::produce_keyed`] when keys and payloads differ in
/// length.
pub const SHAPE_MISMATCH: i64 = -1;

/// An exclusively owned producer session.
///
/// Counts reported by this type are accepted *submissions*. Whether the
/// broker acknowledged them depends on the engine's `acks` configuration.
pub struct Producer<E = RdKafkaProducerEngine> {
    engine: E,
    config: EngineConfig,
    flush_timeout: Duration,
}

impl<E: ProducerEngine> Producer<E> {
    pub fn new(engine: E, config: EngineConfig) -> Self {
        Self {
            engine,
            config,
            flush_timeout: Duration::ZERO,
        }
    }

    /// Sets how long [`produce_batch`](Self::produce_batch) waits for queued
    /// records after submitting a batch. Defaults to zero.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    /// Submits every record in order and returns how many the engine
    /// accepted.
    ///
    /// A rejected submission is logged and skipped, never retried, and never
    /// stops the batch. A bounded flush runs before returning.
    pub fn produce_batch(&mut self, records: &[OutboundRecord]) -> i64 {
        let mut sent: i64 = 0;

        for (index, record) in records.iter().enumerate() {
            let code = self.engine.submit(record);
            if code == NO_ERROR {
                sent += 1;
            } else {
                warn!(
                    index,
                    topic = %record.topic,
                    partition = ?record.partition,
                    code,
                    "Submission rejected by engine"
                );
            }
        }

        let code = self.engine.flush(self.flush_timeout);
        if code != NO_ERROR {
            debug!(
                code,
                in_flight = self.engine.in_flight(),
                "Flush returned before the queue drained"
            );
        }

        debug!(requested = records.len(), sent, "Produce batch finished");
        sent
    }

    /// Broadcast form: every key/payload pair goes to the same destination.
    ///
    /// Returns [`SHAPE_MISMATCH`] and sends nothing when `keys` and
    /// `payloads` differ in length.
    pub fn produce_keyed<K, P>(
        &mut self,
        topic: &str,
        partition: Option<i32>,
        keys: &[K],
        payloads: &[P],
    ) -> i64
    where
        K: AsRef<[u8]>,
        P: AsRef<[u8]>,
    {
        if keys.len() != payloads.len() {
            error!(
                keys = keys.len(),
                payloads = payloads.len(),
                "keys and payloads must be same size"
            );
            return SHAPE_MISMATCH;
        }

        let records: Vec<OutboundRecord> = keys
            .iter()
            .zip(payloads)
            .map(|(key, payload)| OutboundRecord {
                topic: topic.to_string(),
                partition,
                key: Bytes::copy_from_slice(key.as_ref()),
                payload: Bytes::copy_from_slice(payload.as_ref()),
            })
            .collect();

        self.produce_batch(&records)
    }

    /// Waits at most `timeout` for queued records to be handed off.
    pub fn flush(&mut self, timeout: Duration) -> StatusCode {
        self.engine.flush(timeout)
    }

    pub fn in_flight(&self) -> usize {
        self.engine.in_flight()
    }
}
