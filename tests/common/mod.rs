#![allow(dead_code)]

use bytes::Bytes;
use kafka_batch::kafka::{
    ConsumerEngine, OutboundRecord, ProducerEngine, Record, RetrievalOutcome, StatusCode,
    TopicPartitionOffset, NO_ERROR,
};
use kafka_batch::EngineConfig;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine code for a full producer queue.
pub const QUEUE_FULL: StatusCode = -184;
/// Engine code for a bad argument (e.g. a partition that does not exist).
pub const INVALID_ARGUMENT: StatusCode = -186;
/// Engine code for mixing subscribe and assign on one handle.
pub const STATE: StatusCode = -172;

/// Get broker addresses for broker-backed tests from the environment.
pub fn test_brokers() -> String {
    env::var("TEST_KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string())
}

/// A topic name unique to this process and test.
pub fn test_topic(name: &str) -> String {
    format!("test_{}_{}", name, std::process::id())
}

pub fn broker_config(extra: &[(&str, &str)]) -> EngineConfig {
    let brokers = test_brokers();
    let mut pairs = vec![("bootstrap.servers", brokers.as_str())];
    pairs.extend_from_slice(extra);
    EngineConfig::from_pairs(pairs).unwrap()
}

#[derive(Default)]
struct LogState {
    partitions: BTreeMap<(String, i32), Vec<(Bytes, Bytes)>>,
    partition_counts: BTreeMap<String, i32>,
    reject_submissions: HashSet<usize>,
    submissions: usize,
}

/// A partitioned in-memory log shared by the producer and consumer engines it
/// hands out.
#[derive(Clone, Default)]
pub struct MemoryLog {
    state: Arc<Mutex<LogState>>,
}

impl MemoryLog {
    pub fn with_topic(topic: &str, partitions: i32) -> Self {
        let log = Self::default();
        log.state
            .lock()
            .unwrap()
            .partition_counts
            .insert(topic.to_string(), partitions);
        log
    }

    /// The n-th submission (zero-based, across the log's lifetime) is
    /// refused with [`QUEUE_FULL`].
    pub fn reject_submission(&self, n: usize) {
        self.state.lock().unwrap().reject_submissions.insert(n);
    }

    pub fn len(&self, topic: &str, partition: i32) -> usize {
        self.state
            .lock()
            .unwrap()
            .partitions
            .get(&(topic.to_string(), partition))
            .map_or(0, Vec::len)
    }

    pub fn producer_engine(&self) -> MemoryProducerEngine {
        MemoryProducerEngine {
            log: self.clone(),
            round_robin: 0,
        }
    }

    pub fn consumer_engine(&self, report_eof: bool) -> MemoryConsumerEngine {
        MemoryConsumerEngine {
            log: self.clone(),
            positions: Vec::new(),
            subscribed: false,
            assigned: false,
            report_eof,
            eof_reported: HashSet::new(),
            next: 0,
        }
    }
}

pub struct MemoryProducerEngine {
    log: MemoryLog,
    round_robin: i32,
}

impl ProducerEngine for MemoryProducerEngine {
    fn submit(&mut self, record: &OutboundRecord) -> StatusCode {
        let mut state = self.log.state.lock().unwrap();
        let attempt = state.submissions;
        state.submissions += 1;

        if state.reject_submissions.contains(&attempt) {
            return QUEUE_FULL;
        }

        let count = *state.partition_counts.get(&record.topic).unwrap_or(&1);
        let partition = match record.partition {
            Some(p) if p >= count => return INVALID_ARGUMENT,
            Some(p) => p,
            None => {
                self.round_robin = (self.round_robin + 1) % count;
                self.round_robin
            }
        };

        state
            .partitions
            .entry((record.topic.clone(), partition))
            .or_default()
            .push((record.key.clone(), record.payload.clone()));
        NO_ERROR
    }

    fn flush(&mut self, _timeout: Duration) -> StatusCode {
        NO_ERROR
    }

    fn in_flight(&self) -> usize {
        0
    }
}

pub struct MemoryConsumerEngine {
    log: MemoryLog,
    positions: Vec<((String, i32), i64)>,
    subscribed: bool,
    assigned: bool,
    report_eof: bool,
    eof_reported: HashSet<(String, i32)>,
    next: usize,
}

impl ConsumerEngine for MemoryConsumerEngine {
    fn subscribe(&mut self, topics: &[&str]) -> StatusCode {
        if self.assigned {
            return STATE;
        }
        let state = self.log.state.lock().unwrap();
        self.positions.clear();
        for topic in topics {
            let count = *state.partition_counts.get(*topic).unwrap_or(&1);
            for partition in 0..count {
                self.positions.push(((topic.to_string(), partition), 0));
            }
        }
        self.subscribed = true;
        NO_ERROR
    }

    fn assign(&mut self, assignments: &[TopicPartitionOffset]) -> StatusCode {
        if self.subscribed {
            return STATE;
        }
        let state = self.log.state.lock().unwrap();
        let mut positions = Vec::new();
        for tpo in assignments {
            if tpo.partition < 0 {
                return INVALID_ARGUMENT;
            }
            let key = (tpo.topic.clone(), tpo.partition);
            let end = state.partitions.get(&key).map_or(0, Vec::len) as i64;
            let start = match tpo.offset {
                -2 => 0,
                -1 => end,
                n if n >= 0 => n,
                _ => 0,
            };
            positions.push((key, start));
        }
        self.positions = positions;
        self.assigned = true;
        NO_ERROR
    }

    fn unsubscribe(&mut self) {
        self.positions.clear();
        self.subscribed = false;
        self.assigned = false;
    }

    fn poll(&mut self, _timeout: Duration) -> RetrievalOutcome {
        let state = self.log.state.lock().unwrap();

        for _ in 0..self.positions.len() {
            let index = self.next % self.positions.len();
            self.next += 1;

            let ((topic, partition), position) = &mut self.positions[index];
            let key = (topic.clone(), *partition);
            let entries = state.partitions.get(&key).map_or(&[][..], Vec::as_slice);

            if let Some((k, v)) = entries.get(*position as usize) {
                let record = Record {
                    topic: topic.clone(),
                    partition: *partition,
                    offset: *position,
                    key: k.clone(),
                    payload: v.clone(),
                };
                *position += 1;
                self.eof_reported.remove(&key);
                return RetrievalOutcome::Record(record);
            }

            if self.report_eof && self.eof_reported.insert(key) {
                return RetrievalOutcome::EndOfPartition;
            }
        }

        RetrievalOutcome::TimedOut
    }
}

/// A consumer engine that fails every poll.
pub struct BrokenConsumerEngine;

impl ConsumerEngine for BrokenConsumerEngine {
    fn subscribe(&mut self, _topics: &[&str]) -> StatusCode {
        NO_ERROR
    }

    fn assign(&mut self, _assignments: &[TopicPartitionOffset]) -> StatusCode {
        NO_ERROR
    }

    fn unsubscribe(&mut self) {}

    fn poll(&mut self, _timeout: Duration) -> RetrievalOutcome {
        RetrievalOutcome::TransportError("Broker: Leader not available".to_string())
    }
}
