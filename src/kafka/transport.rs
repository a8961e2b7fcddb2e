use super::engine::{ConsumerEngine, ProducerEngine, RetrievalOutcome, StatusCode, NO_ERROR};
use super::types::{
    OutboundRecord, Record, TopicPartitionOffset, OFFSET_BEGINNING, OFFSET_END, OFFSET_INVALID,
    OFFSET_STORED, OFFSET_TAIL_BASE,
};
use bytes::Bytes;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use rdkafka::types::RDKafkaErrorCode;
use std::time::Duration;
use tracing::{debug, warn};

// Codes that subscribe/assign can fail with. rdkafka only keeps the engine's
// description for those calls, so the code is recovered by matching it.
const KNOWN_CODES: &[RDKafkaErrorCode] = &[
    RDKafkaErrorCode::NoError,
    RDKafkaErrorCode::Fail,
    RDKafkaErrorCode::Fatal,
    RDKafkaErrorCode::State,
    RDKafkaErrorCode::Conflict,
    RDKafkaErrorCode::UnknownGroup,
    RDKafkaErrorCode::InvalidArgument,
    RDKafkaErrorCode::UnknownTopic,
    RDKafkaErrorCode::UnknownPartition,
    RDKafkaErrorCode::UnknownTopicOrPartition,
    RDKafkaErrorCode::QueueFull,
    RDKafkaErrorCode::MessageSizeTooLarge,
    RDKafkaErrorCode::OperationTimedOut,
];

/// Maps a transport error to the engine's numeric error code.
pub fn status_code(err: &KafkaError) -> StatusCode {
    if let Some(code) = err.rdkafka_error_code() {
        return code as StatusCode;
    }

    // Subscription errors carry only the engine's err2str text, while a
    // code's Display is "Name (err2str text)".
    match err {
        KafkaError::Subscription(description) => KNOWN_CODES
            .iter()
            .find(|code| code.to_string() == format!("{:?} ({})", code, description))
            .map(|code| *code as StatusCode)
            .unwrap_or(RDKafkaErrorCode::Fail as StatusCode),
        _ => RDKafkaErrorCode::Fail as StatusCode,
    }
}

/// Human-readable name for a status code, for logs and the CLI.
pub fn describe_status(code: StatusCode) -> String {
    KNOWN_CODES
        .iter()
        .find(|known| **known as StatusCode == code)
        .map(|known| known.to_string())
        .unwrap_or_else(|| format!("engine error code {}", code))
}

fn engine_offset(raw: i64) -> Offset {
    match raw {
        OFFSET_BEGINNING => Offset::Beginning,
        OFFSET_END => Offset::End,
        OFFSET_STORED => Offset::Stored,
        OFFSET_INVALID => Offset::Invalid,
        n if n <= OFFSET_TAIL_BASE => Offset::OffsetTail(OFFSET_TAIL_BASE - n),
        n => Offset::Offset(n),
    }
}

/// [`ConsumerEngine`] backed by an rdkafka `BaseConsumer`.
pub struct RdKafkaConsumerEngine {
    consumer: BaseConsumer,
}

impl RdKafkaConsumerEngine {
    pub fn new(consumer: BaseConsumer) -> Self {
        Self { consumer }
    }
}

impl ConsumerEngine for RdKafkaConsumerEngine {
    fn subscribe(&mut self, topics: &[&str]) -> StatusCode {
        match self.consumer.subscribe(topics) {
            Ok(()) => NO_ERROR,
            Err(e) => status_code(&e),
        }
    }

    fn assign(&mut self, assignments: &[TopicPartitionOffset]) -> StatusCode {
        let mut tpl = TopicPartitionList::with_capacity(assignments.len());
        for tpo in assignments {
            if tpo.partition < 0 {
                return RDKafkaErrorCode::InvalidArgument as StatusCode;
            }
            let offset = engine_offset(tpo.offset);
            if let Err(e) = tpl.add_partition_offset(&tpo.topic, tpo.partition, offset) {
                return status_code(&e);
            }
        }

        match self.consumer.assign(&tpl) {
            Ok(()) => NO_ERROR,
            Err(e) => status_code(&e),
        }
    }

    fn unsubscribe(&mut self) {
        self.consumer.unsubscribe();
        if let Err(e) = self.consumer.unassign() {
            debug!("Unassign after unsubscribe reported: {}", e);
        }
    }

    fn poll(&mut self, timeout: Duration) -> RetrievalOutcome {
        match self.consumer.poll(timeout) {
            None => RetrievalOutcome::TimedOut,
            Some(Ok(message)) => RetrievalOutcome::Record(Record {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
                key: message.key().map(Bytes::copy_from_slice).unwrap_or_default(),
                payload: message
                    .payload()
                    .map(Bytes::copy_from_slice)
                    .unwrap_or_default(),
            }),
            Some(Err(KafkaError::PartitionEOF(_))) => RetrievalOutcome::EndOfPartition,
            Some(Err(e)) => match e.rdkafka_error_code() {
                Some(RDKafkaErrorCode::PartitionEOF) => RetrievalOutcome::EndOfPartition,
                Some(RDKafkaErrorCode::OperationTimedOut) => RetrievalOutcome::TimedOut,
                _ => RetrievalOutcome::TransportError(e.to_string()),
            },
        }
    }
}

/// [`ProducerEngine`] backed by an rdkafka `BaseProducer`.
pub struct RdKafkaProducerEngine {
    producer: BaseProducer,
}

impl RdKafkaProducerEngine {
    pub fn new(producer: BaseProducer) -> Self {
        Self { producer }
    }
}

impl ProducerEngine for RdKafkaProducerEngine {
    fn submit(&mut self, record: &OutboundRecord) -> StatusCode {
        let mut base = BaseRecord::to(&record.topic)
            .key(&record.key[..])
            .payload(&record.payload[..]);
        if let Some(partition) = record.partition {
            base = base.partition(partition);
        }

        let code = match self.producer.send(base) {
            Ok(()) => NO_ERROR,
            Err((e, _)) => status_code(&e),
        };

        // Serve delivery callbacks so the engine's queue keeps draining.
        self.producer.poll(Duration::ZERO);
        code
    }

    fn flush(&mut self, timeout: Duration) -> StatusCode {
        match self.producer.flush(timeout) {
            Ok(()) => NO_ERROR,
            Err(e) => {
                warn!("Flush did not complete: {}", e);
                status_code(&e)
            }
        }
    }

    fn in_flight(&self) -> usize {
        self.producer.in_flight_count().max(0) as usize
    }
}
