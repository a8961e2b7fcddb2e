pub mod client;
pub mod consumer;
pub mod engine;
pub mod producer;
pub mod transport;
pub mod types;


pub use client::{create_consumer, create_producer};
pub use consumer::{ConsumedBatch, Consumer, StopReason, SubscriptionMode};
pub use engine::{ConsumerEngine, ProducerEngine, RetrievalOutcome, StatusCode, NO_ERROR};
pub use producer::{Producer, SHAPE_MISMATCH};
pub use transport::{describe_status, RdKafkaConsumerEngine, RdKafkaProducerEngine};
pub use types::{OutboundRecord, Record, TopicPartitionOffset};
