use super::consumer::Consumer;
use super::producer::Producer;
use super::transport::{RdKafkaConsumerEngine, RdKafkaProducerEngine};
use crate::config::EngineConfig;
use crate::{Error, Result};
use rdkafka::consumer::BaseConsumer;
use rdkafka::error::KafkaError;
use rdkafka::producer::BaseProducer;
use tracing::{error, info};

/// Creates a producer session. Does not contact the brokers and does not
/// retry.
pub fn create_producer(config: &EngineConfig) -> Result<Producer<RdKafkaProducerEngine>> {
    let producer: BaseProducer = config
        .to_client_config()
        .create()
        .map_err(|e| creation_failed("Producer", e))?;

    info!(options = config.len(), "Producer created");
    Ok(Producer::new(
        RdKafkaProducerEngine::new(producer),
        config.clone(),
    ))
}

/// Creates a consumer session with no subscription or assignment.
pub fn create_consumer(config: &EngineConfig) -> Result<Consumer<RdKafkaConsumerEngine>> {
    let consumer: BaseConsumer = config
        .to_client_config()
        .create()
        .map_err(|e| creation_failed("Consumer", e))?;

    info!(
        options = config.len(),
        group = config.get("group.id").unwrap_or("<none>"),
        "Consumer created"
    );
    Ok(Consumer::new(
        RdKafkaConsumerEngine::new(consumer),
        config.clone(),
    ))
}

// The engine's error text is the only diagnostic available; keep it intact.
fn creation_failed(kind: &str, err: KafkaError) -> Error {
    let diagnostic = match err {
        KafkaError::ClientCreation(text) => text,
        other => other.to_string(),
    };
    error!("{} creation failed with error: {}", kind, diagnostic);
    Error::ClientCreationFailed { diagnostic }
}
