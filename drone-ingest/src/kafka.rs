use crate::config::KafkaConfig;
use crate::publisher::{Delivery, DeliveryFuture, DeliveryStatus, MessageBroker, SendError};
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::time::Duration;

/// [`MessageBroker`] backed by a librdkafka producer.
///
/// The producer does its own batching and retries. `message.timeout.ms`
/// defaults to the acknowledgment timeout, so by the time the publisher gives
/// up waiting the client has given up retrying too.
pub struct KafkaBroker {
    producer: FutureProducer,
}

impl KafkaBroker {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let producer = client_config(config).create()?;
        Ok(Self { producer })
    }

    /// Blocks until the cluster answers a metadata request for `topic`.
    pub fn probe(&self, topic: &str, timeout: Duration) -> Result<(), KafkaError> {
        self.producer
            .client()
            .fetch_metadata(Some(topic), timeout)
            .map(|_| ())
    }

    /// Blocks until every queued message is delivered or `timeout` elapses.
    pub fn flush(&self, timeout: Duration) -> Result<(), KafkaError> {
        self.producer.flush(timeout)
    }
}

impl MessageBroker for KafkaBroker {
    fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryFuture, SendError> {
        let record = FutureRecord::<str, [u8]>::to(topic)
            .key(key)
            .payload(payload);

        let delivery = self
            .producer
            .send_result(record)
            .map_err(|(err, _record)| SendError::Kafka(err))?;

        Ok(Box::pin(async move {
            match delivery.await {
                Ok(Ok((partition, offset))) => {
                    DeliveryStatus::Delivered(Delivery { partition, offset })
                }
                Ok(Err((err, _message))) => DeliveryStatus::Failed(SendError::Kafka(err)),
                // The producer dropped the delivery callback, e.g. while shutting down.
                Err(_canceled) => DeliveryStatus::Canceled,
            }
        }))
    }
}

fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("message.timeout.ms", config.ack_timeout_ms.to_string());

    for (key, value) in &config.properties {
        client_config.set(key, value);
    }

    client_config
}
