//! Publishing validated reports to the broker with a bounded wait.
//!
//! The broker itself sits behind [`MessageBroker`]. Sending hands back a
//! [`DeliveryFuture`] that resolves once the broker has acknowledged (or
//! refused) the message. [`Publisher::publish`] waits on that future for at
//! most the configured acknowledgment timeout and classifies the result:
//!
//! - acknowledged within the bound: `Ok(Delivery)`
//! - bound elapsed first: [`PublishError::Timeout`]
//! - delivery future dropped by the client: [`PublishError::Interrupted`]
//! - any failure reported by the client: [`PublishError::SendFailed`]
//!
//! There is exactly one send per call. A message abandoned on timeout may still
//! be delivered later; nothing is done to take it back.

use crate::metrics_defs::{PUBLISH_FAILED, REPORTS_PUBLISHED};
use crate::report::Report;
use shared::counter;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

pub type DeliveryFuture = Pin<Box<dyn Future<Output = DeliveryStatus> + Send + 'static>>;

/// Where the broker stored an acknowledged message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug)]
pub enum DeliveryStatus {
    Delivered(Delivery),
    Failed(SendError),
    /// The client dropped the delivery without reporting an outcome.
    Canceled,
}

/// Underlying cause of a failed send.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("broker client error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("could not serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("no acknowledgment from broker within {0:?}")]
    Timeout(Duration),

    #[error("delivery was interrupted before the broker answered")]
    Interrupted,

    #[error("send failed: {0}")]
    SendFailed(#[source] SendError),
}

impl PublishError {
    /// Short tag used in logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            PublishError::Timeout(_) => "timeout",
            PublishError::Interrupted => "interrupted",
            PublishError::SendFailed(_) => "send_failed",
        }
    }
}

pub type PublishOutcome = Result<Delivery, PublishError>;

/// The publish primitive of a message broker.
///
/// Implementations must be safe to call from many requests at once.
pub trait MessageBroker: Send + Sync {
    /// Enqueues one message. An `Err` means the client refused it outright;
    /// otherwise the returned future reports the broker's answer.
    fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryFuture, SendError>;
}

#[derive(Clone)]
pub struct Publisher {
    broker: Arc<dyn MessageBroker>,
    topic: String,
    ack_timeout: Duration,
}

impl Publisher {
    pub fn new(broker: Arc<dyn MessageBroker>, topic: String, ack_timeout: Duration) -> Self {
        Self {
            broker,
            topic,
            ack_timeout,
        }
    }

    /// Sends `report` keyed by its detecting device and waits for the broker.
    pub async fn publish(&self, report: &Report) -> PublishOutcome {
        let result = self.send_and_wait(report).await;

        match &result {
            Ok(delivery) => {
                tracing::info!(
                    model = report.model(),
                    detected_by = report.detected_by(),
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "drone report published"
                );
                counter!(REPORTS_PUBLISHED).increment(1);
            }
            Err(e) => {
                counter!(PUBLISH_FAILED, "reason" => e.reason()).increment(1);
            }
        }

        result
    }

    async fn send_and_wait(&self, report: &Report) -> PublishOutcome {
        let payload = serde_json::to_vec(report)
            .map_err(|e| PublishError::SendFailed(SendError::Serialization(e)))?;

        let delivery = self
            .broker
            .send(&self.topic, report.detected_by(), &payload)
            .map_err(PublishError::SendFailed)?;

        match timeout(self.ack_timeout, delivery).await {
            Err(_elapsed) => Err(PublishError::Timeout(self.ack_timeout)),
            Ok(DeliveryStatus::Canceled) => Err(PublishError::Interrupted),
            Ok(DeliveryStatus::Failed(e)) => Err(PublishError::SendFailed(e)),
            Ok(DeliveryStatus::Delivered(delivery)) => Ok(delivery),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{Behavior, MockBroker, valid_report};

    const TOPIC: &str = "drone-topic";

    fn publisher(broker: Arc<MockBroker>) -> Publisher {
        Publisher::new(broker, TOPIC.into(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_acknowledged() {
        let broker = Arc::new(MockBroker::new(Behavior::Acknowledge));
        let result = publisher(broker.clone()).publish(&valid_report()).await;

        assert_eq!(
            result.unwrap(),
            Delivery {
                partition: 0,
                offset: 0
            }
        );

        let sent = broker.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, TOPIC);
        assert_eq!(sent[0].key, "DetectedBy");

        let payload: serde_json::Value = serde_json::from_slice(&sent[0].payload).unwrap();
        assert_eq!(payload["model"], "Model");
        assert_eq!(payload["flightAltitude"], 120.0);
        assert_eq!(payload["detectedBy"], "DetectedBy");
    }

    #[tokio::test]
    async fn test_pending_delivery_times_out() {
        let broker = Arc::new(MockBroker::new(Behavior::Pending));
        let result = publisher(broker.clone()).publish(&valid_report()).await;

        assert!(matches!(result, Err(PublishError::Timeout(d)) if d == Duration::from_millis(50)));
        assert_eq!(broker.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_canceled_delivery_is_interrupted() {
        let broker = Arc::new(MockBroker::new(Behavior::Cancel));
        let result = publisher(broker).publish(&valid_report()).await;

        assert!(matches!(result, Err(PublishError::Interrupted)));
    }

    #[tokio::test]
    async fn test_failed_delivery() {
        let broker = Arc::new(MockBroker::new(Behavior::Fail));
        let result = publisher(broker).publish(&valid_report()).await;

        let err = result.unwrap_err();
        assert_eq!(err.reason(), "send_failed");
        assert!(matches!(err, PublishError::SendFailed(SendError::Other(_))));
    }

    #[tokio::test]
    async fn test_rejected_send() {
        let broker = Arc::new(MockBroker::new(Behavior::Reject));
        let result = publisher(broker.clone()).publish(&valid_report()).await;

        assert!(matches!(result, Err(PublishError::SendFailed(_))));
        assert_eq!(broker.sent().len(), 1);
    }

    #[test]
    fn test_reasons() {
        assert_eq!(PublishError::Timeout(Duration::from_secs(5)).reason(), "timeout");
        assert_eq!(PublishError::Interrupted.reason(), "interrupted");
    }
}
