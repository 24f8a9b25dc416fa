use crate::publisher::{Delivery, DeliveryFuture, DeliveryStatus, MessageBroker, SendError};
use crate::report::{RawReport, Report};
use std::sync::Mutex;

/// How [`MockBroker`] answers every send.
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    Acknowledge,
    /// The delivery future never resolves.
    Pending,
    Cancel,
    Fail,
    /// `send` itself returns an error.
    Reject,
    Panic,
}

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Broker that records every send and answers according to its [`Behavior`].
pub struct MockBroker {
    behavior: Behavior,
    sent: Mutex<Vec<SentMessage>>,
}

impl MockBroker {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl MessageBroker for MockBroker {
    fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryFuture, SendError> {
        let offset = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                payload: payload.to_vec(),
            });
            sent.len() as i64 - 1
        };

        match self.behavior {
            Behavior::Acknowledge => Ok(Box::pin(async move {
                DeliveryStatus::Delivered(Delivery {
                    partition: 0,
                    offset,
                })
            })),
            Behavior::Pending => Ok(Box::pin(std::future::pending())),
            Behavior::Cancel => Ok(Box::pin(async { DeliveryStatus::Canceled })),
            Behavior::Fail => Ok(Box::pin(async {
                DeliveryStatus::Failed(SendError::Other("broker unavailable".into()))
            })),
            Behavior::Reject => Err(SendError::Other("queue full".into())),
            Behavior::Panic => panic!("broker client blew up"),
        }
    }
}

pub fn valid_raw_report() -> RawReport {
    RawReport {
        model: Some("Model".into()),
        speed: Some(50.0),
        latitude: Some(70.0),
        longitude: Some(90.0),
        flight_altitude: Some(120.0),
        detected_by: Some("DetectedBy".into()),
    }
}

pub fn valid_report() -> Report {
    valid_raw_report().validate().unwrap()
}
