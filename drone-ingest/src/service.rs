use crate::publisher::{PublishError, Publisher};
use crate::report::Report;
use serde::Serialize;

pub const ACCEPTED_MESSAGE: &str = "drone data accepted for processing";

/// Success body. Never echoes any report field back.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Accepted {
    pub message: &'static str,
}

/// Hands valid reports to the publisher. Broker faults are returned as they
/// are; turning them into responses is the handler's business.
#[derive(Clone)]
pub struct IngestionService {
    publisher: Publisher,
}

impl IngestionService {
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }

    pub async fn submit(&self, report: Report) -> Result<Accepted, PublishError> {
        self.publisher.publish(&report).await?;
        Ok(Accepted {
            message: ACCEPTED_MESSAGE,
        })
    }
}
