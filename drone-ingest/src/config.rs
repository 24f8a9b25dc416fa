use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Kafka topic cannot be empty")]
    EmptyTopic,

    #[error("Kafka bootstrap servers cannot be empty")]
    EmptyBootstrapServers,

    #[error("Acknowledgment timeout cannot be 0")]
    ZeroAckTimeout,
}

/// Ingest service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the public report API
    #[serde(default)]
    pub listener: Listener,
    /// Listener for health and readiness probes
    #[serde(default = "Listener::admin_default")]
    pub admin_listener: Listener,
    pub kafka: KafkaConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.kafka.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl Listener {
    fn admin_default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8081,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KafkaConfig {
    /// Comma separated `host:port` list
    pub bootstrap_servers: String,
    /// Every report is published to this topic
    pub topic: String,
    /// Upper bound on waiting for the broker to acknowledge a report.
    /// Defaults to [`DEFAULT_ACK_TIMEOUT_MS`], the bound clients are promised.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Extra librdkafka producer properties, passed through as is
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 5000;

fn default_ack_timeout_ms() -> u64 {
    DEFAULT_ACK_TIMEOUT_MS
}

impl KafkaConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if self.bootstrap_servers.trim().is_empty() {
            return Err(ValidationError::EmptyBootstrapServers);
        }
        if self.ack_timeout_ms == 0 {
            return Err(ValidationError::ZeroAckTimeout);
        }
        Ok(())
    }
}
