pub mod api;
pub mod config;
pub mod errors;
pub mod kafka;
pub mod metrics_defs;
pub mod publisher;
pub mod report;
pub mod service;

#[cfg(test)]
mod testutils;

use config::ValidationError;
use kafka::KafkaBroker;
use publisher::Publisher;
use rdkafka::error::KafkaError;
use service::IngestionService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

const BROKER_PROBE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not create broker client: {0}")]
    Kafka(#[from] KafkaError),
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ValidationError),
}

/// Serves the report API and the admin probes until `shutdown` resolves, then
/// flushes whatever the producer still has queued.
pub async fn run<F>(config: config::Config, shutdown: F) -> Result<(), IngestError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;

    let kafka = &config.kafka;
    let broker = Arc::new(KafkaBroker::new(kafka)?);
    let ready = Arc::new(AtomicBool::new(false));
    let probe = tokio::spawn(wait_for_broker(
        broker.clone(),
        kafka.topic.clone(),
        kafka.ack_timeout(),
        ready.clone(),
    ));

    let publisher = Publisher::new(broker.clone(), kafka.topic.clone(), kafka.ack_timeout());
    let app = api::router(IngestionService::new(publisher));

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown.await;
        let _ = stop_tx.send(true);
    });

    let listener = &config.listener;
    let api_listener = TcpListener::bind(format!("{}:{}", listener.host, listener.port)).await?;
    tracing::info!(
        address = %api_listener.local_addr()?,
        topic = %kafka.topic,
        "serving drone report API"
    );

    let api_task = async {
        axum::serve(api_listener, app)
            .with_graceful_shutdown(stopped(stop_rx.clone()))
            .await
    };
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(move || ready.load(Ordering::Relaxed)),
        stopped(stop_rx.clone()),
    );

    let served = tokio::try_join!(api_task, admin_task);
    probe.abort();

    let flush_timeout = kafka.ack_timeout();
    match tokio::task::spawn_blocking(move || broker.flush(flush_timeout)).await {
        Ok(Ok(())) => tracing::info!("producer flushed"),
        Ok(Err(e)) => tracing::warn!(error = %e, "could not flush producer"),
        Err(e) => tracing::error!("producer flush panicked: {e}"),
    }

    served?;
    Ok(())
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// Marks the service ready once the cluster answers for `topic`.
async fn wait_for_broker(
    broker: Arc<KafkaBroker>,
    topic: String,
    timeout: Duration,
    ready: Arc<AtomicBool>,
) {
    loop {
        let probe_broker = broker.clone();
        let probe_topic = topic.clone();
        match tokio::task::spawn_blocking(move || probe_broker.probe(&probe_topic, timeout)).await {
            Ok(Ok(())) => {
                tracing::info!(topic = %topic, "broker is reachable");
                ready.store(true, Ordering::Relaxed);
                return;
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "broker is not reachable yet"),
            Err(e) => {
                tracing::error!("broker probe panicked: {e}");
                return;
            }
        }

        tokio::time::sleep(BROKER_PROBE_INTERVAL).await;
    }
}
