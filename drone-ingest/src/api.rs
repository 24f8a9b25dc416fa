use crate::errors::Fault;
use crate::metrics_defs::{REPORTS_REJECTED, REQUEST_DURATION};
use crate::report::RawReport;
use crate::service::{Accepted, IngestionService};
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http::StatusCode;
use serde_json::Value;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

pub const REPORTS_PATH: &str = "/api/drones";

pub fn router(service: IngestionService) -> Router {
    Router::new()
        .route(REPORTS_PATH, post(receive_report))
        .with_state(Arc::new(service))
}

async fn receive_report(
    State(service): State<Arc<IngestionService>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    tracing::info!("received drone report");

    // A panic anywhere in the pipeline comes back as a JoinError and is
    // answered with a 500.
    let response = match tokio::spawn(handle(service, body)).await {
        Ok(Ok(accepted)) => (StatusCode::OK, Json(accepted)).into_response(),
        Ok(Err(fault)) => fault.into_response(),
        Err(e) => Fault::Internal(e.to_string()).into_response(),
    };

    let status = response.status();
    histogram!(REQUEST_DURATION, "status" => status.as_str().to_string())
        .record(started.elapsed().as_secs_f64());
    tracing::info!(status = status.as_u16(), "drone report request finished");

    response
}

/// Parse, validate, publish. Nothing is published unless the first two succeed.
async fn handle(
    service: Arc<IngestionService>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Accepted, Fault> {
    let raw = parse(body).inspect_err(|_| {
        counter!(REPORTS_REJECTED, "reason" => "format").increment(1);
    })?;

    let report = raw.validate().map_err(|violations| {
        counter!(REPORTS_REJECTED, "reason" => "validation").increment(1);
        Fault::ValidationFailed(violations)
    })?;

    service.submit(report).await.map_err(Fault::from)
}

/// The body must be a JSON object. Derived struct deserialization would also
/// fill the fields from an array by position, so that shape is refused first.
fn parse(body: Result<Bytes, BytesRejection>) -> Result<RawReport, Fault> {
    let body = body.map_err(|e| Fault::BadRequestFormat(e.to_string()))?;
    let value: Value =
        serde_json::from_slice(&body).map_err(|e| Fault::BadRequestFormat(e.to_string()))?;
    if !value.is_object() {
        return Err(Fault::BadRequestFormat("report must be a JSON object".into()));
    }
    serde_json::from_value(value).map_err(|e| Fault::BadRequestFormat(e.to_string()))
}
