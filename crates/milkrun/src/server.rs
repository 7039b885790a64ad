//! HTTP listener that feeds webhook deliveries through the normalizer into
//! the event store.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use milkrun_core::{normalize, EventStore, IngestError};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::WEBHOOK_PATH;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(receive_webhook))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("listening on {}{}", listener.local_addr()?, WEBHOOK_PATH);
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("listener stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

type WebhookResponse = (StatusCode, Json<Value>);

async fn receive_webhook(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> WebhookResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!(error = %rejection, "webhook body is not valid JSON");
            return rejected(StatusCode::BAD_REQUEST);
        }
    };
    debug!(%payload, "received webhook");

    match handle_webhook(state.store.as_ref(), &payload).await {
        Ok(id) => {
            info!(id = %id, "stored webhook event");
            (
                StatusCode::OK,
                Json(json!({"message": "Data received successfully!"})),
            )
        }
        Err(err @ IngestError::DuplicateKey(_)) => {
            warn!(error = %err, "duplicate webhook delivery");
            (
                StatusCode::CONFLICT,
                Json(json!({"error": "Event already recorded."})),
            )
        }
        Err(err @ IngestError::StorageUnavailable(_)) => {
            error!(error = ?err, "failed to store webhook event");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Storage unavailable, retry later."})),
            )
        }
        Err(err @ IngestError::MalformedInput { .. }) => {
            error!(error = %err, "rejected webhook event");
            rejected(StatusCode::BAD_REQUEST)
        }
    }
}

/// Normalizes one payload at the current instant and appends it.
pub async fn handle_webhook(store: &dyn EventStore, payload: &Value) -> Result<String, IngestError> {
    let record = normalize(payload, Utc::now())?;
    debug!(
        process_timestamp = %record.process_timestamp,
        process_hour = %record.process_hour,
        "normalized webhook event"
    );
    let receipt = store.append(&record).await?;
    Ok(receipt.id)
}

fn rejected(status: StatusCode) -> WebhookResponse {
    (status, Json(json!({"error": "Failed to process data."})))
}
