//! # Event Webhook Handler
//!
//! Accepts one change-notification envelope per call and hands it to the
//! ingestion pipeline. Each rejection class maps to a distinct status code:
//! malformed payloads are 400, events for unowned containers are 404, and
//! catalog write failures are 502 (the pending row stays for replay).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::server::AppState;

/// Response for an accepted change event.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventAcceptedResponse {
    /// Always "accepted"
    pub status: String,
    /// Id of the staged pending-asset row
    pub pending_id: String,
    /// Catalog asset id the event resolved to
    pub asset_id: String,
    /// created | updated | removed
    pub change_type: String,
}

/// Ingest one change-notification envelope.
#[utoipa::path(
    post,
    path = "/api/events",
    responses(
        (status = 202, description = "Event accepted and applied", body = EventAcceptedResponse),
        (status = 400, description = "Malformed event payload", body = ApiError),
        (status = 404, description = "No enabled connector owns the container", body = ApiError),
        (status = 502, description = "Catalog write failed; event staged for replay", body = ApiError)
    ),
    tag = "events"
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(envelope): Json<JsonValue>,
) -> Result<(StatusCode, Json<EventAcceptedResponse>), ApiError> {
    let receipt = state.ingestor.ingest(&envelope).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAcceptedResponse {
            status: "accepted".to_string(),
            pending_id: receipt.pending_id,
            asset_id: receipt.asset_id,
            change_type: receipt.change_type.as_str().to_string(),
        }),
    ))
}
