//! Administrative endpoints
//!
//! Bulk notifications and connection statistics for the admin surface.
//! Authorization happens in front of the gateway and is not re-checked here.

use crate::dispatch::TargetGroup;
use crate::registry::ConnectionStats;
use crate::server::GatewayState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use campus_common::{AppError, ErrorResponse};
use serde::{Deserialize, Serialize};

/// HTTP wrapper for [`AppError`]
///
/// Renders the error as a JSON body with the status code the error carries.
#[derive(Debug)]
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Bulk notification request body
#[derive(Debug, Clone, Deserialize)]
pub struct BulkNotificationRequest {
    pub message: String,
    #[serde(default)]
    pub target_group: TargetGroup,
}

/// Bulk notification response body
#[derive(Debug, Clone, Serialize)]
pub struct BulkNotificationResponse {
    /// Number of successful deliveries
    pub count: usize,
}

/// Send a bulk notification to the selected population
pub async fn send_bulk_notification(
    State(state): State<GatewayState>,
    Json(request): Json<BulkNotificationRequest>,
) -> Result<Json<BulkNotificationResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(AppError::validation("message must not be empty").into());
    }

    let count = state
        .dispatcher()
        .send_bulk_notification(&request.message, request.target_group)
        .await;

    tracing::info!(
        target = ?request.target_group,
        count = count,
        "Bulk notification dispatched"
    );

    Ok(Json(BulkNotificationResponse { count }))
}

/// Report a snapshot of current connection counts
pub async fn connection_stats(State(state): State<GatewayState>) -> Json<ConnectionStats> {
    Json(state.registry().stats(state.config().connections.capacity))
}
