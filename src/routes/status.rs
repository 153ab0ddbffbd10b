use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::status::{SingleMatchUpdateResponse, StatusUpdateReportResponse},
    error::{AppError, ErrorBody},
    services::status_updater,
    state::SharedState,
};

/// Routes triggering status update passes. Meant to be called by an external scheduler.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/status-updates", post(run_pass))
        .route("/status-updates/{id}", post(run_for_match))
}

/// Repair counters, advance statuses and promote queued users on every match.
#[utoipa::path(
    post,
    path = "/status-updates",
    tag = "status",
    responses(
        (status = 200, description = "Pass finished", body = StatusUpdateReportResponse),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn run_pass(
    State(state): State<SharedState>,
) -> Result<Json<StatusUpdateReportResponse>, AppError> {
    let report = status_updater::run_status_update_pass(&state).await?;
    Ok(Json(report.into()))
}

/// Run the same pass on a single match.
#[utoipa::path(
    post,
    path = "/status-updates/{id}",
    tag = "status",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match settled", body = SingleMatchUpdateResponse),
        (status = 404, description = "Unknown match", body = ErrorBody)
    )
)]
pub async fn run_for_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SingleMatchUpdateResponse>, AppError> {
    let update = status_updater::run_status_update_for_match(&state, id).await?;
    Ok(Json(update.into()))
}
