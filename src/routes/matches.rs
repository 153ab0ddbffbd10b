use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use axum_valid::Valid;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::MatchEntity,
    dto::matches::{
        CreateMatchRequest, JoinResponse, ListMatchesQuery, MatchResponse, MembershipRequest,
        RosterEntryUpdateRequest,
    },
    error::{AppError, ErrorBody},
    services::{match_service, roster_service},
    state::SharedState,
};

/// Routes for match administration and membership changes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/cancel", post(cancel_match))
        .route("/matches/{id}/join", post(join_match))
        .route("/matches/{id}/leave", post(leave_match))
        .route("/matches/{id}/queue", post(join_queue))
        .route("/matches/{id}/queue/leave", post(leave_queue))
        .route("/matches/{id}/roster/{user_id}", patch(update_roster_entry))
}

fn respond(state: &SharedState, entity: &MatchEntity) -> Json<MatchResponse> {
    Json(MatchResponse::from_entity(
        entity,
        state.config().match_duration(),
    ))
}

/// List matches, earliest kick-off first.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "matches",
    params(ListMatchesQuery),
    responses(
        (status = 200, description = "Matches", body = [MatchResponse]),
        (status = 400, description = "Invalid query", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn list_matches(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<ListMatchesQuery>>,
) -> Result<Json<Vec<MatchResponse>>, AppError> {
    let statuses = query.status.map(|status| vec![status]);
    let limit = query.limit.map_or(usize::MAX, |limit| limit as usize);
    let default_duration = state.config().match_duration();

    let matches = match_service::list_matches(&state, statuses).await?;
    Ok(Json(
        matches
            .iter()
            .take(limit)
            .map(|entity| MatchResponse::from_entity(entity, default_duration))
            .collect(),
    ))
}

/// Organize a new match with the creator as its first player.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match created", body = MatchResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), AppError> {
    payload.validate()?;
    let created = match_service::create_match(&state, payload.try_into()?).await?;
    Ok((StatusCode::CREATED, respond(&state, &created)))
}

/// Fetch a single match.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match", body = MatchResponse),
        (status = 404, description = "Unknown match", body = ErrorBody)
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    let entity = match_service::get_match(&state, id).await?;
    Ok(respond(&state, &entity))
}

/// Call a scheduled match off. Only its creator may do this.
#[utoipa::path(
    post,
    path = "/matches/{id}/cancel",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "Match cancelled", body = MatchResponse),
        (status = 403, description = "Caller is not the creator", body = ErrorBody),
        (status = 409, description = "Match is no longer scheduled", body = ErrorBody)
    )
)]
pub async fn cancel_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MembershipRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    payload.validate()?;
    let entity = match_service::cancel_match(&state, id, &payload.user_id).await?;
    Ok(respond(&state, &entity))
}

/// Join the roster, or the queue when every slot is taken.
#[utoipa::path(
    post,
    path = "/matches/{id}/join",
    tag = "roster",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "User placed on the roster or in the queue", body = JoinResponse),
        (status = 404, description = "Unknown match", body = ErrorBody),
        (status = 409, description = "Already a member, already queued or match not scheduled", body = ErrorBody)
    )
)]
pub async fn join_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MembershipRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    payload.validate()?;
    let (entity, placement) = roster_service::join_match(&state, id, &payload.user_id).await?;
    Ok(Json(JoinResponse {
        placement: placement.into(),
        details: MatchResponse::from_entity(&entity, state.config().match_duration()),
    }))
}

/// Give up a roster spot.
#[utoipa::path(
    post,
    path = "/matches/{id}/leave",
    tag = "roster",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "User left the roster", body = MatchResponse),
        (status = 403, description = "The creator cannot leave", body = ErrorBody),
        (status = 409, description = "User is not on the roster", body = ErrorBody)
    )
)]
pub async fn leave_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MembershipRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    payload.validate()?;
    let entity = roster_service::leave_match(&state, id, &payload.user_id).await?;
    Ok(respond(&state, &entity))
}

/// Reserve a spot in the waiting queue.
#[utoipa::path(
    post,
    path = "/matches/{id}/queue",
    tag = "roster",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "User queued", body = MatchResponse),
        (status = 409, description = "Already queued or already a member", body = ErrorBody)
    )
)]
pub async fn join_queue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MembershipRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    payload.validate()?;
    let entity = roster_service::join_queue(&state, id, &payload.user_id).await?;
    Ok(respond(&state, &entity))
}

/// Give up a spot in the waiting queue.
#[utoipa::path(
    post,
    path = "/matches/{id}/queue/leave",
    tag = "roster",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "User removed from the queue", body = MatchResponse),
        (status = 409, description = "User is not queued", body = ErrorBody)
    )
)]
pub async fn leave_queue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MembershipRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    payload.validate()?;
    let entity = roster_service::leave_queue(&state, id, &payload.user_id).await?;
    Ok(respond(&state, &entity))
}

/// Record payment status or assign a position to a roster member.
#[utoipa::path(
    patch,
    path = "/matches/{id}/roster/{user_id}",
    tag = "roster",
    params(
        ("id" = Uuid, Path, description = "Match identifier"),
        ("user_id" = String, Path, description = "Roster member to update")
    ),
    request_body = RosterEntryUpdateRequest,
    responses(
        (status = 200, description = "Roster entry updated", body = MatchResponse),
        (status = 409, description = "User is not on the roster", body = ErrorBody)
    )
)]
pub async fn update_roster_entry(
    State(state): State<SharedState>,
    Path((id, user_id)): Path<(Uuid, String)>,
    Json(payload): Json<RosterEntryUpdateRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let entity =
        match_service::update_roster_entry(&state, id, &user_id, payload.into()).await?;
    Ok(respond(&state, &entity))
}
