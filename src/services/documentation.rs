use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document of the matchday backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::list_matches,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::cancel_match,
        crate::routes::matches::join_match,
        crate::routes::matches::leave_match,
        crate::routes::matches::join_queue,
        crate::routes::matches::leave_queue,
        crate::routes::matches::update_roster_entry,
        crate::routes::status::run_pass,
        crate::routes::status::run_for_match,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::MembershipRequest,
            crate::dto::matches::RosterEntryUpdateRequest,
            crate::dto::matches::MatchResponse,
            crate::dto::matches::RosterEntryResponse,
            crate::dto::matches::QueueEntryResponse,
            crate::dto::matches::JoinResponse,
            crate::dto::matches::PlacementDto,
            crate::dto::status::StatusUpdateReportResponse,
            crate::dto::status::SingleMatchUpdateResponse,
            crate::dao::models::MatchStatus,
            crate::dao::models::Visibility,
            crate::dao::models::Position,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Match administration"),
        (name = "roster", description = "Roster and waiting queue membership"),
        (name = "status", description = "Status update passes"),
    )
)]
pub struct ApiDoc;
