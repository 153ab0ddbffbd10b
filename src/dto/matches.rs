//! Request and response bodies of the `/matches` routes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        MatchEntity, MatchStatus, Position, QueueEntryEntity, RosterEntryEntity, Visibility,
    },
    dto::{
        format_system_time, parse_system_time,
        validation::{validate_rfc3339, validate_user_id},
    },
    error::ServiceError,
    services::{
        match_service::{NewMatch, RosterEntryUpdate},
        roster_service::Placement,
    },
};

/// Payload used to organize a new match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateMatchRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    /// Organizer; becomes the first roster member.
    #[validate(custom(function = validate_user_id))]
    pub creator_id: String,
    /// Target roster size, creator included.
    #[validate(range(min = 1, max = 50))]
    pub total_slots: u32,
    #[serde(default)]
    pub visibility: Visibility,
    /// Kick-off as an RFC 3339 timestamp.
    #[validate(custom(function = validate_rfc3339))]
    #[schema(example = "2026-03-01T18:30:00Z")]
    pub start_time: String,
    /// Match length; the server default applies when omitted.
    #[serde(default)]
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<u32>,
}

impl TryFrom<CreateMatchRequest> for NewMatch {
    type Error = ServiceError;

    fn try_from(request: CreateMatchRequest) -> Result<Self, Self::Error> {
        let start_time = parse_system_time(&request.start_time)
            .map_err(|err| ServiceError::InvalidInput(format!("start_time: {err}")))?;
        Ok(NewMatch {
            title: request.title,
            creator_id: request.creator_id,
            total_slots: request.total_slots,
            visibility: request.visibility,
            start_time,
            duration_minutes: request.duration_minutes,
        })
    }
}

/// Identifies the caller of a membership operation.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MembershipRequest {
    #[validate(custom(function = validate_user_id))]
    pub user_id: String,
}

/// Fields an organizer can change on a roster entry. Omitted fields stay as they are.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RosterEntryUpdateRequest {
    #[serde(default)]
    pub has_paid: Option<bool>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl From<RosterEntryUpdateRequest> for RosterEntryUpdate {
    fn from(request: RosterEntryUpdateRequest) -> Self {
        RosterEntryUpdate {
            has_paid: request.has_paid,
            position: request.position,
        }
    }
}

/// Query string accepted by `GET /matches`.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ListMatchesQuery {
    /// Only return matches in this status.
    pub status: Option<MatchStatus>,
    /// Maximum number of matches returned.
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u32>,
}

/// Roster member as exposed to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterEntryResponse {
    pub user_id: String,
    pub confirmed: bool,
    pub has_paid: bool,
    pub position: Position,
}

impl From<&RosterEntryEntity> for RosterEntryResponse {
    fn from(entry: &RosterEntryEntity) -> Self {
        Self {
            user_id: entry.user_id.clone(),
            confirmed: entry.confirmed,
            has_paid: entry.has_paid,
            position: entry.position,
        }
    }
}

/// Waiting user, oldest first in [`MatchResponse::queue`].
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueEntryResponse {
    pub user_id: String,
    pub joined_at: String,
}

impl From<&QueueEntryEntity> for QueueEntryResponse {
    fn from(entry: &QueueEntryEntity) -> Self {
        Self {
            user_id: entry.user_id.clone(),
            joined_at: format_system_time(entry.joined_at),
        }
    }
}

/// Full view of a match.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchResponse {
    pub id: Uuid,
    pub title: String,
    pub creator_id: String,
    pub total_slots: u32,
    pub filled_slots: u32,
    pub available_slots: u32,
    pub status: MatchStatus,
    pub visibility: Visibility,
    pub start_time: String,
    /// Kick-off plus the match duration.
    pub end_time: String,
    /// Present only when the match overrides the server default.
    pub duration_minutes: Option<u32>,
    pub roster: Vec<RosterEntryResponse>,
    pub queue: Vec<QueueEntryResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl MatchResponse {
    /// Project `entity`; `default_duration` fills in `end_time` when the match has no override.
    pub fn from_entity(entity: &MatchEntity, default_duration: Duration) -> Self {
        let mut queue = entity.queue.iter().collect::<Vec<_>>();
        queue.sort_by_key(|entry| entry.joined_at);

        Self {
            id: entity.id,
            title: entity.title.clone(),
            creator_id: entity.creator_id.clone(),
            total_slots: entity.total_slots,
            filled_slots: entity.filled_slots,
            available_slots: entity.available_slots(),
            status: entity.status,
            visibility: entity.visibility,
            start_time: format_system_time(entity.start_time),
            end_time: format_system_time(entity.end_time(default_duration)),
            duration_minutes: entity.duration_minutes,
            roster: entity.roster.iter().map(RosterEntryResponse::from).collect(),
            queue: queue.into_iter().map(QueueEntryResponse::from).collect(),
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}

/// Where a join request landed.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementDto {
    Roster,
    Queue,
}

impl From<Placement> for PlacementDto {
    fn from(placement: Placement) -> Self {
        match placement {
            Placement::Roster => PlacementDto::Roster,
            Placement::Queue => PlacementDto::Queue,
        }
    }
}

/// Response of `POST /matches/{id}/join`.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    pub placement: PlacementDto,
    #[serde(rename = "match")]
    pub details: MatchResponse,
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn create_request(start_time: &str, total_slots: u32) -> CreateMatchRequest {
        CreateMatchRequest {
            title: "Thursday 7s".into(),
            creator_id: "organizer".into(),
            total_slots,
            visibility: Visibility::Public,
            start_time: start_time.into(),
            duration_minutes: None,
        }
    }

    #[test]
    fn create_request_validation_catches_bad_fields() {
        assert!(create_request("2026-03-01T18:30:00Z", 14).validate().is_ok());

        let errors = create_request("tomorrow", 0).validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("start_time"));
        assert!(fields.contains_key("total_slots"));
    }

    #[test]
    fn create_request_converts_start_time() {
        let new_match = NewMatch::try_from(create_request("1970-01-01T00:16:40Z", 14)).unwrap();
        assert_eq!(
            new_match.start_time,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)
        );
    }

    #[test]
    fn response_exposes_end_time_and_hides_missing_override() {
        let entity = MatchEntity::new(
            "Thursday 7s".into(),
            "organizer".into(),
            14,
            Visibility::Public,
            SystemTime::UNIX_EPOCH,
            None,
        );

        let json = serde_json::to_value(MatchResponse::from_entity(
            &entity,
            Duration::from_secs(2 * 60 * 60),
        ))
        .unwrap();

        assert_eq!(json["end_time"], "1970-01-01T02:00:00Z");
        assert_eq!(json["available_slots"], 13);
        assert_eq!(json["status"], "scheduled");
        assert!(json.get("duration_minutes").is_none());
        assert_eq!(json["roster"][0]["position"], "unassigned");
    }

    #[test]
    fn missing_membership_user_is_rejected() {
        let request = MembershipRequest {
            user_id: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
