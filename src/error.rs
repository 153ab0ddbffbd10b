use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::match_status::InvalidTransition,
};

/// Errors that can occur in service layer operations.
///
/// Precondition variants are raised before any mutation is attempted.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend failed while serving the request.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested match does not exist.
    #[error("match `{0}` not found")]
    NotFound(Uuid),
    /// Operation is not valid for the match's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// User already holds a roster spot.
    #[error("user `{user_id}` is already on the roster of match `{match_id}`")]
    AlreadyMember { match_id: Uuid, user_id: String },
    /// User is already waiting in the queue.
    #[error("user `{user_id}` is already queued for match `{match_id}`")]
    AlreadyQueued { match_id: Uuid, user_id: String },
    /// User is not on the roster.
    #[error("user `{user_id}` is not on the roster of match `{match_id}`")]
    NotAMember { match_id: Uuid, user_id: String },
    /// User is not in the queue.
    #[error("user `{user_id}` is not queued for match `{match_id}`")]
    NotQueued { match_id: Uuid, user_id: String },
    /// The creator tried to leave; they must cancel the match instead.
    #[error("the creator cannot leave match `{0}`; cancel it instead")]
    CreatorCannotLeave(Uuid),
    /// Caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Guarded writes kept failing because the match changed underneath.
    #[error("match `{0}` kept changing; try again")]
    Contention(Uuid),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Caller may not perform the operation.
    #[error("forbidden: {message}")]
    Forbidden { code: &'static str, message: String },
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state; `code` tells callers which one.
    #[error("conflict: {message}")]
    Conflict { code: &'static str, message: String },
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Machine-readable error kind exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Forbidden { code, .. } | AppError::Conflict { code, .. } => *code,
            AppError::NotFound(_) => "not_found",
            AppError::ServiceUnavailable(_) => "storage_unavailable",
        }
    }

    fn conflict(code: &'static str, err: &ServiceError) -> Self {
        AppError::Conflict {
            code,
            message: err.to_string(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(ref source) => {
                AppError::ServiceUnavailable(source.to_string())
            }
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(_) => AppError::NotFound(err.to_string()),
            ServiceError::InvalidState(_) => AppError::conflict("invalid_state", &err),
            ServiceError::AlreadyMember { .. } => AppError::conflict("already_member", &err),
            ServiceError::AlreadyQueued { .. } => AppError::conflict("already_queued", &err),
            ServiceError::NotAMember { .. } => AppError::conflict("not_a_member", &err),
            ServiceError::NotQueued { .. } => AppError::conflict("not_queued", &err),
            ServiceError::Contention(_) => AppError::conflict("contention", &err),
            ServiceError::CreatorCannotLeave(_) => AppError::Forbidden {
                code: "creator_cannot_leave",
                message: err.to_string(),
            },
            ServiceError::Forbidden(message) => AppError::Forbidden {
                code: "forbidden",
                message,
            },
        }
    }
}

/// Error payload returned by every failing route.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable error kind, e.g. `already_member` or `creator_cannot_leave`.
    pub code: String,
    /// Human readable description.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_errors_keep_distinct_codes() {
        let match_id = Uuid::new_v4();
        let cases = [
            (
                ServiceError::AlreadyMember {
                    match_id,
                    user_id: "u".into(),
                },
                "already_member",
            ),
            (
                ServiceError::AlreadyQueued {
                    match_id,
                    user_id: "u".into(),
                },
                "already_queued",
            ),
            (
                ServiceError::NotAMember {
                    match_id,
                    user_id: "u".into(),
                },
                "not_a_member",
            ),
            (
                ServiceError::NotQueued {
                    match_id,
                    user_id: "u".into(),
                },
                "not_queued",
            ),
            (ServiceError::CreatorCannotLeave(match_id), "creator_cannot_leave"),
            (ServiceError::NotFound(match_id), "not_found"),
            (ServiceError::InvalidState("x".into()), "invalid_state"),
            (ServiceError::Degraded, "storage_unavailable"),
        ];

        for (err, code) in cases {
            assert_eq!(AppError::from(err).code(), code);
        }
    }

    #[test]
    fn creator_leave_maps_to_forbidden_status() {
        let response = AppError::from(ServiceError::CreatorCannotLeave(Uuid::new_v4())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn membership_conflicts_map_to_conflict_status() {
        let response = AppError::from(ServiceError::AlreadyMember {
            match_id: Uuid::new_v4(),
            user_id: "u".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
