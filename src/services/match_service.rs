use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{MatchEntity, MatchQuery, MatchStatus, Position, Visibility},
        patch::{MatchPatch, PatchOp, PatchOutcome, Precondition},
    },
    error::ServiceError,
    state::{
        SharedState,
        match_status::{MatchEvent, transition},
    },
};

/// Largest roster a match may be created with.
pub const MAX_TOTAL_SLOTS: u32 = 50;
/// Longest per-match duration accepted, in minutes.
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Validated input for [`create_match`].
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub title: String,
    pub creator_id: String,
    pub total_slots: u32,
    pub visibility: Visibility,
    pub start_time: SystemTime,
    pub duration_minutes: Option<u32>,
}

/// Changes recorded on a roster entry; `None` leaves the field untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RosterEntryUpdate {
    pub has_paid: Option<bool>,
    pub position: Option<Position>,
}

/// Load a match or fail with [`ServiceError::NotFound`].
pub(crate) async fn fetch_match(
    store: &dyn MatchStore,
    id: Uuid,
) -> Result<MatchEntity, ServiceError> {
    store
        .find_match(id)
        .await?
        .ok_or(ServiceError::NotFound(id))
}

/// Persist a new scheduled match with its creator as the only roster member.
pub async fn create_match(
    state: &SharedState,
    request: NewMatch,
) -> Result<MatchEntity, ServiceError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ServiceError::InvalidInput("title must not be empty".into()));
    }
    if request.creator_id.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "creator_id must not be empty".into(),
        ));
    }
    if !(1..=MAX_TOTAL_SLOTS).contains(&request.total_slots) {
        return Err(ServiceError::InvalidInput(format!(
            "total_slots must be between 1 and {MAX_TOTAL_SLOTS}"
        )));
    }
    if request
        .duration_minutes
        .is_some_and(|minutes| !(1..=MAX_DURATION_MINUTES).contains(&minutes))
    {
        return Err(ServiceError::InvalidInput(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }

    let store = state.require_match_store().await?;
    let entity = MatchEntity::new(
        title.to_owned(),
        request.creator_id,
        request.total_slots,
        request.visibility,
        request.start_time,
        request.duration_minutes,
    );
    store.insert_match(entity.clone()).await?;

    info!(
        match_id = %entity.id,
        creator_id = %entity.creator_id,
        total_slots = entity.total_slots,
        "match created"
    );
    Ok(entity)
}

pub async fn get_match(state: &SharedState, id: Uuid) -> Result<MatchEntity, ServiceError> {
    let store = state.require_match_store().await?;
    fetch_match(store.as_ref(), id).await
}

/// Matches in the given statuses (all when `None`), earliest kick-off first.
pub async fn list_matches(
    state: &SharedState,
    statuses: Option<Vec<MatchStatus>>,
) -> Result<Vec<MatchEntity>, ServiceError> {
    let store = state.require_match_store().await?;
    let query = match statuses {
        Some(statuses) => MatchQuery::with_statuses(statuses),
        None => MatchQuery::all(),
    };
    Ok(store.list_matches(query).await?)
}

/// Call a scheduled match off. Only its creator may do so.
pub async fn cancel_match(
    state: &SharedState,
    id: Uuid,
    user_id: &str,
) -> Result<MatchEntity, ServiceError> {
    let store = state.require_match_store().await?;
    let retry_limit = state.config().mutation_retry_limit();

    for _ in 0..=retry_limit {
        let entity = fetch_match(store.as_ref(), id).await?;
        if entity.creator_id != user_id {
            return Err(ServiceError::Forbidden(format!(
                "only the creator may cancel match `{id}`"
            )));
        }
        let next = transition(entity.status, MatchEvent::Cancel)?;

        let patch = MatchPatch::new()
            .expect(Precondition::StatusIs(entity.status))
            .then(PatchOp::SetStatus(next));
        match store.patch_match(id, patch).await? {
            PatchOutcome::Applied(cancelled) => {
                info!(match_id = %id, "match cancelled by its creator");
                return Ok(cancelled);
            }
            PatchOutcome::PreconditionFailed => continue,
            PatchOutcome::NotFound => return Err(ServiceError::NotFound(id)),
        }
    }

    Err(ServiceError::Contention(id))
}

/// Record payment status or assign a position on a roster entry.
pub async fn update_roster_entry(
    state: &SharedState,
    id: Uuid,
    user_id: &str,
    update: RosterEntryUpdate,
) -> Result<MatchEntity, ServiceError> {
    if update.has_paid.is_none() && update.position.is_none() {
        return Err(ServiceError::InvalidInput(
            "provide has_paid and/or position".into(),
        ));
    }

    let store = state.require_match_store().await?;
    let entity = fetch_match(store.as_ref(), id).await?;
    let not_a_member = || ServiceError::NotAMember {
        match_id: id,
        user_id: user_id.to_owned(),
    };
    if !entity.has_member(user_id) {
        return Err(not_a_member());
    }

    let patch = MatchPatch::new()
        .expect(Precondition::InRoster(user_id.to_owned()))
        .then(PatchOp::UpdateRosterEntry {
            user_id: user_id.to_owned(),
            has_paid: update.has_paid,
            position: update.position,
        });
    match store.patch_match(id, patch).await? {
        PatchOutcome::Applied(updated) => Ok(updated),
        PatchOutcome::PreconditionFailed => Err(not_a_member()),
        PatchOutcome::NotFound => Err(ServiceError::NotFound(id)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::test_support::*;

    fn new_match(total_slots: u32) -> NewMatch {
        NewMatch {
            title: "  Friday futsal ".into(),
            creator_id: CREATOR.into(),
            total_slots,
            visibility: Visibility::Invite,
            start_time: SystemTime::now() + Duration::from_secs(3_600),
            duration_minutes: Some(60),
        }
    }

    #[tokio::test]
    async fn created_match_starts_with_only_its_creator() {
        let (state, store) = memory_state().await;

        let created = create_match(&state, new_match(10)).await.unwrap();

        assert_eq!(created.title, "Friday futsal");
        assert_eq!(created.status, MatchStatus::Scheduled);
        assert_eq!(created.filled_slots, 1);
        assert_eq!(member_ids(&created), vec![CREATOR]);
        assert!(created.queue.is_empty());
        assert_eq!(load(&store, created.id).await, created);
    }

    #[tokio::test]
    async fn slot_bounds_are_enforced() {
        let (state, _store) = memory_state().await;
        for total_slots in [0, MAX_TOTAL_SLOTS + 1] {
            let err = create_match(&state, new_match(total_slots))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn only_the_creator_can_cancel() {
        let (state, store) = memory_state().await;
        let id = insert(&store, scheduled_match(10, &["a"])).await;

        let err = cancel_match(&state, id, "a").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let cancelled = cancel_match(&state, id, CREATOR).await.unwrap();
        assert_eq!(cancelled.status, MatchStatus::Cancelled);
    }

    #[tokio::test]
    async fn running_match_cannot_be_cancelled() {
        let (state, store) = memory_state().await;
        let mut entity = scheduled_match(10, &[]);
        entity.status = MatchStatus::InProgress;
        let id = insert(&store, entity).await;

        let err = cancel_match(&state, id, CREATOR).await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(load(&store, id).await.status, MatchStatus::InProgress);
    }

    #[tokio::test]
    async fn payment_and_position_are_recorded_on_members_only() {
        let (state, store) = memory_state().await;
        let id = insert(&store, scheduled_match(10, &["a"])).await;

        let updated = update_roster_entry(
            &state,
            id,
            "a",
            RosterEntryUpdate {
                has_paid: Some(true),
                position: Some(Position::Goalkeeper),
            },
        )
        .await
        .unwrap();
        let entry = &updated.roster[1];
        assert!(entry.has_paid);
        assert_eq!(entry.position, Position::Goalkeeper);

        let err = update_roster_entry(
            &state,
            id,
            "stranger",
            RosterEntryUpdate {
                has_paid: Some(true),
                position: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotAMember { .. }));
    }

    #[tokio::test]
    async fn listing_filters_by_status() {
        let (state, store) = memory_state().await;
        let scheduled = insert(&store, scheduled_match(10, &[])).await;
        let mut cancelled = scheduled_match(10, &[]);
        cancelled.status = MatchStatus::Cancelled;
        insert(&store, cancelled).await;

        let listed = list_matches(&state, Some(vec![MatchStatus::Scheduled]))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, scheduled);
        assert_eq!(list_matches(&state, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn degraded_state_reports_unavailable() {
        let state = crate::state::AppState::new(crate::config::AppConfig::default());
        let err = get_match(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
