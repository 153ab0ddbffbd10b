//! Time-driven status changes.
//!
//! [`due_status`] decides which event the wall clock has triggered and lets
//! [`transition`] pick the resulting status, so the scheduler can never move
//! a match backwards or out of a terminal status.

use std::time::{Duration, SystemTime};

use tracing::info;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{MatchEntity, MatchStatus},
        patch::{MatchPatch, PatchOp, PatchOutcome, Precondition},
    },
    error::ServiceError,
    state::match_status::{MatchEvent, transition},
};

/// Status `entity` should be in at `now`, or `None` when no transition is due.
pub fn due_status(
    entity: &MatchEntity,
    now: SystemTime,
    default_duration: Duration,
) -> Option<MatchStatus> {
    if entity.status.is_terminal() {
        return None;
    }

    let event = if now >= entity.end_time(default_duration) {
        MatchEvent::FinalWhistle
    } else if now >= entity.start_time {
        MatchEvent::Kickoff
    } else {
        return None;
    };

    transition(entity.status, event).ok()
}

/// Persist `next` if the stored status is still the one `entity` was read with.
///
/// `Ok(None)` means another writer changed the status first; nothing was written.
pub async fn apply_transition(
    store: &dyn MatchStore,
    entity: &MatchEntity,
    next: MatchStatus,
) -> Result<Option<MatchEntity>, ServiceError> {
    let patch = MatchPatch::new()
        .expect(Precondition::StatusIs(entity.status))
        .then(PatchOp::SetStatus(next));

    match store.patch_match(entity.id, patch).await? {
        PatchOutcome::Applied(updated) => {
            info!(
                match_id = %entity.id,
                from = entity.status.as_str(),
                to = next.as_str(),
                "match status advanced"
            );
            Ok(Some(updated))
        }
        PatchOutcome::PreconditionFailed => Ok(None),
        PatchOutcome::NotFound => Err(ServiceError::NotFound(entity.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;

    const TWO_HOURS: Duration = Duration::from_secs(2 * 60 * 60);
    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn starting_at(start_time: SystemTime, status: MatchStatus) -> MatchEntity {
        let mut entity = scheduled_match(10, &[]);
        entity.start_time = start_time;
        entity.status = status;
        entity
    }

    #[test]
    fn match_that_ended_an_hour_ago_completes_directly() {
        let now = SystemTime::now();
        let entity = starting_at(now - 3 * HOUR, MatchStatus::Scheduled);
        assert_eq!(
            due_status(&entity, now, TWO_HOURS),
            Some(MatchStatus::Completed)
        );
    }

    #[test]
    fn match_within_its_window_is_in_progress() {
        let now = SystemTime::now();
        let entity = starting_at(now - HOUR, MatchStatus::Scheduled);
        assert_eq!(
            due_status(&entity, now, TWO_HOURS),
            Some(MatchStatus::InProgress)
        );

        let running = starting_at(now - HOUR, MatchStatus::InProgress);
        assert_eq!(due_status(&running, now, TWO_HOURS), None);
    }

    #[test]
    fn window_edges_are_inclusive_at_start_and_end() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        let entity = starting_at(start, MatchStatus::Scheduled);
        assert_eq!(
            due_status(&entity, start, TWO_HOURS),
            Some(MatchStatus::InProgress)
        );
        assert_eq!(
            due_status(&entity, start + TWO_HOURS, TWO_HOURS),
            Some(MatchStatus::Completed)
        );
        assert_eq!(
            due_status(&entity, start - Duration::from_secs(1), TWO_HOURS),
            None
        );
    }

    #[test]
    fn per_match_duration_overrides_default() {
        let now = SystemTime::now();
        let mut entity = starting_at(now - HOUR, MatchStatus::InProgress);
        entity.duration_minutes = Some(50);
        assert_eq!(
            due_status(&entity, now, TWO_HOURS),
            Some(MatchStatus::Completed)
        );
    }

    #[test]
    fn terminal_matches_never_move() {
        let now = SystemTime::now();
        for status in [MatchStatus::Cancelled, MatchStatus::Completed] {
            let entity = starting_at(now - 3 * HOUR, status);
            assert_eq!(due_status(&entity, now, TWO_HOURS), None);
        }
    }

    #[tokio::test]
    async fn transition_is_skipped_when_status_changed_underneath() {
        let (_state, store) = memory_state().await;
        let entity = scheduled_match(10, &[]);
        let id = insert(&store, entity.clone()).await;
        apply_transition(&store, &entity, MatchStatus::Cancelled)
            .await
            .unwrap()
            .unwrap();

        let outcome = apply_transition(&store, &entity, MatchStatus::InProgress)
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(load(&store, id).await.status, MatchStatus::Cancelled);
    }
}
