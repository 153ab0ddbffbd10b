use std::time::SystemTime;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{MatchEntity, MatchQuery, MatchStatus},
    },
    error::ServiceError,
    services::{
        consistency::verify_filled_slots,
        lifecycle::{apply_transition, due_status},
        match_service::fetch_match,
        queue_processor::promote_locked,
    },
    state::SharedState,
};

/// Aggregate counts of one status update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusUpdateReport {
    /// Matches whose status moved forward.
    pub updated: usize,
    /// Matches left unchanged: cancelled, nothing due, or failed.
    pub skipped: usize,
    /// Users promoted from queues during the pass.
    pub queue_processed: usize,
    /// Matches whose slot counter had drifted and was repaired.
    pub consistency_fixed: usize,
}

/// Outcome of updating a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleMatchUpdate {
    /// Whether the status moved forward.
    pub updated: bool,
    /// Status written by this update, if any.
    pub new_status: Option<MatchStatus>,
}

#[derive(Debug, Default)]
struct MatchPassOutcome {
    consistency_fixed: bool,
    new_status: Option<MatchStatus>,
    promoted: usize,
}

/// Settle every stored match against the current time.
pub async fn run_status_update_pass(state: &SharedState) -> Result<StatusUpdateReport, ServiceError> {
    run_status_update_pass_at(state, SystemTime::now()).await
}

/// Settle every stored match as if the time were `now`.
///
/// A failure on one match is logged and counted as skipped; the pass moves on.
pub async fn run_status_update_pass_at(
    state: &SharedState,
    now: SystemTime,
) -> Result<StatusUpdateReport, ServiceError> {
    let store = state.require_match_store().await?;
    let matches = store.list_matches(MatchQuery::all()).await?;
    let mut report = StatusUpdateReport::default();

    for entity in matches {
        let id = entity.id;
        match settle_match(state, store.as_ref(), id, now).await {
            Ok(outcome) => {
                if outcome.consistency_fixed {
                    report.consistency_fixed += 1;
                }
                if outcome.new_status.is_some() {
                    report.updated += 1;
                } else {
                    report.skipped += 1;
                }
                report.queue_processed += outcome.promoted;
            }
            Err(err) => {
                warn!(match_id = %id, error = %err, "status update failed; skipping match");
                report.skipped += 1;
            }
        }
    }

    state.locks().prune();
    info!(
        updated = report.updated,
        skipped = report.skipped,
        queue_processed = report.queue_processed,
        consistency_fixed = report.consistency_fixed,
        "status update pass finished"
    );
    Ok(report)
}

/// Settle one match. Unlike the batch pass, errors are returned to the caller.
pub async fn run_status_update_for_match(
    state: &SharedState,
    id: Uuid,
) -> Result<SingleMatchUpdate, ServiceError> {
    let store = state.require_match_store().await?;
    let outcome = settle_match(state, store.as_ref(), id, SystemTime::now()).await?;
    Ok(SingleMatchUpdate {
        updated: outcome.new_status.is_some(),
        new_status: outcome.new_status,
    })
}

/// Verifier, lifecycle then queue, on a fresh read and under the match lock.
async fn settle_match(
    state: &SharedState,
    store: &dyn MatchStore,
    id: Uuid,
    now: SystemTime,
) -> Result<MatchPassOutcome, ServiceError> {
    let _guard = state.locks().acquire(id).await;
    let retry_limit = state.config().mutation_retry_limit();
    let mut outcome = MatchPassOutcome::default();

    let entity = fetch_match(store, id).await?;
    let (mut entity, fixed) = verify_filled_slots(store, entity, retry_limit).await?;
    outcome.consistency_fixed = fixed;

    if entity.status == MatchStatus::Cancelled {
        return Ok(outcome);
    }

    if let Some(next) = due_status(&entity, now, state.config().match_duration()) {
        if let Some(moved) = apply_transition(store, &entity, next).await? {
            outcome.new_status = Some(next);
            entity = moved;
        }
    }

    if wants_promotion(&entity) {
        let (result, _) = promote_locked(store, entity, retry_limit).await?;
        outcome.promoted = result.promoted;
    }

    Ok(outcome)
}

fn wants_promotion(entity: &MatchEntity) -> bool {
    entity.status == MatchStatus::Scheduled
        && !entity.queue.is_empty()
        && entity.available_slots() > 0
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::MemoryMatchStore,
        services::test_support::*,
        state::AppState,
    };

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn started(entity: MatchEntity, ago: Duration) -> MatchEntity {
        MatchEntity {
            start_time: SystemTime::now() - ago,
            ..entity
        }
    }

    #[tokio::test]
    async fn match_that_ended_is_completed() {
        let (state, store) = memory_state().await;
        let id = insert(&store, started(scheduled_match(10, &[]), 3 * HOUR)).await;

        let report = run_status_update_pass(&state).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(load(&store, id).await.status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn drift_is_repaired_and_counted() {
        let (state, store) = memory_state().await;
        let mut entity = scheduled_match(10, &["a", "b", "c", "d", "e"]);
        entity.filled_slots = 7;
        let id = insert(&store, entity).await;

        let report = run_status_update_pass(&state).await.unwrap();

        assert_eq!(report.consistency_fixed, 1);
        assert_eq!(load(&store, id).await.filled_slots, 6);
    }

    #[tokio::test]
    async fn open_slots_are_filled_from_the_queue() {
        let (state, store) = memory_state().await;
        let entity = with_queue(
            scheduled_match(5, &["m1", "m2"]),
            &[("A", 1), ("B", 2), ("C", 3)],
        );
        let id = insert(&store, entity).await;

        let report = run_status_update_pass(&state).await.unwrap();

        assert_eq!(report.queue_processed, 2);
        assert_eq!(report.updated, 0);
        let stored = load(&store, id).await;
        assert_eq!(stored.filled_slots, 5);
        assert_eq!(queued_ids(&stored), vec!["C"]);
    }

    #[tokio::test]
    async fn cancelled_matches_are_skipped_but_counter_still_checked() {
        let (state, store) = memory_state().await;
        let mut entity = with_queue(
            started(scheduled_match(5, &[]), 3 * HOUR),
            &[("A", 1)],
        );
        entity.status = MatchStatus::Cancelled;
        entity.filled_slots = 4;
        let id = insert(&store, entity).await;

        let report = run_status_update_pass(&state).await.unwrap();

        assert_eq!(
            report,
            StatusUpdateReport {
                updated: 0,
                skipped: 1,
                queue_processed: 0,
                consistency_fixed: 1,
            }
        );
        let stored = load(&store, id).await;
        assert_eq!(stored.status, MatchStatus::Cancelled);
        assert_eq!(queued_ids(&stored), vec!["A"]);
        assert_eq!(stored.filled_slots, 1);
    }

    #[tokio::test]
    async fn second_pass_right_after_the_first_changes_nothing() {
        let (state, store) = memory_state().await;
        insert(&store, started(scheduled_match(10, &[]), 3 * HOUR)).await;
        insert(&store, started(scheduled_match(10, &[]), HOUR)).await;
        insert(
            &store,
            with_queue(scheduled_match(3, &[]), &[("A", 1), ("B", 2), ("C", 3)]),
        )
        .await;

        let first = run_status_update_pass(&state).await.unwrap();
        assert_eq!(first.updated, 2);
        assert_eq!(first.queue_processed, 2);

        let second = run_status_update_pass(&state).await.unwrap();
        assert_eq!(second.updated, 0);
        assert_eq!(second.queue_processed, 0);
        assert_eq!(second.consistency_fixed, 0);
        assert_eq!(second.skipped, 3);
    }

    #[tokio::test]
    async fn one_broken_match_does_not_stop_the_pass() {
        let memory = MemoryMatchStore::new();
        let broken = insert(&memory, started(scheduled_match(10, &[]), 3 * HOUR)).await;
        let healthy = insert(&memory, started(scheduled_match(10, &[]), 3 * HOUR)).await;

        let state = AppState::new(AppConfig::default());
        state
            .install_match_store(Arc::new(FailingMatchStore::new(memory.clone(), broken)))
            .await;

        let report = run_status_update_pass(&state).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(load(&memory, healthy).await.status, MatchStatus::Completed);
        assert_eq!(load(&memory, broken).await.status, MatchStatus::Scheduled);
    }

    #[tokio::test]
    async fn single_match_update_reports_the_new_status() {
        let (state, store) = memory_state().await;
        let id = insert(&store, started(scheduled_match(10, &[]), HOUR)).await;

        let first = run_status_update_for_match(&state, id).await.unwrap();
        assert_eq!(
            first,
            SingleMatchUpdate {
                updated: true,
                new_status: Some(MatchStatus::InProgress),
            }
        );

        let second = run_status_update_for_match(&state, id).await.unwrap();
        assert!(!second.updated);
        assert_eq!(second.new_status, None);

        let err = run_status_update_for_match(&state, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn locks_are_pruned_after_a_pass() {
        let (state, store) = memory_state().await;
        insert(&store, scheduled_match(10, &[])).await;

        run_status_update_pass(&state).await.unwrap();

        assert!(state.locks().is_empty());
    }
}
