//! Membership changes: joining and leaving the roster or the waiting queue.
//!
//! Every mutation is one guarded patch built from a fresh read. When a guard
//! fails the match is read again and the decision is taken anew, so a user who
//! loses the race for the last slot ends up in the queue instead of failing.

use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{MatchEntity, MatchStatus, QueueEntryEntity, RosterEntryEntity},
        patch::{MatchPatch, PatchOp, PatchOutcome, Precondition},
    },
    error::ServiceError,
    services::{match_service::fetch_match, queue_processor},
    state::SharedState,
};

/// Where a joining user was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Took one of the free slots.
    Roster,
    /// Match was full; waiting in the queue.
    Queue,
}

/// Take a roster spot, or a queue spot when the match is full.
pub async fn join_match(
    state: &SharedState,
    id: Uuid,
    user_id: &str,
) -> Result<(MatchEntity, Placement), ServiceError> {
    let store = state.require_match_store().await?;
    let retry_limit = state.config().mutation_retry_limit();

    let updated = mutate(store.as_ref(), id, retry_limit, |entity| {
        if entity.status != MatchStatus::Scheduled {
            return Err(ServiceError::InvalidState(format!(
                "match `{id}` is {} and no longer accepts players",
                entity.status.as_str()
            )));
        }
        ensure_not_listed(entity, user_id)?;

        if entity.filled_slots < entity.total_slots {
            Ok(MatchPatch::new()
                .expect(Precondition::StatusIs(MatchStatus::Scheduled))
                .expect(Precondition::NotInRoster(user_id.to_owned()))
                .expect(Precondition::NotQueued(user_id.to_owned()))
                .expect(Precondition::FilledSlotsBelow(entity.total_slots))
                .then(PatchOp::AppendRoster(vec![RosterEntryEntity::confirmed(
                    user_id,
                )]))
                .then(PatchOp::IncrementFilledSlots(1)))
        } else {
            debug!(match_id = %id, user_id, "match full; reserving a queue spot instead");
            Ok(overflow_patch(user_id))
        }
    })
    .await?;

    let placement = if updated.has_member(user_id) {
        Placement::Roster
    } else {
        Placement::Queue
    };
    info!(match_id = %id, user_id, ?placement, "user joined match");
    Ok((updated, placement))
}

/// Give up a roster spot. The creator has to cancel the match instead.
///
/// With promotion on leave enabled, the freed slot is handed to the queue right
/// away; a failed promotion is logged and left for the next status update pass.
pub async fn leave_match(
    state: &SharedState,
    id: Uuid,
    user_id: &str,
) -> Result<MatchEntity, ServiceError> {
    let store = state.require_match_store().await?;
    let retry_limit = state.config().mutation_retry_limit();

    let updated = mutate(store.as_ref(), id, retry_limit, |entity| {
        if entity.creator_id == user_id {
            return Err(ServiceError::CreatorCannotLeave(id));
        }
        if !entity.has_member(user_id) {
            return Err(ServiceError::NotAMember {
                match_id: id,
                user_id: user_id.to_owned(),
            });
        }

        Ok(MatchPatch::new()
            .expect(Precondition::InRoster(user_id.to_owned()))
            .then(PatchOp::RemoveRoster(vec![user_id.to_owned()]))
            .then(PatchOp::IncrementFilledSlots(-1)))
    })
    .await?;
    info!(match_id = %id, user_id, filled_slots = updated.filled_slots, "user left match");

    let promote = state.config().promote_on_leave()
        && updated.status == MatchStatus::Scheduled
        && !updated.queue.is_empty();
    if !promote {
        return Ok(updated);
    }

    match queue_processor::process_queue(state, id).await {
        Ok((_, promoted)) => Ok(promoted),
        Err(err) => {
            warn!(match_id = %id, error = %err, "promotion after leave failed; deferring to next pass");
            Ok(updated)
        }
    }
}

/// Reserve a spot in the waiting queue.
pub async fn join_queue(
    state: &SharedState,
    id: Uuid,
    user_id: &str,
) -> Result<MatchEntity, ServiceError> {
    let store = state.require_match_store().await?;
    let retry_limit = state.config().mutation_retry_limit();

    let updated = mutate(store.as_ref(), id, retry_limit, |entity| {
        ensure_not_listed(entity, user_id)?;
        Ok(queue_patch(user_id))
    })
    .await?;

    info!(match_id = %id, user_id, queue_len = updated.queue.len(), "user queued");
    Ok(updated)
}

/// Give up a spot in the waiting queue.
pub async fn leave_queue(
    state: &SharedState,
    id: Uuid,
    user_id: &str,
) -> Result<MatchEntity, ServiceError> {
    let store = state.require_match_store().await?;
    let retry_limit = state.config().mutation_retry_limit();

    let updated = mutate(store.as_ref(), id, retry_limit, |entity| {
        if !entity.has_queued(user_id) {
            return Err(ServiceError::NotQueued {
                match_id: id,
                user_id: user_id.to_owned(),
            });
        }

        Ok(MatchPatch::new()
            .expect(Precondition::Queued(user_id.to_owned()))
            .then(PatchOp::RemoveQueue(vec![user_id.to_owned()])))
    })
    .await?;

    info!(match_id = %id, user_id, "user left queue");
    Ok(updated)
}

fn ensure_not_listed(entity: &MatchEntity, user_id: &str) -> Result<(), ServiceError> {
    if entity.has_queued(user_id) {
        return Err(ServiceError::AlreadyQueued {
            match_id: entity.id,
            user_id: user_id.to_owned(),
        });
    }
    if entity.has_member(user_id) {
        return Err(ServiceError::AlreadyMember {
            match_id: entity.id,
            user_id: user_id.to_owned(),
        });
    }
    Ok(())
}

fn queue_patch(user_id: &str) -> MatchPatch {
    MatchPatch::new()
        .expect(Precondition::NotInRoster(user_id.to_owned()))
        .expect(Precondition::NotQueued(user_id.to_owned()))
        .then(PatchOp::AppendQueue(vec![QueueEntryEntity {
            user_id: user_id.to_owned(),
            joined_at: SystemTime::now(),
        }]))
}

/// Queue spot taken by a join on a full match. Unlike a plain queue join it
/// still requires the match to be scheduled when written.
fn overflow_patch(user_id: &str) -> MatchPatch {
    queue_patch(user_id).expect(Precondition::StatusIs(MatchStatus::Scheduled))
}

/// Read, let `decide` check preconditions and build a patch, apply it.
///
/// Precondition errors from `decide` are returned before anything is written.
async fn mutate<F>(
    store: &dyn MatchStore,
    id: Uuid,
    retry_limit: u32,
    mut decide: F,
) -> Result<MatchEntity, ServiceError>
where
    F: FnMut(&MatchEntity) -> Result<MatchPatch, ServiceError>,
{
    for attempt in 0..=retry_limit {
        let entity = fetch_match(store, id).await?;
        let patch = decide(&entity)?;

        match store.patch_match(id, patch).await? {
            PatchOutcome::Applied(updated) => return Ok(updated),
            PatchOutcome::PreconditionFailed => {
                debug!(match_id = %id, attempt, "match changed before the write; re-reading")
            }
            PatchOutcome::NotFound => return Err(ServiceError::NotFound(id)),
        }
    }

    warn!(match_id = %id, retry_limit, "giving up after repeated write conflicts");
    Err(ServiceError::Contention(id))
}
