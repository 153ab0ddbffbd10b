use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{MatchEntity, MatchStatus, RosterEntryEntity},
        patch::{MatchPatch, PatchOp, PatchOutcome, Precondition},
    },
    error::ServiceError,
    services::{consistency::verify_filled_slots, match_service::fetch_match},
    state::SharedState,
};

/// Counts reported by one queue processor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueProcessResult {
    /// Users moved from the queue into the roster.
    pub promoted: usize,
    /// Users still waiting afterwards.
    pub remaining: usize,
}

/// Promote the oldest queued users into the free slots of match `id`.
///
/// Runs under the match's lock, so two processors on the same match never
/// choose candidates from the same snapshot.
pub async fn process_queue(
    state: &SharedState,
    id: Uuid,
) -> Result<(QueueProcessResult, MatchEntity), ServiceError> {
    let store = state.require_match_store().await?;
    let _guard = state.locks().acquire(id).await;
    let entity = fetch_match(store.as_ref(), id).await?;
    promote_locked(store.as_ref(), entity, state.config().mutation_retry_limit()).await
}

/// Promotion body. The caller must hold the match lock.
///
/// The slot counter is repaired first, then the chosen users are moved in one
/// guarded patch. A guard failure means a join or leave slipped in; the match
/// is re-read and the choice recomputed.
pub(crate) async fn promote_locked(
    store: &dyn MatchStore,
    mut entity: MatchEntity,
    retry_limit: u32,
) -> Result<(QueueProcessResult, MatchEntity), ServiceError> {
    let id = entity.id;

    for _ in 0..=retry_limit {
        let (current, _) = verify_filled_slots(store, entity, retry_limit).await?;

        if current.status != MatchStatus::Scheduled {
            let remaining = current.queue.len();
            debug!(
                match_id = %id,
                status = current.status.as_str(),
                remaining,
                "match not scheduled; queue left as is"
            );
            return Ok((QueueProcessResult { promoted: 0, remaining }, current));
        }

        let available = current.available_slots() as usize;
        if available == 0 || current.queue.is_empty() {
            let remaining = current.queue.len();
            debug!(match_id = %id, available, remaining, "nothing to promote");
            return Ok((QueueProcessResult { promoted: 0, remaining }, current));
        }

        let Some(patch) = promotion_patch(&current, available) else {
            return Ok((
                QueueProcessResult {
                    promoted: 0,
                    remaining: current.queue.len(),
                },
                current,
            ));
        };
        let promoted = patch.promoted;

        match store.patch_match(id, patch.patch).await? {
            PatchOutcome::Applied(updated) => {
                let remaining = updated.queue.len();
                info!(match_id = %id, promoted, remaining, "promoted queued users");
                return Ok((QueueProcessResult { promoted, remaining }, updated));
            }
            PatchOutcome::PreconditionFailed => {
                debug!(match_id = %id, "match changed during promotion; re-reading");
                entity = fetch_match(store, id).await?;
            }
            PatchOutcome::NotFound => return Err(ServiceError::NotFound(id)),
        }
    }

    Err(ServiceError::Contention(id))
}

struct PromotionPatch {
    patch: MatchPatch,
    promoted: usize,
}

/// Build the move for the oldest `available` waiting users of `entity`.
///
/// Queue entries whose user already holds a roster spot are dropped in the same
/// patch and never count as promotions.
fn promotion_patch(entity: &MatchEntity, available: usize) -> Option<PromotionPatch> {
    let mut ordered = entity.queue.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|entry| entry.joined_at);

    let (stale, waiting): (Vec<_>, Vec<_>) = ordered
        .into_iter()
        .partition(|entry| entity.has_member(&entry.user_id));

    let chosen = waiting
        .into_iter()
        .take(available)
        .map(|entry| entry.user_id.clone())
        .collect::<Vec<_>>();

    if !stale.is_empty() {
        warn!(
            match_id = %entity.id,
            stale = stale.len(),
            "dropping queue entries of users already on the roster"
        );
    }
    if chosen.is_empty() && stale.is_empty() {
        return None;
    }

    let mut patch = MatchPatch::new()
        .expect(Precondition::StatusIs(MatchStatus::Scheduled))
        .expect(Precondition::FilledSlotsEq(entity.filled_slots));
    for user_id in &chosen {
        patch = patch
            .expect(Precondition::Queued(user_id.clone()))
            .expect(Precondition::NotInRoster(user_id.clone()));
    }

    let removed = chosen
        .iter()
        .cloned()
        .chain(stale.iter().map(|entry| entry.user_id.clone()))
        .collect::<Vec<_>>();
    let promoted = chosen.len();

    if promoted > 0 {
        patch = patch
            .then(PatchOp::AppendRoster(
                chosen.into_iter().map(RosterEntryEntity::confirmed).collect(),
            ))
            .then(PatchOp::IncrementFilledSlots(promoted as i64));
    }
    patch = patch.then(PatchOp::RemoveQueue(removed));

    Some(PromotionPatch { patch, promoted })
}
