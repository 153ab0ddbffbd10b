use tracing::info;

use crate::{
    dao::{
        match_store::MatchStore,
        models::MatchEntity,
        patch::{MatchPatch, PatchOp, PatchOutcome, Precondition},
    },
    error::ServiceError,
    services::match_service::fetch_match,
};

/// Repair `filled_slots` when it disagrees with the roster length.
///
/// Returns the match as stored afterwards and whether a fix was written. The
/// repair is guarded by the roster length it was computed from, so a roster
/// change racing with it forces a fresh read instead of writing a stale count.
pub async fn verify_filled_slots(
    store: &dyn MatchStore,
    mut entity: MatchEntity,
    retry_limit: u32,
) -> Result<(MatchEntity, bool), ServiceError> {
    let id = entity.id;

    for _ in 0..=retry_limit {
        let actual = entity.roster.len();
        if entity.filled_slots as usize == actual {
            return Ok((entity, false));
        }

        let stale = entity.filled_slots;
        let patch = MatchPatch::new()
            .expect(Precondition::RosterLen(actual))
            .then(PatchOp::SetFilledSlots(actual as u32));

        match store.patch_match(id, patch).await? {
            PatchOutcome::Applied(fixed) => {
                info!(
                    match_id = %id,
                    stale_filled_slots = stale,
                    roster_len = actual,
                    "repaired drifted slot counter"
                );
                return Ok((fixed, true));
            }
            PatchOutcome::PreconditionFailed => entity = fetch_match(store, id).await?,
            PatchOutcome::NotFound => return Err(ServiceError::NotFound(id)),
        }
    }

    Err(ServiceError::Contention(id))
}
