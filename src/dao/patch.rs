//! Declarative, guarded mutations applied by a [`MatchStore`](super::match_store::MatchStore)
//! as one atomic unit.
//!
//! Callers never write back an in-memory copy of a match. They describe the
//! mutation as a list of field operations plus the facts that must still hold
//! on the stored document, and the backend applies all of it or nothing.

use std::time::SystemTime;

use crate::dao::models::{MatchEntity, MatchStatus, Position, QueueEntryEntity, RosterEntryEntity};

/// Fact about the stored match that must hold for a patch to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Match is currently in the given status.
    StatusIs(MatchStatus),
    /// User holds a roster spot.
    InRoster(String),
    /// User does not hold a roster spot.
    NotInRoster(String),
    /// User is waiting in the queue.
    Queued(String),
    /// User is not waiting in the queue.
    NotQueued(String),
    /// Cached slot counter equals the value.
    FilledSlotsEq(u32),
    /// Cached slot counter is strictly below the value.
    FilledSlotsBelow(u32),
    /// Roster holds exactly this many entries.
    RosterLen(usize),
}

impl Precondition {
    /// Evaluate the precondition against a match.
    pub fn holds(&self, entity: &MatchEntity) -> bool {
        match self {
            Precondition::StatusIs(status) => entity.status == *status,
            Precondition::InRoster(user_id) => entity.has_member(user_id),
            Precondition::NotInRoster(user_id) => !entity.has_member(user_id),
            Precondition::Queued(user_id) => entity.has_queued(user_id),
            Precondition::NotQueued(user_id) => !entity.has_queued(user_id),
            Precondition::FilledSlotsEq(value) => entity.filled_slots == *value,
            Precondition::FilledSlotsBelow(value) => entity.filled_slots < *value,
            Precondition::RosterLen(len) => entity.roster.len() == *len,
        }
    }
}

/// Single field operation of a [`MatchPatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    /// Overwrite the lifecycle status.
    SetStatus(MatchStatus),
    /// Overwrite the cached slot counter.
    SetFilledSlots(u32),
    /// Add a (possibly negative) delta to the cached slot counter.
    IncrementFilledSlots(i64),
    /// Append entries to the roster.
    AppendRoster(Vec<RosterEntryEntity>),
    /// Remove roster entries by user id.
    RemoveRoster(Vec<String>),
    /// Append entries to the queue.
    AppendQueue(Vec<QueueEntryEntity>),
    /// Remove queue entries by user id.
    RemoveQueue(Vec<String>),
    /// Update payment status and/or position of one roster entry.
    UpdateRosterEntry {
        /// Roster member to update.
        user_id: String,
        /// New payment status, untouched when `None`.
        has_paid: Option<bool>,
        /// New position, untouched when `None`.
        position: Option<Position>,
    },
}

impl PatchOp {
    /// Apply the operation to an in-memory match.
    pub fn apply(&self, entity: &mut MatchEntity) {
        match self {
            PatchOp::SetStatus(status) => entity.status = *status,
            PatchOp::SetFilledSlots(value) => entity.filled_slots = *value,
            PatchOp::IncrementFilledSlots(delta) => {
                let next = i64::from(entity.filled_slots).saturating_add(*delta);
                entity.filled_slots = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
            }
            PatchOp::AppendRoster(entries) => entity.roster.extend(entries.iter().cloned()),
            PatchOp::RemoveRoster(user_ids) => entity
                .roster
                .retain(|entry| !user_ids.contains(&entry.user_id)),
            PatchOp::AppendQueue(entries) => entity.queue.extend(entries.iter().cloned()),
            PatchOp::RemoveQueue(user_ids) => entity
                .queue
                .retain(|entry| !user_ids.contains(&entry.user_id)),
            PatchOp::UpdateRosterEntry {
                user_id,
                has_paid,
                position,
            } => {
                for entry in entity
                    .roster
                    .iter_mut()
                    .filter(|entry| &entry.user_id == user_id)
                {
                    if let Some(has_paid) = has_paid {
                        entry.has_paid = *has_paid;
                    }
                    if let Some(position) = position {
                        entry.position = *position;
                    }
                }
            }
        }
    }
}

/// Guarded list of operations applied atomically by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPatch {
    /// Facts checked against the stored document at apply time.
    pub preconditions: Vec<Precondition>,
    /// Operations applied in order when every precondition holds.
    pub ops: Vec<PatchOp>,
}

impl MatchPatch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a precondition.
    pub fn expect(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Add an operation.
    pub fn then(mut self, op: PatchOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Whether every precondition holds on `entity`.
    pub fn holds(&self, entity: &MatchEntity) -> bool {
        self.preconditions
            .iter()
            .all(|precondition| precondition.holds(entity))
    }

    /// Apply every operation and stamp `updated_at`. Preconditions are not checked here.
    pub fn apply_to(&self, entity: &mut MatchEntity, now: SystemTime) {
        for op in &self.ops {
            op.apply(entity);
        }
        entity.updated_at = now;
    }
}

/// Result of [`MatchStore::patch_match`](super::match_store::MatchStore::patch_match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Patch applied; carries the document as stored afterwards.
    Applied(MatchEntity),
    /// Document exists but a precondition did not hold; nothing changed.
    PreconditionFailed,
    /// No match with that id.
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::Visibility;
    use std::time::Duration;

    fn sample() -> MatchEntity {
        MatchEntity::new(
            "Tuesday five-a-side".into(),
            "creator".into(),
            5,
            Visibility::Public,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_000),
            None,
        )
    }

    #[test]
    fn preconditions_evaluate_membership_and_counters() {
        let mut entity = sample();
        entity.queue.push(QueueEntryEntity {
            user_id: "waiting".into(),
            joined_at: SystemTime::UNIX_EPOCH,
        });

        assert!(Precondition::InRoster("creator".into()).holds(&entity));
        assert!(Precondition::NotInRoster("waiting".into()).holds(&entity));
        assert!(Precondition::Queued("waiting".into()).holds(&entity));
        assert!(!Precondition::NotQueued("waiting".into()).holds(&entity));
        assert!(Precondition::FilledSlotsEq(1).holds(&entity));
        assert!(Precondition::FilledSlotsBelow(5).holds(&entity));
        assert!(!Precondition::FilledSlotsBelow(1).holds(&entity));
        assert!(Precondition::RosterLen(1).holds(&entity));
        assert!(Precondition::StatusIs(MatchStatus::Scheduled).holds(&entity));
    }

    #[test]
    fn promotion_patch_moves_entries_and_bumps_counter() {
        let mut entity = sample();
        entity.queue.push(QueueEntryEntity {
            user_id: "a".into(),
            joined_at: SystemTime::UNIX_EPOCH,
        });

        let patch = MatchPatch::new()
            .expect(Precondition::Queued("a".into()))
            .then(PatchOp::AppendRoster(vec![RosterEntryEntity::confirmed("a")]))
            .then(PatchOp::RemoveQueue(vec!["a".into()]))
            .then(PatchOp::IncrementFilledSlots(1));

        assert!(patch.holds(&entity));
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        patch.apply_to(&mut entity, now);

        assert_eq!(entity.filled_slots, 2);
        assert!(entity.has_member("a"));
        assert!(entity.queue.is_empty());
        assert_eq!(entity.updated_at, now);
    }

    #[test]
    fn decrement_never_underflows() {
        let mut entity = sample();
        entity.filled_slots = 0;
        PatchOp::IncrementFilledSlots(-1).apply(&mut entity);
        assert_eq!(entity.filled_slots, 0);
    }

    #[test]
    fn update_roster_entry_only_touches_given_fields() {
        let mut entity = sample();
        PatchOp::UpdateRosterEntry {
            user_id: "creator".into(),
            has_paid: Some(true),
            position: None,
        }
        .apply(&mut entity);

        let entry = &entity.roster[0];
        assert!(entry.has_paid);
        assert_eq!(entry.position, Position::Unassigned);
    }
}
