use std::time::SystemTime;

use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::{
    models::{
        MatchEntity, MatchQuery, MatchSort, MatchStatus, Position, QueueEntryEntity,
        RosterEntryEntity, Visibility,
    },
    patch::{PatchOp, Precondition},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    creator_id: String,
    total_slots: i64,
    filled_slots: i64,
    #[serde(default)]
    roster: Vec<MongoRosterEntry>,
    #[serde(default)]
    queue: Vec<MongoQueueEntry>,
    status: MatchStatus,
    #[serde(default)]
    visibility: Visibility,
    start_time: DateTime,
    #[serde(default)]
    duration_minutes: Option<i64>,
    created_at: DateTime,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRosterEntry {
    user_id: String,
    confirmed: bool,
    has_paid: bool,
    #[serde(default)]
    position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQueueEntry {
    user_id: String,
    joined_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            creator_id: value.creator_id,
            total_slots: i64::from(value.total_slots),
            filled_slots: i64::from(value.filled_slots),
            roster: value
                .roster
                .into_iter()
                .map(|entry| MongoRosterEntry {
                    user_id: entry.user_id,
                    confirmed: entry.confirmed,
                    has_paid: entry.has_paid,
                    position: entry.position,
                })
                .collect(),
            queue: value
                .queue
                .into_iter()
                .map(|entry| MongoQueueEntry {
                    user_id: entry.user_id,
                    joined_at: DateTime::from_system_time(entry.joined_at),
                })
                .collect(),
            status: value.status,
            visibility: value.visibility,
            start_time: DateTime::from_system_time(value.start_time),
            duration_minutes: value.duration_minutes.map(i64::from),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoMatchDocument> for MatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMatchDocument) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id).map_err(|_| MongoDaoError::MalformedDocument {
            id: value.id.clone(),
            reason: "`_id` is not a UUID",
        })?;
        let counter = |raw: i64, reason: &'static str| {
            u32::try_from(raw).map_err(|_| MongoDaoError::MalformedDocument {
                id: value.id.clone(),
                reason,
            })
        };
        let total_slots = counter(value.total_slots, "`total_slots` out of range")?;
        // Drift repair expects to see a negative counter as zero rather than fail the load.
        let filled_slots = counter(value.filled_slots.max(0), "`filled_slots` out of range")?;
        let duration_minutes = value
            .duration_minutes
            .map(|minutes| counter(minutes, "`duration_minutes` out of range"))
            .transpose()?;

        Ok(Self {
            id,
            title: value.title,
            creator_id: value.creator_id,
            total_slots,
            filled_slots,
            roster: value
                .roster
                .into_iter()
                .map(|entry| RosterEntryEntity {
                    user_id: entry.user_id,
                    confirmed: entry.confirmed,
                    has_paid: entry.has_paid,
                    position: entry.position,
                })
                .collect(),
            queue: value
                .queue
                .into_iter()
                .map(|entry| QueueEntryEntity {
                    user_id: entry.user_id,
                    joined_at: entry.joined_at.to_system_time(),
                })
                .collect(),
            status: value.status,
            visibility: value.visibility,
            start_time: value.start_time.to_system_time(),
            duration_minutes,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching the document only while every precondition holds.
pub fn patch_filter(id: Uuid, preconditions: &[Precondition]) -> Document {
    let mut filter = doc_id(id);
    let clauses = preconditions
        .iter()
        .map(|precondition| Bson::Document(precondition_clause(precondition)))
        .collect::<Vec<_>>();
    if !clauses.is_empty() {
        filter.insert("$and", clauses);
    }
    filter
}

fn precondition_clause(precondition: &Precondition) -> Document {
    match precondition {
        Precondition::StatusIs(status) => doc! {"status": status.as_str()},
        Precondition::InRoster(user_id) => doc! {"roster.user_id": user_id.as_str()},
        Precondition::NotInRoster(user_id) => {
            doc! {"roster.user_id": {"$ne": user_id.as_str()}}
        }
        Precondition::Queued(user_id) => doc! {"queue.user_id": user_id.as_str()},
        Precondition::NotQueued(user_id) => doc! {"queue.user_id": {"$ne": user_id.as_str()}},
        Precondition::FilledSlotsEq(value) => doc! {"filled_slots": i64::from(*value)},
        Precondition::FilledSlotsBelow(value) => {
            doc! {"filled_slots": {"$lt": i64::from(*value)}}
        }
        Precondition::RosterLen(len) => doc! {"roster": {"$size": *len as i64}},
    }
}

/// Update document and array filters equivalent to a list of patch operations.
pub struct MongoUpdate {
    pub update: Document,
    pub array_filters: Vec<Document>,
}

pub fn patch_update(ops: &[PatchOp], now: SystemTime) -> MongoUpdate {
    let mut set = doc! {"updated_at": DateTime::from_system_time(now)};
    let mut increment: i64 = 0;
    let mut has_increment = false;
    let mut push_roster = Vec::new();
    let mut push_queue = Vec::new();
    let mut pull_roster = Vec::new();
    let mut pull_queue = Vec::new();
    let mut array_filters = Vec::new();

    for (index, op) in ops.iter().enumerate() {
        match op {
            PatchOp::SetStatus(status) => {
                set.insert("status", status.as_str());
            }
            PatchOp::SetFilledSlots(value) => {
                set.insert("filled_slots", i64::from(*value));
            }
            PatchOp::IncrementFilledSlots(delta) => {
                increment += delta;
                has_increment = true;
            }
            PatchOp::AppendRoster(entries) => {
                push_roster.extend(entries.iter().map(|entry| Bson::Document(roster_entry(entry))));
            }
            PatchOp::RemoveRoster(user_ids) => {
                pull_roster.extend(user_ids.iter().cloned().map(Bson::String));
            }
            PatchOp::AppendQueue(entries) => {
                push_queue.extend(entries.iter().map(|entry| Bson::Document(queue_entry(entry))));
            }
            PatchOp::RemoveQueue(user_ids) => {
                pull_queue.extend(user_ids.iter().cloned().map(Bson::String));
            }
            PatchOp::UpdateRosterEntry {
                user_id,
                has_paid,
                position,
            } => {
                if has_paid.is_none() && position.is_none() {
                    continue;
                }
                let identifier = format!("entry{index}");
                if let Some(has_paid) = has_paid {
                    set.insert(format!("roster.$[{identifier}].has_paid"), *has_paid);
                }
                if let Some(position) = position {
                    set.insert(
                        format!("roster.$[{identifier}].position"),
                        position.as_str(),
                    );
                }
                let mut filter = Document::new();
                filter.insert(format!("{identifier}.user_id"), user_id.as_str());
                array_filters.push(filter);
            }
        }
    }

    let mut update = doc! {"$set": set};
    if has_increment {
        update.insert("$inc", doc! {"filled_slots": increment});
    }

    let mut push = Document::new();
    if !push_roster.is_empty() {
        push.insert("roster", doc! {"$each": push_roster});
    }
    if !push_queue.is_empty() {
        push.insert("queue", doc! {"$each": push_queue});
    }
    if !push.is_empty() {
        update.insert("$push", push);
    }

    let mut pull = Document::new();
    if !pull_roster.is_empty() {
        pull.insert("roster", doc! {"user_id": {"$in": pull_roster}});
    }
    if !pull_queue.is_empty() {
        pull.insert("queue", doc! {"user_id": {"$in": pull_queue}});
    }
    if !pull.is_empty() {
        update.insert("$pull", pull);
    }

    MongoUpdate {
        update,
        array_filters,
    }
}

pub fn query_filter(query: &MatchQuery) -> Document {
    match &query.statuses {
        Some(statuses) => {
            let values = statuses
                .iter()
                .map(|status| Bson::String(status.as_str().to_owned()))
                .collect::<Vec<_>>();
            doc! {"status": {"$in": values}}
        }
        None => Document::new(),
    }
}

pub fn query_sort(query: &MatchQuery) -> Document {
    match query.sort {
        MatchSort::StartTimeAsc => doc! {"start_time": 1},
        MatchSort::StartTimeDesc => doc! {"start_time": -1},
    }
}

fn roster_entry(entry: &RosterEntryEntity) -> Document {
    doc! {
        "user_id": entry.user_id.as_str(),
        "confirmed": entry.confirmed,
        "has_paid": entry.has_paid,
        "position": entry.position.as_str(),
    }
}

fn queue_entry(entry: &QueueEntryEntity) -> Document {
    doc! {
        "user_id": entry.user_id.as_str(),
        "joined_at": DateTime::from_system_time(entry.joined_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_update_combines_push_pull_and_increment() {
        let ops = vec![
            PatchOp::AppendRoster(vec![RosterEntryEntity::confirmed("a")]),
            PatchOp::RemoveQueue(vec!["a".into()]),
            PatchOp::IncrementFilledSlots(1),
        ];
        let MongoUpdate {
            update,
            array_filters,
        } = patch_update(&ops, SystemTime::UNIX_EPOCH);

        assert!(array_filters.is_empty());
        assert_eq!(
            update.get_document("$inc").unwrap(),
            &doc! {"filled_slots": 1_i64}
        );
        assert!(update.get_document("$push").unwrap().contains_key("roster"));
        assert_eq!(
            update.get_document("$pull").unwrap(),
            &doc! {"queue": {"user_id": {"$in": ["a"]}}}
        );
    }

    #[test]
    fn preconditions_become_an_and_clause() {
        let id = Uuid::new_v4();
        let filter = patch_filter(
            id,
            &[
                Precondition::StatusIs(MatchStatus::Scheduled),
                Precondition::FilledSlotsBelow(10),
            ],
        );

        assert_eq!(filter.get_str("_id").unwrap(), id.to_string());
        assert_eq!(filter.get_array("$and").unwrap().len(), 2);
    }

    #[test]
    fn roster_entry_update_uses_array_filter() {
        let ops = vec![PatchOp::UpdateRosterEntry {
            user_id: "u1".into(),
            has_paid: Some(true),
            position: None,
        }];
        let MongoUpdate {
            update,
            array_filters,
        } = patch_update(&ops, SystemTime::UNIX_EPOCH);

        let set = update.get_document("$set").unwrap();
        assert!(set.get_bool("roster.$[entry0].has_paid").unwrap());
        assert_eq!(array_filters, vec![doc! {"entry0.user_id": "u1"}]);
    }
}
