//! Fixtures shared by the service tests.

use std::{
    io,
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::future::{BoxFuture, FutureExt, ready};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        match_store::{MatchStore, MemoryMatchStore},
        models::{MatchEntity, MatchQuery, QueueEntryEntity, RosterEntryEntity, Visibility},
        patch::{MatchPatch, PatchOutcome},
        storage::{StorageError, StorageResult},
    },
    state::{AppState, SharedState},
};

pub const CREATOR: &str = "creator";

/// Shared state backed by a fresh in-memory store, plus a handle to that store.
pub async fn memory_state() -> (SharedState, MemoryMatchStore) {
    memory_state_with(AppConfig::default()).await
}

pub async fn memory_state_with(config: AppConfig) -> (SharedState, MemoryMatchStore) {
    let store = MemoryMatchStore::new();
    let state = AppState::new(config);
    state.install_match_store(Arc::new(store.clone())).await;
    (state, store)
}

/// Scheduled match starting in one day with `CREATOR` plus `members` on the roster.
pub fn scheduled_match(total_slots: u32, members: &[&str]) -> MatchEntity {
    let mut entity = MatchEntity::new(
        "Sunday league".into(),
        CREATOR.into(),
        total_slots,
        Visibility::Public,
        SystemTime::now() + Duration::from_secs(24 * 60 * 60),
        None,
    );
    entity
        .roster
        .extend(members.iter().map(|user| RosterEntryEntity::confirmed(*user)));
    entity.filled_slots = entity.roster.len() as u32;
    entity
}

/// Append queue entries whose `joined_at` follows the given offsets in seconds.
pub fn with_queue(mut entity: MatchEntity, queued: &[(&str, u64)]) -> MatchEntity {
    entity.queue.extend(queued.iter().map(|(user, secs)| QueueEntryEntity {
        user_id: (*user).into(),
        joined_at: SystemTime::UNIX_EPOCH + Duration::from_secs(*secs),
    }));
    entity
}

pub async fn insert(store: &MemoryMatchStore, entity: MatchEntity) -> Uuid {
    let id = entity.id;
    store.insert_match(entity).await.unwrap();
    id
}

pub async fn load(store: &MemoryMatchStore, id: Uuid) -> MatchEntity {
    store.find_match(id).await.unwrap().unwrap()
}

pub fn member_ids(entity: &MatchEntity) -> Vec<&str> {
    entity
        .roster
        .iter()
        .map(|entry| entry.user_id.as_str())
        .collect()
}

pub fn queued_ids(entity: &MatchEntity) -> Vec<&str> {
    entity
        .queue
        .iter()
        .map(|entry| entry.user_id.as_str())
        .collect()
}

/// Memory store that refuses every read and write touching one match.
pub struct FailingMatchStore {
    inner: MemoryMatchStore,
    broken: Uuid,
}

impl FailingMatchStore {
    pub fn new(inner: MemoryMatchStore, broken: Uuid) -> Self {
        Self { inner, broken }
    }

    fn refuse<T: Send + 'static>(&self) -> BoxFuture<'static, StorageResult<T>> {
        let err = StorageError::unavailable(
            format!("match `{}` is unreadable", self.broken),
            io::Error::other("injected failure"),
        );
        ready(Err(err)).boxed()
    }
}

impl MatchStore for FailingMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_match(entity)
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        if id == self.broken {
            return self.refuse();
        }
        self.inner.find_match(id)
    }

    fn list_matches(
        &self,
        query: MatchQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        self.inner.list_matches(query)
    }

    fn patch_match(
        &self,
        id: Uuid,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<PatchOutcome>> {
        if id == self.broken {
            return self.refuse();
        }
        self.inner.patch_match(id, patch)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
