//! In-process match store backed by a [`DashMap`].
//!
//! Patches run while holding the entry's shard write lock, which gives the
//! same all-or-nothing guarantee the database backends provide.

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::{BoxFuture, ready};
use uuid::Uuid;

use crate::dao::{
    match_store::MatchStore,
    models::{MatchEntity, MatchQuery},
    patch::{MatchPatch, PatchOutcome},
    storage::StorageResult,
};

#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<Uuid, MatchEntity>>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_patch(&self, id: Uuid, patch: &MatchPatch) -> PatchOutcome {
        let Some(mut entry) = self.matches.get_mut(&id) else {
            return PatchOutcome::NotFound;
        };

        if !patch.holds(&entry) {
            return PatchOutcome::PreconditionFailed;
        }

        patch.apply_to(&mut entry, SystemTime::now());
        PatchOutcome::Applied(entry.clone())
    }

    fn list(&self, query: &MatchQuery) -> Vec<MatchEntity> {
        let mut entities = self
            .matches
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        query.sort_entities(&mut entities);
        entities
    }
}

impl MatchStore for MemoryMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.matches.insert(entity.id, entity);
        Box::pin(ready(Ok(())))
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let found = self.matches.get(&id).map(|entry| entry.value().clone());
        Box::pin(ready(Ok(found)))
    }

    fn list_matches(
        &self,
        query: MatchQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let entities = self.list(&query);
        Box::pin(ready(Ok(entities)))
    }

    fn patch_match(
        &self,
        id: Uuid,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<PatchOutcome>> {
        let outcome = self.apply_patch(id, &patch);
        Box::pin(ready(Ok(outcome)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}
