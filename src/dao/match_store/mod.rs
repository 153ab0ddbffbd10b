#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{MatchEntity, MatchQuery};
use crate::dao::patch::{MatchPatch, PatchOutcome};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::MemoryMatchStore;

/// Abstraction over the document database holding match aggregates.
///
/// Every mutation goes through [`MatchStore::patch_match`], which must apply
/// the whole patch atomically and only when all of its preconditions hold on
/// the stored document.
pub trait MatchStore: Send + Sync {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    fn list_matches(&self, query: MatchQuery)
    -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn patch_match(
        &self,
        id: Uuid,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<PatchOutcome>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
