use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Async mutexes keyed by match id, serializing read-decide-write sections
/// (queue promotion, batch status updates) on the same match.
#[derive(Default)]
pub struct MatchLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl MatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Access is released when the guard drops.
    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of tracked match ids.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no match id is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn second_holder_waits_for_the_first() {
        let locks = Arc::new(MatchLocks::new());
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_matches_do_not_block_each_other() {
        let locks = MatchLocks::new();
        let _first = locks.acquire(Uuid::new_v4()).await;
        let _second = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn prune_keeps_only_held_locks() {
        let locks = MatchLocks::new();
        let held = Uuid::new_v4();
        let _guard = locks.acquire(held).await;
        drop(locks.acquire(Uuid::new_v4()).await);

        locks.prune();

        assert_eq!(locks.len(), 1);
        assert!(locks.locks.contains_key(&held));
    }
}
