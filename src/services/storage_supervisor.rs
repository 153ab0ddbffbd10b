use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::{match_store::MatchStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Connect the match store, then poll its health for as long as the process runs.
///
/// While the backend is unreachable the shared state stays degraded and routes
/// answer 503. A store that cannot be revived in place is dropped and the whole
/// connection is rebuilt with `connect`.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, retry_in_ms = delay.as_millis() as u64, "match store connection attempt failed");
                sleep(delay).await;
                delay = backoff(delay);
                continue;
            }
        };

        state.install_match_store(store.clone()).await;
        info!("match store connected; leaving degraded mode");
        delay = INITIAL_DELAY;

        if !watch_health(&state, store.as_ref()).await {
            warn!("exhausted match store reconnect attempts; rebuilding the connection");
            state.clear_match_store().await;
        }

        sleep(delay).await;
        delay = backoff(delay);
    }
}

/// Poll `store` until it fails and cannot be revived. Returns `false` at that point.
async fn watch_health(state: &SharedState, store: &dyn MatchStore) -> bool {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("match store healthy again; leaving degraded mode");
                    state.set_degraded(false);
                }
                debug!("match store health check passed");
            }
            Err(err) => {
                warn!(error = %err, "match store health check failed; entering degraded mode");
                state.set_degraded(true);
                if !revive(store).await {
                    return false;
                }
                state.set_degraded(false);
            }
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn revive(store: &dyn MatchStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "match store reconnection succeeded");
                return true;
            }
            Err(err) => {
                warn!(attempt, error = %err, "match store reconnect attempt failed");
                sleep(delay).await;
                delay = backoff(delay);
            }
        }
    }
    false
}
