use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the installed match store and report whether the service runs degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.match_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "match store health check failed");
                return HealthResponse::degraded();
            }
        }
        None => warn!("no match store installed (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::match_store::MemoryMatchStore, state::AppState};

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        assert_eq!(health_status(&state).await.status, "ok");
    }
}
