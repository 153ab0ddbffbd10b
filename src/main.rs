//! matchday-back binary entrypoint wiring the REST layer to the configured match store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "couch-store")]
use matchday_back::dao::match_store::couchdb::{CouchConfig, CouchMatchStore};
#[cfg(feature = "mongo-store")]
use matchday_back::dao::match_store::mongodb::{MongoConfig, MongoMatchStore};
use matchday_back::{
    config::AppConfig,
    dao::{
        match_store::{MatchStore, MemoryMatchStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

/// Storage backend selected through `STORAGE_BACKEND`.
#[derive(Debug, Clone, Copy)]
enum Backend {
    #[cfg(feature = "mongo-store")]
    Mongo,
    #[cfg(feature = "couch-store")]
    Couch,
    Memory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    let backend = storage_backend()?;
    info!(?backend, "selected match store backend");
    start_storage(app_state.clone(), backend).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

fn storage_backend() -> anyhow::Result<Backend> {
    let requested = env::var("STORAGE_BACKEND").unwrap_or_else(|_| default_backend().into());
    let backend = match requested.trim().to_ascii_lowercase().as_str() {
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => Backend::Mongo,
        #[cfg(feature = "couch-store")]
        "couch" | "couchdb" => Backend::Couch,
        "memory" => Backend::Memory,
        other => bail!("unsupported STORAGE_BACKEND `{other}`"),
    };
    Ok(backend)
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    }
}

/// Install the in-process store directly, or hand database backends to the supervisor.
async fn start_storage(state: SharedState, backend: Backend) {
    match backend {
        #[cfg(feature = "mongo-store")]
        Backend::Mongo => {
            tokio::spawn(storage_supervisor::run(state, connect_mongo));
        }
        #[cfg(feature = "couch-store")]
        Backend::Couch => {
            tokio::spawn(storage_supervisor::run(state, connect_couch));
        }
        Backend::Memory => {
            warn!("using the in-process match store; data is lost on restart");
            state
                .install_match_store(Arc::new(MemoryMatchStore::new()))
                .await;
        }
    }
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo() -> Result<Arc<dyn MatchStore>, StorageError> {
    let config = MongoConfig::from_env().await?;
    let store = MongoMatchStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "couch-store")]
async fn connect_couch() -> Result<Arc<dyn MatchStore>, StorageError> {
    let config = CouchConfig::from_env()?;
    let store = CouchMatchStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
