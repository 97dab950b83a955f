pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod http;
pub mod identity;
pub mod models;
pub mod policy;
pub mod redaction;
pub mod seed;
pub mod session;

pub use crate::catalog::CatalogCore;
pub use crate::config::CatalogConfig;
pub use crate::db::Database;
pub use crate::errors::{AppError, AppResult};
pub use crate::http::{build_router, AppState};
pub use crate::identity::{FakeIdentityProvider, GoogleIdentityProvider, IdentityProvider};
pub use crate::policy::FieldPolicy;
pub use crate::session::SessionManager;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub async fn run() -> anyhow::Result<()> {
    let config = CatalogConfig::from_env()?;
    init_tracing(&config.log_dir).map_err(anyhow::Error::msg)?;

    let db = Database::new(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;
    let catalog = Arc::new(CatalogCore::new(
        Arc::new(db),
        FieldPolicy::new(config.item_name_policy),
        config.latest_items,
    ));

    if config.seed_demo {
        let seeded = seed::seed_demo_catalog(&catalog)?;
        tracing::info!(items = seeded, "demo seed finished");
    }

    if !config.google.is_configured() {
        tracing::warn!("Google client credentials are missing; sign-in is disabled");
    }
    let identity: Arc<dyn IdentityProvider> = Arc::new(GoogleIdentityProvider::new(config.google.clone())?);
    let sessions = SessionManager::new(config.session_ttl);
    let state = AppState::new(catalog, sessions, identity, &config.session_cookie);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        db = %state.catalog.database().path().display(),
        name_policy = state.catalog.policy().name_policy().as_str(),
        latest_items = state.catalog.latest_limit(),
        "catalog server listening"
    );
    axum::serve(listener, build_router(state))
        .await
        .context("server terminated")?;
    Ok(())
}

fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "catalog.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
