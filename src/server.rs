//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, outbound clients, scheduler restore, and the
//! Axum server lifecycle.

use crate::application::services::{
    LinkService, RecheckScheduler, RedirectResolver, UrlValidator,
};
use crate::config::{Config, StorageBackend};
use crate::domain::vetting::{LivenessProbe, SafetyChecker};
use crate::infrastructure::persistence::Stores;
use crate::infrastructure::{HttpLivenessProbe, SafeBrowsingClient};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Opens the PostgreSQL pool, retrying while the database comes up.
///
/// # Errors
///
/// Returns the last connection error once all attempts are used.
pub async fn connect_pool(config: &Config, database_url: &str) -> Result<PgPool> {
    let strategy = ExponentialBackoff::from_millis(200)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(5);

    let pool = Retry::spawn(strategy, || async move {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime))
            .connect(database_url)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Database connection attempt failed"))
    })
    .await
    .context("Failed to connect to database")?;

    Ok(pool)
}

/// Builds the configured storage backend, applying migrations for PostgreSQL.
///
/// # Errors
///
/// Returns an error if the database is unreachable or migrations fail.
pub async fn open_stores(config: &Config) -> Result<Stores> {
    match (config.storage_backend, config.database_url.as_deref()) {
        (StorageBackend::Postgres, Some(database_url)) => {
            let pool = connect_pool(config, database_url).await?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to apply migrations")?;

            Ok(Stores::postgres(Arc::new(pool)))
        }
        (StorageBackend::Postgres, None) => {
            anyhow::bail!("DATABASE_URL is required for the postgres storage backend")
        }
        (StorageBackend::Memory, _) => {
            tracing::warn!("Using in-memory storage; links are lost on restart");
            Ok(Stores::in_memory())
        }
    }
}

/// Builds the Safe Browsing client and liveness probe from configuration.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be constructed.
pub fn outbound_clients(
    config: &Config,
) -> Result<(Arc<dyn SafetyChecker>, Arc<dyn LivenessProbe>)> {
    let safety = SafeBrowsingClient::new(
        config.safe_browsing_api_key.clone(),
        config.safe_browsing_endpoint.clone(),
        config.safe_browsing_client_id.clone(),
        Duration::from_secs(config.safety_check_timeout_secs),
    )
    .context("Failed to build Safe Browsing client")?;

    let probe = HttpLivenessProbe::new(Duration::from_secs(config.liveness_timeout_secs))
        .context("Failed to build liveness probe client")?;

    Ok((Arc::new(safety), Arc::new(probe)))
}

/// Wires services and state over the given stores and collaborators.
pub fn build_state(
    config: &Config,
    stores: Stores,
    safety: Arc<dyn SafetyChecker>,
    probe: Arc<dyn LivenessProbe>,
) -> AppState {
    let scheduler = RecheckScheduler::new(stores.mappings.clone(), stores.checks, probe.clone());
    let validator = UrlValidator::new(safety.clone(), probe, stores.malicious_logs);
    let link_service = LinkService::new(stores.mappings.clone(), validator, scheduler.clone());
    let resolver = RedirectResolver::new(stores.mappings.clone());

    AppState {
        link_service: Arc::new(link_service),
        resolver: Arc::new(resolver),
        scheduler,
        mappings: stores.mappings,
        safety,
        base_url: config.base_url.clone(),
        behind_proxy: config.behind_proxy,
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend (PostgreSQL with migrations, or in-memory)
/// - Safe Browsing client and liveness probe
/// - Persisted re-checks, re-armed before serving
/// - Axum HTTP server with graceful shutdown on Ctrl-C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let stores = open_stores(&config).await?;
    let (safety, probe) = outbound_clients(&config)?;

    let state = build_state(&config, stores, safety, probe);
    state
        .scheduler
        .restore()
        .await
        .context("Failed to restore scheduled re-checks")?;

    let app = app_router(state, &config.rate_limit())?;

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
