//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::{SharedIdentityService, SharedRecordStore};
use provisioning::{HostedIdentityService, InMemoryIdentityService};
use record_store::{InMemoryRecordStore, PostgresRecordStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn open_record_store(config: &Config) -> Result<SharedRecordStore, BoxError> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using in-memory record store");
        return Ok(Arc::new(InMemoryRecordStore::new()));
    };

    let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
    let store = PostgresRecordStore::new(pool);
    if config.run_migrations {
        store.run_migrations().await?;
        tracing::info!("database migrations applied");
    }
    Ok(Arc::new(store))
}

fn open_identity_service(config: &Config) -> Result<SharedIdentityService, BoxError> {
    match config.hosted_identity()? {
        Some(hosted) => {
            tracing::info!(base_url = %hosted.base_url, "using hosted identity service");
            Ok(Arc::new(HostedIdentityService::new(hosted)?))
        }
        None => {
            tracing::warn!("AUTH_URL not set, using in-memory identity service");
            Ok(Arc::new(InMemoryIdentityService::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();
    config.validate()?;

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Connect collaborators and build application state
    let records = open_record_store(&config).await?;
    let identities = open_identity_service(&config)?;
    let state = api::create_state(records, identities, &config.derived_email_domain);

    // 4. Build the application
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}
