// ThesisTrack API - Local Development Server

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use thesistrack_common::Config;
use thesistrack_store::{DocumentStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .pretty()
        .init();

    info!("Starting ThesisTrack API local development server");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPool::connect(database_url).await.map_err(|e| {
                error!("Failed to connect to database: {}", e);
                anyhow::anyhow!("Database connection failed: {}", e)
            })?;
            let store = PgStore::new(pool);
            store.ensure_schema().await?;
            info!("Postgres document store ready");
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set; using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    };

    let app = thesistrack_app::create_app(store).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .into_inner(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server starting on http://{}", addr);
    info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
