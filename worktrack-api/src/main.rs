//! # WorkTrack API Server
//!
//! This is the main API server for WorkTrack, a multi-tenant activity and
//! task tracker with an approval workflow.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Authentication (JWT over bcrypt-hashed credentials)
//! - Organization, user, activity, task and project endpoints
//! - The approval workflow (draft → submitted → approved/rejected → closed)
//! - An organization-scoped status registry with workflow rules
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p worktrack-api
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worktrack_api::{app, config::Config};
use worktrack_shared::db::{migrations, pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!(
        "WorkTrack API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    // Database failures at startup are fatal; there is nothing to serve
    // without one.
    let pool = match pool::create_pool(config.pool_config()).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Database initialization failed");
            std::process::exit(1);
        }
    };

    migrations::run_migrations(&pool).await?;

    let state = app::AppState::new(pool.clone(), config.clone());
    let router = app::build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Initializes tracing from `RUST_LOG`, with JSON output in production.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "worktrack_api=debug,tower_http=debug".into());

    let production = std::env::var("APP_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false);

    if production {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Resolves when the process receives SIGTERM or SIGINT, letting the
/// server drain in-flight requests before the pool closes.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received, draining requests...");
}
