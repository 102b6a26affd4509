/// Health and database diagnostic endpoints
///
/// # Endpoints
///
/// ```text
/// GET /health     # liveness + database connectivity
/// GET /db-test    # pool statistics and migration status
/// ```
///
/// Both stay at 200 even when the database is unreachable; the body says
/// "degraded" so load balancers keep routing while operators investigate.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use worktrack_shared::db::{migrations, pool};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,
}

/// Health check handler
///
/// # Example
///
/// ```text
/// GET /health
/// ```
///
/// Response:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    // Check database connectivity
    let database_status = match pool::health_check(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Ok(Json(HealthResponse {
        status: if database_status == "connected" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database_status.to_string(),
    }))
}

/// Database diagnostic response
#[derive(Debug, Serialize)]
pub struct DbTestResponse {
    pub status: String,

    /// Connections currently handed out
    pub active_connections: usize,

    /// Idle connections waiting in the pool
    pub idle_connections: usize,

    /// Applied migration count, if the migrations table exists
    pub applied_migrations: Option<usize>,

    /// Version of the newest applied migration
    pub latest_migration: Option<i64>,
}

/// Database diagnostic handler
///
/// Reports pool statistics and migration status. Used by deploy tooling to
/// confirm the schema is current.
pub async fn db_test(State(state): State<AppState>) -> ApiResult<Json<DbTestResponse>> {
    let stats = pool::get_pool_stats(&state.db);

    let (status, applied, latest) =
        match migrations::get_migration_status(&state.db).await {
            Ok(migration_status) => (
                "ok".to_string(),
                Some(migration_status.applied_migrations),
                migration_status.latest_version,
            ),
            Err(_) => ("degraded".to_string(), None, None),
        };

    Ok(Json(DbTestResponse {
        status,
        active_connections: stats.active_connections,
        idle_connections: stats.idle_connections,
        applied_migrations: applied,
        latest_migration: latest,
    }))
}
