use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;
use sqlx::PgPool;
use tracing::error;

use crate::citamed::GIT_COMMIT_HASH;

/// Liveness plus a database round-trip.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are reachable"),
        (status = 500, description = "Database is unreachable"),
    ),
    tag = "health"
)]
pub async fn health(pool: Extension<PgPool>) -> impl IntoResponse {
    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    match sqlx::query("SELECT 1").execute(&*pool).await {
        Ok(_) => (
            StatusCode::OK,
            headers,
            Json(json!({ "status": "ok", "db": true })),
        ),
        Err(e) => {
            error!("health check database error: {e}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
                Json(json!({ "status": "db_error" })),
            )
        }
    }
}
