/// Liveness probe
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "database": "connected" }
/// ```
///
/// Answers 503 with `"status": "degraded"` when the database can't be reached.

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use quill_shared::db::pool;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database unreachable from health probe");
            false
        }
    };

    let (code, status, database) = if reachable {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "disconnected")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::lazy_state;

    #[tokio::test]
    async fn test_degraded_without_database() {
        let (code, Json(body)) = health_check(State(lazy_state())).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.database, "disconnected");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
