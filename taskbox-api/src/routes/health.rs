//! Health check endpoint
//!
//! # Endpoint
//!
//! ```text
//! GET /health
//! ```
//!
//! Response:
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "db_connection": true
//! }
//! ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Whether the database answered the probe
    pub db_connection: bool,
}

/// Health check handler.
///
/// Always returns 200; database trouble is reported in the body so load
/// balancers keep routing while operators see the degradation.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let db_connection = match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "health check database probe failed");
            false
        }
    };

    Ok(Json(HealthResponse {
        status: if db_connection { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db_connection,
    }))
}
