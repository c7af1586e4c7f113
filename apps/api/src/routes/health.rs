use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness probe with the service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Profile analyzer API is running",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
