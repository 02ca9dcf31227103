use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::admin_handlers;
use crate::middleware::auth::admin_auth;
use crate::state::AppState;

/// Login and health stay open; everything else sits behind the JWT
/// middleware.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/stats", get(admin_handlers::get_stats))
        .route("/receipts", get(admin_handlers::get_receipts))
        .route_layer(middleware::from_fn_with_state(state, admin_auth));

    Router::new()
        .route("/health", get(admin_health))
        .route("/login", post(admin_handlers::admin_login))
        .merge(protected)
}

async fn admin_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "admin",
        "timestamp": Utc::now().to_rfc3339(),
        "features": ["login", "stats", "receipt-listing"]
    }))
}
