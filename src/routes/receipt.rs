use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::receipt_handlers;
use crate::state::AppState;

pub fn receipt_routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(receipt_health))

        // Direct issue for offline payments
        .route("/generate", post(receipt_handlers::generate_receipt))

        // Lookup, download, email
        .route("/download/:id", get(receipt_handlers::download_receipt))
        .route(
            "/payment/:payment_id/pdf",
            get(receipt_handlers::download_by_payment),
        )
        .route("/send-email/:id", post(receipt_handlers::send_receipt_email))
        .route("/:id", get(receipt_handlers::get_receipt))
}

async fn receipt_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "receipt",
        "timestamp": Utc::now().to_rfc3339(),
        "features": ["direct-generate", "pdf-download", "email-dispatch"]
    }))
}
