use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::payment_handlers::{self, MAX_FILE_SIZE};
use crate::handlers::proof;
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(payment_health))

        // Gateway checkout
        .route("/initiate", post(payment_handlers::initiate_payment))
        .route("/create-order", post(payment_handlers::create_order))
        .route("/verify", post(payment_handlers::verify_payment))

        // QR / UTR flow
        .route("/qr-payment", post(payment_handlers::qr_payment))
        .route("/verify-utr", post(payment_handlers::verify_utr))

        // Stored payment screenshots
        .route("/proof/:file_name", get(proof::serve_proof))

        // Screenshot uploads exceed axum's default body cap
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024))
}

async fn payment_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "payment",
        "timestamp": Utc::now().to_rfc3339(),
        "features": ["gateway-checkout", "qr-payment", "utr-verification", "payment-proofs"]
    }))
}
