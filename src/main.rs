use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber;

mod config;
mod database;
mod errors;
mod flow;
mod handlers;
mod middleware;
mod models;
mod money;
mod routes;
mod services;
mod state;

use config::AppConfig;
use database::connection::{ensure_indexes, get_db_client};
use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env();

    create_directories(&config).await;

    let db = get_db_client(&config.database_url, &config.database_name).await;
    if let Err(e) = ensure_indexes(&db).await {
        tracing::error!("❌ Failed to create indexes: {}", e);
    }

    let app_state = initialize_app_state(db, &config);

    let app = build_router(app_state).await;
    start_server(app, &config).await;
}

async fn create_directories(config: &AppConfig) {
    let dirs = [format!("{}/payment_proofs", config.upload_dir)];
    for dir in dirs {
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::warn!("Failed to create {}: {}", dir, e);
        }
    }
}

fn initialize_app_state(db: mongodb::Database, config: &AppConfig) -> AppState {
    let mut app_state = AppState::new(db, config);

    match &config.razorpay {
        Some(razorpay_config) => {
            tracing::info!("🔑 Razorpay key: {}", razorpay_config.key_id);
            let razorpay = Arc::new(services::razorpay::RazorpayService::new(
                razorpay_config.clone(),
            ));
            app_state = app_state.with_razorpay(razorpay);
            tracing::info!("✅ Razorpay service initialized");
        }
        None => {
            tracing::warn!("⚠️ Razorpay credentials missing, gateway checkout disabled");
        }
    }

    match &config.email {
        Some(email_config) => {
            let email = Arc::new(services::email::EmailService::new(email_config.clone()));
            app_state = app_state.with_email(email);
            tracing::info!("✅ Email service initialized");
        }
        None => {
            tracing::warn!("⚠️ Email credentials missing, receipt emails disabled");
        }
    }

    app_state
}

async fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/payment", routes::payment::payment_routes())
        .nest("/api/receipt", routes::receipt::receipt_routes())
        .nest("/api/admin", routes::admin::admin_routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig) {
    let addr = format!("{}:{}", config.host, config.port)
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], config.port)));

    tracing::info!("🚀 Server starting on {}", addr);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            axum::serve(listener, app).await.unwrap();
        }
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    }
}

async fn root_handler() -> &'static str {
    "🧾 Akrix Receipt & Payment API"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    use mongodb::bson::doc;

    let db_status = match state.db.run_command(doc! {"ping": 1}).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "razorpay": state.razorpay.is_some(),
        "email": state.email.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
