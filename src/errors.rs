// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image format")]
    InvalidImageFormat,

    #[error("Image too large")]
    ImageTooLarge,

    #[error("No screenshot provided")]
    NoScreenshotProvided,

    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Receipt not found")]
    ReceiptNotFound,

    #[error("Document not found")]
    DocumentNotFound,

    #[error("Payment already settled as {0}")]
    PaymentSettled(String),

    #[error("Duplicate key error")]
    DuplicateKey,

    #[error("Razorpay error: {0}")]
    RazorpayError(String),

    #[error("Authentication error")]
    AuthError,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation failed")]
    FieldValidation(#[from] ValidationErrors),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("PDF generation error: {0}")]
    PdfError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MongoDB(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string()),
            AppError::Multipart(_) => (StatusCode::BAD_REQUEST, "Invalid multipart data".to_string()),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string()),
            AppError::InvalidImageFormat => (StatusCode::BAD_REQUEST, "Invalid image format".to_string()),
            AppError::ImageTooLarge => (StatusCode::BAD_REQUEST, "Image too large".to_string()),
            AppError::NoScreenshotProvided => (StatusCode::BAD_REQUEST, "No screenshot provided".to_string()),
            AppError::InvalidObjectId(_) => (StatusCode::BAD_REQUEST, "Invalid ID format".to_string()),
            AppError::PaymentNotFound => (StatusCode::NOT_FOUND, "Payment not found".to_string()),
            AppError::ReceiptNotFound => (StatusCode::NOT_FOUND, "Receipt not found".to_string()),
            AppError::DocumentNotFound => (StatusCode::NOT_FOUND, "Document not found".to_string()),
            AppError::PaymentSettled(_) => (StatusCode::CONFLICT, "Payment already settled".to_string()),
            AppError::DuplicateKey => (StatusCode::CONFLICT, "Duplicate entry".to_string()),
            AppError::RazorpayError(_) => (StatusCode::BAD_GATEWAY, "Payment gateway error".to_string()),
            AppError::AuthError => (StatusCode::UNAUTHORIZED, "Authentication failed".to_string()),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Validation failed".to_string()),
            AppError::FieldValidation(_) => (StatusCode::BAD_REQUEST, "Validation failed".to_string()),
            AppError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable".to_string()),
            AppError::ExternalApi(_) => (StatusCode::BAD_GATEWAY, "External API error".to_string()),
            AppError::PdfError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PDF generation error".to_string()),
            AppError::ServiceError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Service error".to_string()),
        };

        let mut body = json!({
            "error": error_message,
            "message": self.to_string(),
            "success": false,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        // Per-field messages so the form can highlight the offending input.
        if let AppError::FieldValidation(errors) = &self {
            body["errors"] = field_error_map(errors);
        }

        (status, Json(body)).into_response()
    }
}

fn field_error_map(errors: &ValidationErrors) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
            .collect();
        map.insert(field.to_string(), json!(messages));
    }
    serde_json::Value::Object(map)
}

// Manual From implementations
impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Multipart(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("JSON parsing error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(format!("HTTP request failed: {}", err))
    }
}

impl From<mongodb::bson::oid::Error> for AppError {
    fn from(err: mongodb::bson::oid::Error) -> Self {
        AppError::InvalidObjectId(err.to_string())
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn razorpay(msg: impl Into<String>) -> Self {
        AppError::RazorpayError(msg.into())
    }

    pub fn pdf(msg: impl Into<String>) -> Self {
        AppError::PdfError(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        AppError::ServiceError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_not_found_errors_to_404() {
        assert_eq!(
            AppError::ReceiptNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::PaymentNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn maps_gateway_failures_to_502() {
        let response = AppError::razorpay("order creation failed").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn maps_missing_service_to_503() {
        let response =
            AppError::ServiceUnavailable("gateway not configured".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
