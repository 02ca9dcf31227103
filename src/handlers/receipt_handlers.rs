// handlers/receipt_handlers.rs
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use mongodb::bson::oid::ObjectId;
use mongodb::Collection;
use serde_json::{json, Value};
use tracing::{error, info};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::handlers::payment_handlers::upsert_customer;
use crate::models::payment::{Payment, PaymentResponse, PaymentStatus};
use crate::models::receipt::{DirectReceiptRequest, ReceiptData, ReceiptResponse};
use crate::models::user::{normalize_phone, UserResponse};
use crate::money::{format_inr, Paise};
use crate::state::AppState;

fn pdf_response(receipt_number: &str, bytes: Vec<u8>) -> Result<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/pdf")
        .header(
            "content-disposition",
            format!("attachment; filename=\"receipt-{}.pdf\"", receipt_number),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::service(e.to_string()))
}

/// GET /api/receipt/:id
///
/// The id may be a receipt id or a payment id; either lands on the same
/// receipt.
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let receipt = state.receipts.resolve_receipt(&id).await?;
    let data = state.receipts.load_data(receipt).await?;

    Ok(Json(json!({
        "success": true,
        "receipt": ReceiptResponse::from(&data.receipt),
        "payment": PaymentResponse::from(&data.payment),
        "user": UserResponse::from(&data.user),
    })))
}

/// GET /api/receipt/download/:id
pub async fn download_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let receipt = state.receipts.resolve_receipt(&id).await?;
    let data = state.receipts.load_data(receipt).await?;
    let bytes = state.pdf.render_receipt(&data)?;
    pdf_response(&data.receipt.receipt_number, bytes)
}

/// GET /api/receipt/payment/:payment_id/pdf
///
/// Fallback for clients that only held on to the payment id.
pub async fn download_by_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Response> {
    let payment_oid = ObjectId::parse_str(&payment_id)?;
    let receipt = state
        .receipts
        .find_by_payment(payment_oid)
        .await?
        .ok_or(AppError::ReceiptNotFound)?;
    let data = state.receipts.load_data(receipt).await?;
    let bytes = state.pdf.render_receipt(&data)?;
    pdf_response(&data.receipt.receipt_number, bytes)
}

/// POST /api/receipt/generate
///
/// Direct issue for payments collected outside the app (cash, cheque,
/// bank transfer). Records the payment already settled and streams the
/// PDF straight back.
pub async fn generate_receipt(
    State(state): State<AppState>,
    Json(request): Json<DirectReceiptRequest>,
) -> Result<Response> {
    request.validate()?;

    let phone = normalize_phone(&request.customer_phone)
        .ok_or_else(|| AppError::invalid_data("Invalid phone number"))?;
    let user = upsert_customer(
        &state.db,
        &request.customer_name,
        &request.customer_email,
        &phone,
        &request.customer_address,
    )
    .await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User upsert returned no id"))?;

    let amount = Paise::from_rupees(request.amount);
    let payment_oid = ObjectId::new();
    let now = chrono::Utc::now();

    let payment = Payment {
        id: Some(payment_oid),
        user_id,
        amount,
        payment_mode: request.payment_mode,
        status: PaymentStatus::Success,
        razorpay_order_id: None,
        razorpay_payment_id: None,
        razorpay_signature: None,
        utr_number: None,
        proof_file: None,
        description: request.description.clone(),
        created_at: now,
        updated_at: now,
    };
    let payments: Collection<Payment> = state.db.collection("payments");
    payments.insert_one(&payment).await?;

    let receipt = state.receipts.create_for_payment(payment_oid).await?;
    info!(
        "Direct receipt {} issued ({})",
        receipt.receipt_number,
        format_inr(amount)
    );

    let data = state.receipts.load_data(receipt).await?;
    let bytes = state.pdf.render_receipt(&data)?;
    pdf_response(&data.receipt.receipt_number, bytes)
}

/// POST /api/receipt/send-email/:id
pub async fn send_receipt_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    if state.email.is_none() {
        return Err(AppError::ServiceUnavailable(
            "Email dispatch is not configured".to_string(),
        ));
    }

    let receipt = state.receipts.resolve_receipt(&id).await?;
    let data = state.receipts.load_data(receipt).await?;
    let (email_sent, business_copy_sent) = dispatch_receipt_emails(&state, &data).await;

    Ok(Json(json!({
        "success": true,
        "receiptNumber": data.receipt.receipt_number,
        "emailSent": email_sent,
        "businessCopySent": business_copy_sent,
    })))
}

/// Renders the receipt once and emails it to the customer and to the
/// business inbox. Failures are logged, not propagated; the payment is
/// settled either way and the PDF stays downloadable.
pub(crate) async fn dispatch_receipt_emails(state: &AppState, data: &ReceiptData) -> (bool, bool) {
    let email = match &state.email {
        Some(service) => service,
        None => return (false, false),
    };

    let pdf_bytes = match state.pdf.render_receipt(data) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(
                "Failed to render receipt {} for email: {}",
                data.receipt.receipt_number, e
            );
            return (false, false);
        }
    };

    let amount = format_inr(data.payment.amount);

    let email_sent = match email
        .send_receipt(
            &data.user.email,
            &data.user.name,
            &data.receipt.receipt_number,
            &amount,
            &pdf_bytes,
        )
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!("Customer receipt email failed: {}", e);
            false
        }
    };

    let business_copy_sent = match email
        .send_receipt(
            &state.branding.business_email,
            &state.branding.business_name,
            &data.receipt.receipt_number,
            &amount,
            &pdf_bytes,
        )
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!("Business copy email failed: {}", e);
            false
        }
    };

    (email_sent, business_copy_sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_response_carries_download_headers() {
        let response = pdf_response("AKRX-20250108-0001", b"%PDF-1.3".to_vec()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers["content-type"], "application/pdf");
        assert_eq!(
            headers["content-disposition"],
            "attachment; filename=\"receipt-AKRX-20250108-0001.pdf\""
        );
    }
}
