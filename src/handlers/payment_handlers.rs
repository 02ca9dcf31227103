// handlers/payment_handlers.rs
use axum::extract::{Multipart, State};
use axum::Json;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use serde_json::{json, Value};
use std::path::Path as StdPath;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::flow::checkout::preferred_download;
use crate::flow::qr::is_valid_utr;
use crate::handlers::receipt_handlers::dispatch_receipt_emails;
use crate::models::payment::{
    InitiatePaymentRequest, Payment, PaymentMode, PaymentResponse, PaymentStatus,
    QrPaymentRequest, VerifyPaymentRequest,
};
use crate::models::receipt::Receipt;
use crate::models::user::{normalize_phone, User, UserResponse};
use crate::money::{format_inr, Paise};
use crate::state::AppState;

pub(crate) const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

fn allowed_extension(file_name: &str) -> bool {
    StdPath::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Customers are keyed by email: a repeat payer gets their name, phone
/// and address refreshed instead of a second record.
pub(crate) async fn upsert_customer(
    db: &Database,
    name: &str,
    email: &str,
    phone: &str,
    address: &str,
) -> Result<User> {
    let users: Collection<User> = db.collection("users");
    let now = bson::DateTime::now();

    users
        .find_one_and_update(
            doc! { "email": email },
            doc! {
                "$set": {
                    "name": name,
                    "phone": phone,
                    "address": address,
                    "updated_at": now,
                },
                "$setOnInsert": {
                    "email": email,
                    "created_at": now,
                },
            },
        )
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::service("User upsert returned no document"))
}

async fn insert_pending_payment(
    db: &Database,
    payment_id: ObjectId,
    user_id: ObjectId,
    amount: Paise,
    payment_mode: PaymentMode,
) -> Result<Payment> {
    let payments: Collection<Payment> = db.collection("payments");
    let now = chrono::Utc::now();

    let payment = Payment {
        id: Some(payment_id),
        user_id,
        amount,
        payment_mode,
        status: PaymentStatus::Pending,
        razorpay_order_id: None,
        razorpay_payment_id: None,
        razorpay_signature: None,
        utr_number: None,
        proof_file: None,
        description: None,
        created_at: now,
        updated_at: now,
    };
    payments.insert_one(&payment).await?;
    Ok(payment)
}

/// Moves a pending payment to a terminal status. The filter keys on the
/// pending status, so a payment settles exactly once; a second attempt
/// comes back None and the caller reloads whatever the winner wrote.
async fn settle_payment(
    db: &Database,
    payment_id: ObjectId,
    outcome: PaymentStatus,
    mut set_fields: Document,
) -> Result<Option<Payment>> {
    let payments: Collection<Payment> = db.collection("payments");
    set_fields.insert("status", outcome.as_str());
    set_fields.insert("updated_at", bson::DateTime::now());

    Ok(payments
        .find_one_and_update(
            doc! { "_id": payment_id, "status": PaymentStatus::Pending.as_str() },
            doc! { "$set": set_fields },
        )
        .return_document(ReturnDocument::After)
        .await?)
}

async fn verified_body(
    state: &AppState,
    payment: &Payment,
    receipt: &Receipt,
    message: &str,
) -> Result<Value> {
    let users: Collection<User> = state.db.collection("users");
    let user = users
        .find_one(doc! { "_id": payment.user_id })
        .await?
        .ok_or(AppError::DocumentNotFound)?;

    let payment_hex = payment.id.map(|id| id.to_hex()).unwrap_or_default();
    let receipt_hex = receipt.id.map(|id| id.to_hex());
    let download_url = preferred_download(receipt_hex.as_deref(), None, &payment_hex);

    Ok(json!({
        "success": true,
        "message": message,
        "receiptId": receipt_hex,
        "receiptNumber": receipt.receipt_number,
        "payment": PaymentResponse::from(payment),
        "user": UserResponse::from(&user),
        "downloadUrl": download_url,
    }))
}

/// POST /api/payment/initiate
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<Value>> {
    request.validate()?;

    if !request.payment_mode.is_gateway_mode() {
        return Err(AppError::invalid_data(
            "Payment mode does not use the gateway checkout",
        ));
    }

    let razorpay = match &state.razorpay {
        Some(service) => service,
        None => {
            error!("Razorpay service not available");
            return Err(AppError::ServiceUnavailable(
                "Payment gateway is not configured".to_string(),
            ));
        }
    };

    let phone = normalize_phone(&request.phone)
        .ok_or_else(|| AppError::invalid_data("Invalid phone number"))?;
    let user = upsert_customer(&state.db, &request.name, &request.email, &phone, &request.address)
        .await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User upsert returned no id"))?;

    let amount = Paise::from_rupees(request.amount);
    let payment_oid = ObjectId::new();
    insert_pending_payment(&state.db, payment_oid, user_id, amount, request.payment_mode).await?;

    let payment_hex = payment_oid.to_hex();
    let order = razorpay
        .create_order(amount, &payment_hex, &request.name, &request.email)
        .await?;

    let payments: Collection<Payment> = state.db.collection("payments");
    payments
        .update_one(
            doc! { "_id": payment_oid },
            doc! { "$set": {
                "razorpay_order_id": &order.id,
                "updated_at": bson::DateTime::now(),
            }},
        )
        .await?;

    info!(
        "Gateway order {} opened for payment {} ({})",
        order.id,
        payment_hex,
        format_inr(amount)
    );

    Ok(Json(json!({
        "success": true,
        "paymentId": payment_hex,
        "orderId": order.id,
        "amount": amount.as_rupees(),
        "currency": order.currency,
        "user": {
            "name": user.name,
            "email": user.email,
            "phone": user.phone,
        },
    })))
}

/// POST /api/payment/create-order
///
/// Same pipeline as initiate, shaped for the hosted checkout widget:
/// amount in paise plus the public key id.
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<Value>> {
    request.validate()?;

    if !request.payment_mode.is_gateway_mode() {
        return Err(AppError::invalid_data(
            "Payment mode does not use the gateway checkout",
        ));
    }

    let razorpay = match &state.razorpay {
        Some(service) => service,
        None => {
            error!("Razorpay service not available");
            return Err(AppError::ServiceUnavailable(
                "Payment gateway is not configured".to_string(),
            ));
        }
    };

    let phone = normalize_phone(&request.phone)
        .ok_or_else(|| AppError::invalid_data("Invalid phone number"))?;
    let user = upsert_customer(&state.db, &request.name, &request.email, &phone, &request.address)
        .await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User upsert returned no id"))?;

    let amount = Paise::from_rupees(request.amount);
    let payment_oid = ObjectId::new();
    insert_pending_payment(&state.db, payment_oid, user_id, amount, request.payment_mode).await?;

    let payment_hex = payment_oid.to_hex();
    let order = razorpay
        .create_order(amount, &payment_hex, &request.name, &request.email)
        .await?;

    let payments: Collection<Payment> = state.db.collection("payments");
    payments
        .update_one(
            doc! { "_id": payment_oid },
            doc! { "$set": {
                "razorpay_order_id": &order.id,
                "updated_at": bson::DateTime::now(),
            }},
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "key": razorpay.key_id(),
        "amount": order.amount,
        "currency": order.currency,
        "orderId": order.id,
        "paymentId": payment_hex,
    })))
}

/// POST /api/payment/verify
///
/// Checks the gateway signature and settles the payment. Replays against
/// an already verified payment return the existing receipt; a bad
/// signature settles the payment as failed.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>> {
    let payment_oid = ObjectId::parse_str(&request.payment_id)?;
    let payments: Collection<Payment> = state.db.collection("payments");
    let payment = payments
        .find_one(doc! { "_id": payment_oid })
        .await?
        .ok_or(AppError::PaymentNotFound)?;

    match payment.status {
        PaymentStatus::Success => {
            let receipt = state
                .receipts
                .find_by_payment(payment_oid)
                .await?
                .ok_or(AppError::ReceiptNotFound)?;
            let body = verified_body(&state, &payment, &receipt, "Payment already verified").await?;
            return Ok(Json(body));
        }
        PaymentStatus::Failed | PaymentStatus::Cancelled => {
            return Ok(Json(json!({
                "success": false,
                "message": "Payment verification failed",
            })));
        }
        PaymentStatus::Pending => {}
    }

    let razorpay = match &state.razorpay {
        Some(service) => service,
        None => {
            error!("Razorpay service not available");
            return Err(AppError::ServiceUnavailable(
                "Payment gateway is not configured".to_string(),
            ));
        }
    };

    // The order must be the one opened for this payment record.
    let order_matches = payment
        .razorpay_order_id
        .as_deref()
        .map(|stored| stored == request.razorpay_order_id)
        .unwrap_or(false);

    let signature_valid = order_matches
        && razorpay.verify_signature(
            &request.razorpay_order_id,
            &request.razorpay_payment_id,
            &request.razorpay_signature,
        );

    if !signature_valid {
        warn!(
            "❌ Signature verification failed for payment {}",
            request.payment_id
        );
        settle_payment(
            &state.db,
            payment_oid,
            PaymentStatus::Failed,
            doc! { "razorpay_payment_id": &request.razorpay_payment_id },
        )
        .await?;
        return Ok(Json(json!({
            "success": false,
            "message": "Payment verification failed",
        })));
    }

    let settled = settle_payment(
        &state.db,
        payment_oid,
        PaymentStatus::Success,
        doc! {
            "razorpay_payment_id": &request.razorpay_payment_id,
            "razorpay_signature": &request.razorpay_signature,
        },
    )
    .await?;

    // None means a concurrent verify settled first; reload what it wrote.
    let payment = match settled {
        Some(payment) => payment,
        None => payments
            .find_one(doc! { "_id": payment_oid })
            .await?
            .ok_or(AppError::PaymentNotFound)?,
    };

    let receipt = state.receipts.create_for_payment(payment_oid).await?;
    info!(
        "✅ Payment {} verified, receipt {}",
        request.payment_id, receipt.receipt_number
    );

    let body = verified_body(&state, &payment, &receipt, "Payment verified successfully").await?;
    Ok(Json(body))
}

/// POST /api/payment/qr-payment
///
/// Registers a pending UPI payment and hands back what the QR screen
/// needs. Settlement happens later through verify-utr.
pub async fn qr_payment(
    State(state): State<AppState>,
    Json(request): Json<QrPaymentRequest>,
) -> Result<Json<Value>> {
    request.validate()?;

    let phone = normalize_phone(&request.phone)
        .ok_or_else(|| AppError::invalid_data("Invalid phone number"))?;
    let user = upsert_customer(&state.db, &request.name, &request.email, &phone, &request.address)
        .await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User upsert returned no id"))?;

    let amount = Paise::from_rupees(request.amount);
    let payment_oid = ObjectId::new();
    insert_pending_payment(&state.db, payment_oid, user_id, amount, PaymentMode::Upi).await?;

    info!(
        "QR payment {} registered ({})",
        payment_oid.to_hex(),
        format_inr(amount)
    );

    Ok(Json(json!({
        "success": true,
        "paymentId": payment_oid.to_hex(),
        "amount": amount.as_rupees(),
        "amountFormatted": format_inr(amount),
        "upiId": state.upi.upi_id,
        "qrImageUrl": state.upi.qr_image_url,
    })))
}

async fn store_screenshot(upload_dir: &str, original_name: &str, data: &[u8]) -> Result<String> {
    let stored_name = format!(
        "{}_{}",
        Uuid::new_v4(),
        sanitize_filename::sanitize(original_name)
    );
    let dir = format!("{}/payment_proofs", upload_dir);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(format!("{}/{}", dir, stored_name), data).await?;
    Ok(stored_name)
}

/// POST /api/payment/verify-utr  (multipart/form-data)
///
/// Fields: paymentId, utrNumber and a screenshot image. A valid proof
/// settles the payment, issues the receipt and emails both copies.
pub async fn verify_utr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let request_id = Uuid::new_v4();
    info!("[{}] UTR verification submitted", request_id);

    let mut payment_id: Option<String> = None;
    let mut utr_number: Option<String> = None;
    let mut screenshot: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "paymentId" => payment_id = Some(field.text().await?),
            "utrNumber" => utr_number = Some(field.text().await?),
            "screenshot" => {
                let file_name = field
                    .file_name()
                    .unwrap_or("screenshot.jpg")
                    .to_string();
                if !allowed_extension(&file_name) {
                    return Err(AppError::InvalidImageFormat);
                }

                let data = field.bytes().await?;
                if data.len() > MAX_FILE_SIZE {
                    return Err(AppError::ImageTooLarge);
                }
                // Extension alone is spoofable; sniff the bytes too.
                let looks_like_image = infer::get(&data)
                    .map(|kind| kind.mime_type().starts_with("image/"))
                    .unwrap_or(false);
                if !looks_like_image {
                    return Err(AppError::InvalidImageFormat);
                }

                screenshot = Some((file_name, data.to_vec()));
            }
            _ => {}
        }
    }

    let payment_id =
        payment_id.ok_or_else(|| AppError::invalid_data("paymentId is required"))?;
    let utr_number =
        utr_number.ok_or_else(|| AppError::invalid_data("utrNumber is required"))?;
    if !is_valid_utr(&utr_number) {
        return Err(AppError::invalid_data("UTR number must be exactly 12 digits"));
    }
    let (file_name, image_bytes) = screenshot.ok_or(AppError::NoScreenshotProvided)?;

    let payment_oid = ObjectId::parse_str(&payment_id)?;
    let payments: Collection<Payment> = state.db.collection("payments");
    let payment = payments
        .find_one(doc! { "_id": payment_oid })
        .await?
        .ok_or(AppError::PaymentNotFound)?;

    match payment.status {
        PaymentStatus::Success => {
            let receipt = state
                .receipts
                .find_by_payment(payment_oid)
                .await?
                .ok_or(AppError::ReceiptNotFound)?;
            let receipt_hex = receipt.id.map(|id| id.to_hex());
            let download_url = preferred_download(receipt_hex.as_deref(), None, &payment_id);
            info!("[{}] Payment {} already verified", request_id, payment_id);
            return Ok(Json(json!({
                "success": true,
                "message": "Payment already verified",
                "receipt": {
                    "receiptId": receipt_hex,
                    "receiptNumber": receipt.receipt_number,
                },
                "utrNumber": payment.utr_number,
                "downloadUrl": download_url,
            })));
        }
        PaymentStatus::Failed | PaymentStatus::Cancelled => {
            return Ok(Json(json!({
                "success": false,
                "message": "Payment verification failed",
            })));
        }
        PaymentStatus::Pending => {}
    }

    let stored_name = store_screenshot(&state.upload_dir, &file_name, &image_bytes).await?;

    settle_payment(
        &state.db,
        payment_oid,
        PaymentStatus::Success,
        doc! {
            "utr_number": &utr_number,
            "proof_file": &stored_name,
        },
    )
    .await?;

    let receipt = state.receipts.create_for_payment(payment_oid).await?;
    info!(
        "[{}] ✅ UTR {} accepted for payment {}, receipt {}",
        request_id, utr_number, payment_id, receipt.receipt_number
    );

    let data = state.receipts.load_data(receipt.clone()).await?;
    let (email_sent, business_copy_sent) = dispatch_receipt_emails(&state, &data).await;

    let receipt_hex = receipt.id.map(|id| id.to_hex());
    let download_url = preferred_download(receipt_hex.as_deref(), None, &payment_id);

    Ok(Json(json!({
        "success": true,
        "message": "Payment verified successfully. Your receipt has been emailed to you.",
        "receipt": {
            "receiptId": receipt_hex,
            "receiptNumber": receipt.receipt_number,
        },
        "utrNumber": utr_number,
        "downloadUrl": download_url,
        "emailSent": email_sent,
        "businessCopySent": business_copy_sent,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_usual_image_extensions() {
        assert!(allowed_extension("payment.jpg"));
        assert!(allowed_extension("payment.JPEG"));
        assert!(allowed_extension("proof.png"));
        assert!(allowed_extension("scan.gif"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!allowed_extension("payment.pdf"));
        assert!(!allowed_extension("payment.jpg.exe"));
        assert!(!allowed_extension("payment"));
        assert!(!allowed_extension(""));
    }
}
