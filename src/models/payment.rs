use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::validate_phone;
use crate::money::{format_inr, Paise};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Card,
    Upi,
    NetBanking,
    Wallet,
    Cash,
    Cheque,
    BankTransfer,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Card => "card",
            PaymentMode::Upi => "upi",
            PaymentMode::NetBanking => "net_banking",
            PaymentMode::Wallet => "wallet",
            PaymentMode::Cash => "cash",
            PaymentMode::Cheque => "cheque",
            PaymentMode::BankTransfer => "bank_transfer",
        }
    }

    /// Printable form for receipts.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Card => "Card",
            PaymentMode::Upi => "UPI",
            PaymentMode::NetBanking => "Net Banking",
            PaymentMode::Wallet => "Wallet",
            PaymentMode::Cash => "Cash",
            PaymentMode::Cheque => "Cheque",
            PaymentMode::BankTransfer => "Bank Transfer",
        }
    }

    /// Modes the hosted checkout can capture. The rest exist for directly
    /// issued receipts and never reach the gateway.
    pub fn is_gateway_mode(&self) -> bool {
        matches!(
            self,
            PaymentMode::Card | PaymentMode::Upi | PaymentMode::NetBanking | PaymentMode::Wallet
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user_id: ObjectId,
    pub amount: Paise,
    pub payment_mode: PaymentMode,
    pub status: PaymentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utr_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub amount: f64,
    pub amount_formatted: String,
    pub payment_mode: PaymentMode,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utr_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        PaymentResponse {
            id: payment.id.map(|id| id.to_hex()).unwrap_or_default(),
            amount: payment.amount.as_rupees(),
            amount_formatted: format_inr(payment.amount),
            payment_mode: payment.payment_mode,
            status: payment.status,
            razorpay_order_id: payment.razorpay_order_id.clone(),
            razorpay_payment_id: payment.razorpay_payment_id.clone(),
            utr_number: payment.utr_number.clone(),
            description: payment.description.clone(),
            created_at: payment.created_at.to_rfc3339(),
        }
    }
}

/// Customer-facing form payload for the gateway checkout. Amount arrives
/// in rupees and is converted to paise before anything persists.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(custom(function = validate_phone, message = "Phone number must be 10 digits"))]
    pub phone: String,

    #[validate(length(min = 10, message = "Address must be at least 10 characters"))]
    pub address: String,

    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,

    pub payment_mode: PaymentMode,
}

/// The checkout widget posts snake_case field names while the typed client
/// uses camelCase; aliases accept both spellings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_payment_id")]
    pub razorpay_payment_id: String,

    #[serde(alias = "razorpay_order_id")]
    pub razorpay_order_id: String,

    #[serde(alias = "razorpay_signature")]
    pub razorpay_signature: String,

    pub payment_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QrPaymentRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(custom(function = validate_phone, message = "Phone number must be 10 digits"))]
    pub phone: String,

    #[validate(length(min = 10, message = "Address must be at least 10 characters"))]
    pub address: String,

    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_form() -> serde_json::Value {
        json!({
            "name": "John Doe",
            "email": "john@example.com",
            "phone": "9876543210",
            "address": "123 Main Street, Mumbai",
            "amount": 1500.0,
            "paymentMode": "upi"
        })
    }

    #[test]
    fn accepts_a_complete_form() {
        let request: InitiatePaymentRequest = serde_json::from_value(valid_form()).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.payment_mode, PaymentMode::Upi);
    }

    #[test]
    fn rejects_each_corrupted_field_naming_it() {
        let cases = [
            ("name", json!("J")),
            ("email", json!("not-an-email")),
            ("phone", json!("12345")),
            ("address", json!("short")),
            ("amount", json!(0.0)),
        ];

        for (field, bad_value) in cases {
            let mut form = valid_form();
            form[field] = bad_value;
            let request: InitiatePaymentRequest = serde_json::from_value(form).unwrap();
            let errors = request.validate().unwrap_err();
            assert!(
                errors.field_errors().contains_key(field),
                "expected an error on {}",
                field
            );
        }
    }

    #[test]
    fn rejects_unknown_payment_modes() {
        let mut form = valid_form();
        form["paymentMode"] = json!("crypto");
        assert!(serde_json::from_value::<InitiatePaymentRequest>(form).is_err());
    }

    #[test]
    fn verify_request_accepts_both_field_spellings() {
        let camel: VerifyPaymentRequest = serde_json::from_value(json!({
            "razorpayPaymentId": "pay_abc",
            "razorpayOrderId": "order_xyz",
            "razorpaySignature": "sig_123",
            "paymentId": "665f1f77bcf86cd799439011"
        }))
        .unwrap();
        assert_eq!(camel.razorpay_payment_id, "pay_abc");

        let snake: VerifyPaymentRequest = serde_json::from_value(json!({
            "razorpay_payment_id": "pay_abc",
            "razorpay_order_id": "order_xyz",
            "razorpay_signature": "sig_123",
            "paymentId": "665f1f77bcf86cd799439011"
        }))
        .unwrap();
        assert_eq!(snake.razorpay_order_id, "order_xyz");
    }

    #[test]
    fn payment_modes_round_trip_as_snake_case() {
        assert_eq!(
            serde_json::to_value(PaymentMode::NetBanking).unwrap(),
            json!("net_banking")
        );
        assert_eq!(
            serde_json::from_value::<PaymentMode>(json!("bank_transfer")).unwrap(),
            PaymentMode::BankTransfer
        );
    }

    #[test]
    fn gateway_modes_exclude_offline_instruments() {
        assert!(PaymentMode::Card.is_gateway_mode());
        assert!(PaymentMode::Upi.is_gateway_mode());
        assert!(!PaymentMode::Cash.is_gateway_mode());
        assert!(!PaymentMode::Cheque.is_gateway_mode());
        assert!(!PaymentMode::BankTransfer.is_gateway_mode());
    }
}
