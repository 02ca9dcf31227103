use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::payment::{Payment, PaymentMode};
use crate::models::user::{validate_phone, User};

/// One receipt per successful payment; both the receipt number and the
/// payment id carry unique indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub payment_id: ObjectId,
    pub receipt_number: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub id: String,
    pub payment_id: String,
    pub receipt_number: String,
    pub generated_at: String,
}

impl From<&Receipt> for ReceiptResponse {
    fn from(receipt: &Receipt) -> Self {
        ReceiptResponse {
            id: receipt.id.map(|id| id.to_hex()).unwrap_or_default(),
            payment_id: receipt.payment_id.to_hex(),
            receipt_number: receipt.receipt_number.clone(),
            generated_at: receipt.generated_at.to_rfc3339(),
        }
    }
}

/// The joined view the renderer and the detail endpoint work from.
#[derive(Debug, Clone)]
pub struct ReceiptData {
    pub receipt: Receipt,
    pub payment: Payment,
    pub user: User,
}

/// Direct receipt issue, no gateway leg: the payment is recorded already
/// settled and the PDF comes back in the response body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DirectReceiptRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub customer_name: String,

    #[validate(email(message = "Please enter a valid email address"))]
    pub customer_email: String,

    #[validate(custom(function = validate_phone, message = "Phone number must be 10 digits"))]
    pub customer_phone: String,

    #[validate(length(min = 10, message = "Address must be at least 10 characters"))]
    pub customer_address: String,

    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,

    pub payment_mode: PaymentMode,

    pub description: Option<String>,
}

/// Daily sequence document backing receipt numbers. The `_id` is the
/// PREFIX-YYYYMMDD day key, so the sequence resets with the date.
#[derive(Debug, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_request_accepts_offline_modes() {
        let request: DirectReceiptRequest = serde_json::from_value(json!({
            "customerName": "Jane Smith",
            "customerEmail": "jane@example.com",
            "customerPhone": "9123456780",
            "customerAddress": "45 Park Avenue, Pune",
            "amount": 2500.0,
            "paymentMode": "cheque",
            "description": "Consulting retainer"
        }))
        .unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.payment_mode, PaymentMode::Cheque);
        assert_eq!(request.description.as_deref(), Some("Consulting retainer"));
    }

    #[test]
    fn direct_request_requires_a_positive_amount() {
        let request: DirectReceiptRequest = serde_json::from_value(json!({
            "customerName": "Jane Smith",
            "customerEmail": "jane@example.com",
            "customerPhone": "9123456780",
            "customerAddress": "45 Park Avenue, Pune",
            "amount": 0.0,
            "paymentMode": "cash"
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount"));
    }
}
