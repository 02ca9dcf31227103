// services/razorpay.rs
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use reqwest::{header, Client};
use ring::hmac;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::RazorpayConfig;
use crate::errors::{AppError, Result};
use crate::money::Paise;

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    amount: i64,
    currency: String,
    receipt: String,
    notes: OrderNotes,
}

#[derive(Debug, Serialize)]
struct OrderNotes {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayService {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayService {
    pub fn new(config: RazorpayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        RazorpayService { config, client }
    }

    /// Publishable key id the checkout widget needs.
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    fn auth_header(&self) -> String {
        let auth_string = format!("{}:{}", self.config.key_id, self.config.key_secret);
        format!("Basic {}", base64.encode(auth_string))
    }

    /// Creates a gateway order. Amounts go over the wire in paise.
    pub async fn create_order(
        &self,
        amount: Paise,
        reference: &str,
        customer_name: &str,
        customer_email: &str,
    ) -> Result<RazorpayOrder> {
        info!(
            "Creating Razorpay order: {} paise (ref {})",
            amount.as_paise(),
            reference
        );

        let url = format!("{}/v1/orders", self.config.base_url);
        let order_request = CreateOrderRequest {
            amount: amount.as_paise(),
            currency: "INR".to_string(),
            receipt: reference.to_string(),
            notes: OrderNotes {
                name: customer_name.to_string(),
                email: customer_email.to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&order_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            error!("Order creation failed: {} - {}", status, body);
            return Err(AppError::razorpay(format!(
                "Order creation failed: {}",
                status
            )));
        }

        let order: RazorpayOrder = response.json().await?;
        info!("Razorpay order created: {}", order.id);
        Ok(order)
    }

    /// Checks the checkout callback signature: hex HMAC-SHA256 over
    /// "order_id|payment_id" keyed with the secret.
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let key = hmac::Key::new(hmac::HMAC_SHA256, self.config.key_secret.as_bytes());
        let payload = format!("{}|{}", order_id, payment_id);

        match hex::decode(signature) {
            Ok(expected) => hmac::verify(&key, payload.as_bytes(), &expected).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> RazorpayService {
        RazorpayService::new(RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: "test_secret".to_string(),
            base_url: "https://api.razorpay.com".to_string(),
        })
    }

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        let tag = hmac::sign(&key, format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(tag.as_ref())
    }

    #[test]
    fn accepts_a_matching_signature() {
        let service = test_service();
        let signature = sign("test_secret", "order_xyz", "pay_abc");
        assert!(service.verify_signature("order_xyz", "pay_abc", &signature));
    }

    #[test]
    fn rejects_a_tampered_signature() {
        let service = test_service();
        let mut signature = sign("test_secret", "order_xyz", "pay_abc");
        // flip one nibble
        let last = signature.pop().unwrap();
        signature.push(if last == '0' { '1' } else { '0' });
        assert!(!service.verify_signature("order_xyz", "pay_abc", &signature));
    }

    #[test]
    fn rejects_a_signature_for_different_ids() {
        let service = test_service();
        let signature = sign("test_secret", "order_other", "pay_abc");
        assert!(!service.verify_signature("order_xyz", "pay_abc", &signature));
    }

    #[test]
    fn rejects_non_hex_signatures() {
        let service = test_service();
        assert!(!service.verify_signature("order_xyz", "pay_abc", "not-hex!"));
    }
}
