use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use reqwest::{header, Client};
use serde_json::json;
use tracing::info;

use crate::config::EmailConfig;
use crate::errors::{AppError, Result};

/// Thin client for a Resend-style HTTP mail API. Dispatch is
/// fire-and-forget: callers log failures and move on.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    client: Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        EmailService { config, client }
    }

    pub async fn send_receipt(
        &self,
        to: &str,
        recipient_name: &str,
        receipt_number: &str,
        amount_formatted: &str,
        pdf_bytes: &[u8],
    ) -> Result<()> {
        let subject = format!("Payment Receipt {}", receipt_number);
        let html = format!(
            "<p>Dear {},</p>\
             <p>Thank you for your payment of <strong>{}</strong>.</p>\
             <p>Your receipt <strong>{}</strong> is attached as a PDF.</p>\
             <p>Akrix.ai<br/>Algorithms with Ambition</p>",
            recipient_name, amount_formatted, receipt_number
        );

        let payload = json!({
            "from": self.config.from,
            "to": [to],
            "subject": subject,
            "html": html,
            "attachments": [{
                "filename": format!("receipt-{}.pdf", receipt_number),
                "content": base64.encode(pdf_bytes),
            }],
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Email API error: {}", e)))?;

        if response.status().is_success() {
            info!("Receipt {} emailed to {}", receipt_number, to);
            Ok(())
        } else {
            Err(AppError::ExternalApi(format!(
                "Email sending failed with status: {}",
                response.status()
            )))
        }
    }
}
