use mongodb::Database;
use std::sync::Arc;

use crate::config::{AppConfig, BrandingConfig, UpiConfig};
use crate::services::email::EmailService;
use crate::services::pdf::PdfService;
use crate::services::razorpay::RazorpayService;
use crate::services::receipts::ReceiptService;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub receipts: ReceiptService,
    pub pdf: PdfService,
    pub razorpay: Option<Arc<RazorpayService>>,
    pub email: Option<Arc<EmailService>>,
    pub jwt_secret: String,
    pub admin_password_hash: String,
    pub branding: BrandingConfig,
    pub upi: UpiConfig,
    pub upload_dir: String,
}

impl AppState {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        AppState {
            receipts: ReceiptService::new(db.clone(), config.receipt_prefix.clone()),
            pdf: PdfService::new(config.branding.clone()),
            db,
            razorpay: None,
            email: None,
            jwt_secret: config.jwt_secret.clone(),
            admin_password_hash: config.admin_password_hash.clone(),
            branding: config.branding.clone(),
            upi: config.upi.clone(),
            upload_dir: config.upload_dir.clone(),
        }
    }

    pub fn with_razorpay(mut self, razorpay: Arc<RazorpayService>) -> Self {
        self.razorpay = Some(razorpay);
        self
    }

    pub fn with_email(mut self, email: Arc<EmailService>) -> Self {
        self.email = Some(email);
        self
    }
}
