// config.rs
use std::env;

/// Every environment read lives here; the rest of the app gets its
/// configuration through this struct or through AppState.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub admin_password_hash: String,
    pub upload_dir: String,
    pub receipt_prefix: String,
    pub branding: BrandingConfig,
    pub upi: UpiConfig,
    pub razorpay: Option<RazorpayConfig>,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone)]
pub struct BrandingConfig {
    pub business_name: String,
    pub tagline: String,
    pub business_email: String,
}

#[derive(Debug, Clone)]
pub struct UpiConfig {
    pub upi_id: String,
    pub qr_image_url: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Gateway checkout and email dispatch are optional; the routes they
        // back answer 503 when the credentials are absent.
        let razorpay = match (env::var("RAZORPAY_KEY_ID"), env::var("RAZORPAY_KEY_SECRET")) {
            (Ok(key_id), Ok(key_secret)) => Some(RazorpayConfig {
                key_id,
                key_secret,
                base_url: env::var("RAZORPAY_BASE_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            }),
            _ => None,
        };

        let email = match (env::var("EMAIL_API_URL"), env::var("EMAIL_API_KEY")) {
            (Ok(api_url), Ok(api_key)) => Some(EmailConfig {
                api_url,
                api_key,
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "receipts@akrix.ai".to_string()),
            }),
            _ => None,
        };

        AppConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("PORT must be a number"),
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "akrixdb".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            admin_password_hash: env::var("ADMIN_PASSWORD_HASH")
                .expect("ADMIN_PASSWORD_HASH must be set"),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            receipt_prefix: env::var("RECEIPT_PREFIX").unwrap_or_else(|_| "AKRX".to_string()),
            branding: BrandingConfig {
                business_name: env::var("BUSINESS_NAME")
                    .unwrap_or_else(|_| "Akrix.ai".to_string()),
                tagline: env::var("BUSINESS_TAGLINE")
                    .unwrap_or_else(|_| "Algorithms with Ambition".to_string()),
                business_email: env::var("BUSINESS_EMAIL")
                    .unwrap_or_else(|_| "akrix.ai@gmail.com".to_string()),
            },
            upi: UpiConfig {
                upi_id: env::var("UPI_ID").unwrap_or_else(|_| "akrix@upi".to_string()),
                qr_image_url: env::var("QR_IMAGE_URL")
                    .unwrap_or_else(|_| "/qr-code.png".to_string()),
            },
            razorpay,
            email,
        }
    }
}
