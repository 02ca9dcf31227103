use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// A customer record. Created on first payment initiation and keyed by
/// email; later submissions with the same email update the mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Reduces a phone number to its ten-digit Indian form, accepting the
/// common "+91" and leading-zero spellings. Returns None when the digits
/// cannot form a ten-digit number.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    let digits = if digits.len() == 12 && digits.starts_with("91") {
        digits[2..].to_string()
    } else if digits.len() == 11 && digits.starts_with('0') {
        digits[1..].to_string()
    } else {
        digits
    };

    (digits.len() == 10).then_some(digits)
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    match normalize_phone(phone) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("phone")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ten_digit_numbers() {
        assert_eq!(normalize_phone("9876543210"), Some("9876543210".to_string()));
    }

    #[test]
    fn strips_country_code_and_separators() {
        assert_eq!(normalize_phone("+91 98765 43210"), Some("9876543210".to_string()));
        assert_eq!(normalize_phone("09876543210"), Some("9876543210".to_string()));
        assert_eq!(normalize_phone("98765-43210"), Some("9876543210".to_string()));
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("987654321012345"), None);
        assert_eq!(normalize_phone(""), None);
    }
}
