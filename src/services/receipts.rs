// services/receipts.rs
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::models::payment::{Payment, PaymentStatus};
use crate::models::receipt::{Counter, Receipt, ReceiptData};
use crate::models::user::User;

/// Builds the per-day counter key, e.g. "AKRX-20250108".
pub(crate) fn day_key(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, now.format("%Y%m%d"))
}

/// Issues receipt numbers and owns the receipts collection. Numbers are
/// "{prefix}-{YYYYMMDD}-{NNNN}", allocated through an atomic counter
/// upsert so concurrent requests never collide.
#[derive(Clone)]
pub struct ReceiptService {
    db: Database,
    prefix: String,
}

impl ReceiptService {
    pub fn new(db: Database, prefix: String) -> Self {
        ReceiptService { db, prefix }
    }

    fn receipts(&self) -> Collection<Receipt> {
        self.db.collection("receipts")
    }

    async fn next_receipt_number(&self) -> Result<String> {
        let counters: Collection<Counter> = self.db.collection("counters");
        let key = day_key(&self.prefix, Utc::now());

        let counter = counters
            .find_one_and_update(doc! { "_id": &key }, doc! { "$inc": { "seq": 1 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::service("Counter upsert returned no document"))?;

        Ok(format!("{}-{:04}", key, counter.seq))
    }

    /// Creates the receipt for a successful payment, or returns the one
    /// that already exists. A payment gets at most one receipt; the unique
    /// index on payment_id backs that up under concurrent verification.
    pub async fn create_for_payment(&self, payment_id: ObjectId) -> Result<Receipt> {
        if let Some(existing) = self.find_by_payment(payment_id).await? {
            return Ok(existing);
        }

        let payments: Collection<Payment> = self.db.collection("payments");
        let payment = payments
            .find_one(doc! { "_id": payment_id })
            .await?
            .ok_or(AppError::PaymentNotFound)?;

        if payment.status != PaymentStatus::Success {
            return Err(AppError::PaymentSettled(format!(
                "Cannot generate receipt for a {} payment",
                payment.status.as_str()
            )));
        }

        let receipt = Receipt {
            id: Some(ObjectId::new()),
            payment_id,
            receipt_number: self.next_receipt_number().await?,
            generated_at: Utc::now(),
        };

        match self.receipts().insert_one(&receipt).await {
            Ok(_) => {
                info!("🧾 Receipt {} issued for payment {}", receipt.receipt_number, payment_id);
                Ok(receipt)
            }
            Err(err) if is_duplicate_key(&err) => {
                // Lost the race to a concurrent verify; the winner's receipt stands.
                warn!("Duplicate receipt insert for payment {}, reusing existing", payment_id);
                self.find_by_payment(payment_id)
                    .await?
                    .ok_or_else(|| AppError::service("Receipt vanished after duplicate key"))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Looks up a receipt by its own id first, then by the id of the
    /// payment it belongs to. Callers hold one Mongo id and should not
    /// need to care which collection it came from.
    pub async fn resolve_receipt(&self, id: &str) -> Result<Receipt> {
        let oid = ObjectId::parse_str(id)?;

        if let Some(receipt) = self.receipts().find_one(doc! { "_id": oid }).await? {
            return Ok(receipt);
        }
        if let Some(receipt) = self.find_by_payment(oid).await? {
            return Ok(receipt);
        }
        Err(AppError::ReceiptNotFound)
    }

    pub async fn find_by_payment(&self, payment_id: ObjectId) -> Result<Option<Receipt>> {
        Ok(self
            .receipts()
            .find_one(doc! { "payment_id": payment_id })
            .await?)
    }

    /// Joins the receipt with its payment and customer for rendering.
    pub async fn load_data(&self, receipt: Receipt) -> Result<ReceiptData> {
        let payments: Collection<Payment> = self.db.collection("payments");
        let payment = payments
            .find_one(doc! { "_id": receipt.payment_id })
            .await?
            .ok_or(AppError::PaymentNotFound)?;

        let users: Collection<User> = self.db.collection("users");
        let user = users
            .find_one(doc! { "_id": payment.user_id })
            .await?
            .ok_or(AppError::DocumentNotFound)?;

        Ok(ReceiptData {
            receipt,
            payment,
            user,
        })
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_key_uses_prefix_and_compact_date() {
        let at = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 0).unwrap();
        assert_eq!(day_key("AKRX", at), "AKRX-20250108");
    }

    #[test]
    fn day_key_rolls_over_at_utc_midnight() {
        let before = Utc.with_ymd_and_hms(2025, 1, 8, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap();
        assert_ne!(day_key("AKRX", before), day_key("AKRX", after));
    }

    #[test]
    fn receipt_numbers_are_zero_padded_to_four_digits() {
        let at = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 0).unwrap();
        let key = day_key("AKRX", at);
        assert_eq!(format!("{}-{:04}", key, 1), "AKRX-20250108-0001");
        assert_eq!(format!("{}-{:04}", key, 42), "AKRX-20250108-0042");
        assert_eq!(format!("{}-{:04}", key, 12345), "AKRX-20250108-12345");
    }
}
