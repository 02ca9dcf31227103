use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{info, warn};

use crate::errors::Result;
use crate::models::payment::Payment;
use crate::models::receipt::Receipt;
use crate::models::user::User;

pub async fn get_db_client(database_url: &str, database_name: &str) -> Database {
    let client = Client::with_uri_str(database_url)
        .await
        .expect("Failed to connect to MongoDB");

    let db = client.database(database_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            info!("✅ Connected to database: {}", database_name);
            info!("📂 Collections found: {:?}", collections);
        }
        Err(e) => {
            warn!(
                "⚠️ Database '{}' may not exist or is inaccessible: {}",
                database_name, e
            );
        }
    }

    db
}

/// Creates the indexes the write paths lean on: unique customer emails,
/// globally unique receipt numbers, and at most one receipt per payment.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let unique = IndexOptions::builder().unique(true).build();

    let users: Collection<User> = db.collection("users");
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    let receipts: Collection<Receipt> = db.collection("receipts");
    receipts
        .create_index(
            IndexModel::builder()
                .keys(doc! { "receipt_number": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;
    receipts
        .create_index(
            IndexModel::builder()
                .keys(doc! { "payment_id": 1 })
                .options(unique)
                .build(),
        )
        .await?;

    let payments: Collection<Payment> = db.collection("payments");
    payments
        .create_index(
            IndexModel::builder()
                .keys(doc! { "razorpay_order_id": 1 })
                .build(),
        )
        .await?;
    payments
        .create_index(IndexModel::builder().keys(doc! { "status": 1 }).build())
        .await?;

    info!("✅ Database indexes ensured");
    Ok(())
}
