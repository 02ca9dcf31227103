// handlers/admin_handlers.rs
use axum::extract::{Query, State};
use axum::Json;
use futures_util::TryStreamExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::bson::{doc, Document};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::models::user::Claims;
use crate::money::{format_inr, Paise};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const TOKEN_TTL_SECS: usize = 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

fn page_params(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

/// Aggregation sums come back as whatever numeric type Mongo picked.
fn doc_amount(doc: &Document, key: &str) -> i64 {
    doc.get_i64(key)
        .or_else(|_| doc.get_i32(key).map(i64::from))
        .or_else(|_| doc.get_f64(key).map(|v| v as i64))
        .unwrap_or(0)
}

/// The search string goes into a $regex filter verbatim otherwise.
fn regex_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if r"\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// POST /api/admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<Value>> {
    let valid = bcrypt::verify(&request.password, &state.admin_password_hash)
        .map_err(|_| AppError::AuthError)?;
    if !valid {
        warn!("Admin login rejected");
        return Err(AppError::AuthError);
    }

    let claims = Claims {
        sub: "admin".to_string(),
        role: "admin".to_string(),
        exp: (chrono::Utc::now().timestamp() as usize) + TOKEN_TTL_SECS,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|_| AppError::AuthError)?;

    info!("Admin login issued");
    Ok(Json(json!({
        "success": true,
        "token": token,
        "expiresIn": TOKEN_TTL_SECS,
    })))
}

/// GET /api/admin/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let payments: Collection<Document> = state.db.collection("payments");
    let receipts: Collection<Document> = state.db.collection("receipts");
    let users: Collection<Document> = state.db.collection("users");

    let total_payments = payments.count_documents(doc! {}).await?;
    let successful_payments = payments.count_documents(doc! { "status": "success" }).await?;
    let total_receipts = receipts.count_documents(doc! {}).await?;
    let total_users = users.count_documents(doc! {}).await?;

    let revenue_pipeline = vec![
        doc! { "$match": { "status": "success" } },
        doc! { "$group": { "_id": null, "total": { "$sum": "$amount" } } },
    ];
    let rows: Vec<Document> = payments
        .aggregate(revenue_pipeline)
        .await?
        .try_collect()
        .await?;
    let total_revenue = rows
        .first()
        .map(|row| Paise(doc_amount(row, "total")))
        .unwrap_or(Paise(0));

    let success_rate = if total_payments > 0 {
        (successful_payments as f64 / total_payments as f64) * 100.0
    } else {
        0.0
    };

    let recent_pipeline = vec![
        doc! { "$sort": { "created_at": -1 } },
        doc! { "$limit": 10 },
        doc! { "$lookup": {
            "from": "users",
            "localField": "user_id",
            "foreignField": "_id",
            "as": "user",
        }},
        doc! { "$unwind": { "path": "$user", "preserveNullAndEmptyArrays": true } },
    ];
    let recent_rows: Vec<Document> = payments
        .aggregate(recent_pipeline)
        .await?
        .try_collect()
        .await?;
    let recent_payments: Vec<Value> = recent_rows.iter().map(recent_payment_row).collect();

    let monthly_pipeline = vec![
        doc! { "$match": { "status": "success" } },
        doc! { "$group": {
            "_id": {
                "year": { "$year": "$created_at" },
                "month": { "$month": "$created_at" },
            },
            "count": { "$sum": 1 },
            "revenue": { "$sum": "$amount" },
        }},
        doc! { "$sort": { "_id.year": 1, "_id.month": 1 } },
    ];
    let monthly_rows: Vec<Document> = payments
        .aggregate(monthly_pipeline)
        .await?
        .try_collect()
        .await?;
    let monthly_stats: Vec<Value> = monthly_rows.iter().map(monthly_row).collect();

    Ok(Json(json!({
        "success": true,
        "stats": {
            "overview": {
                "totalPayments": total_payments,
                "successfulPayments": successful_payments,
                "totalReceipts": total_receipts,
                "totalUsers": total_users,
                "totalRevenue": total_revenue.as_rupees(),
                "totalRevenueFormatted": format_inr(total_revenue),
                "successRate": (success_rate * 100.0).round() / 100.0,
            },
            "recentPayments": recent_payments,
            "monthlyStats": monthly_stats,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        },
    })))
}

fn recent_payment_row(row: &Document) -> Value {
    let amount = Paise(doc_amount(row, "amount"));
    let user = row.get_document("user").ok();

    json!({
        "id": row.get_object_id("_id").map(|id| id.to_hex()).unwrap_or_default(),
        "userName": user.and_then(|u| u.get_str("name").ok()).unwrap_or("Unknown"),
        "email": user.and_then(|u| u.get_str("email").ok()).unwrap_or(""),
        "amount": amount.as_rupees(),
        "amountFormatted": format_inr(amount),
        "status": row.get_str("status").unwrap_or(""),
        "paymentMode": row.get_str("payment_mode").unwrap_or(""),
        "createdAt": row
            .get_datetime("created_at")
            .map(|dt| dt.to_chrono().to_rfc3339())
            .unwrap_or_default(),
    })
}

fn monthly_row(row: &Document) -> Value {
    let id = row.get_document("_id").ok();
    let revenue = Paise(doc_amount(row, "revenue"));

    json!({
        "year": id.and_then(|d| d.get_i32("year").ok()).unwrap_or(0),
        "month": id.and_then(|d| d.get_i32("month").ok()).unwrap_or(0),
        "count": doc_amount(row, "count"),
        "revenue": revenue.as_rupees(),
        "revenueFormatted": format_inr(revenue),
    })
}

/// GET /api/admin/receipts
pub async fn get_receipts(
    State(state): State<AppState>,
    Query(query): Query<ReceiptListQuery>,
) -> Result<Json<Value>> {
    let (page, limit, skip) = page_params(query.page, query.limit);

    let mut filter = doc! {};
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        filter.insert(
            "receipt_number",
            doc! { "$regex": regex_escape(search), "$options": "i" },
        );
    }

    let receipts: Collection<Document> = state.db.collection("receipts");
    let total_count = receipts.count_documents(filter.clone()).await? as i64;
    let total_pages = if total_count == 0 {
        0
    } else {
        (total_count + limit - 1) / limit
    };

    let pipeline = vec![
        doc! { "$match": filter },
        doc! { "$sort": { "generated_at": -1 } },
        doc! { "$skip": skip },
        doc! { "$limit": limit },
        doc! { "$lookup": {
            "from": "payments",
            "localField": "payment_id",
            "foreignField": "_id",
            "as": "payment",
        }},
        doc! { "$unwind": { "path": "$payment", "preserveNullAndEmptyArrays": true } },
        doc! { "$lookup": {
            "from": "users",
            "localField": "payment.user_id",
            "foreignField": "_id",
            "as": "user",
        }},
        doc! { "$unwind": { "path": "$user", "preserveNullAndEmptyArrays": true } },
    ];
    let rows: Vec<Document> = receipts.aggregate(pipeline).await?.try_collect().await?;
    let items: Vec<Value> = rows.iter().map(receipt_row).collect();

    Ok(Json(json!({
        "success": true,
        "receipts": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "totalCount": total_count,
            "totalPages": total_pages,
            "hasNext": page < total_pages,
            "hasPrevious": page > 1,
        },
    })))
}

fn receipt_row(row: &Document) -> Value {
    let payment = row.get_document("payment").ok();
    let user = row.get_document("user").ok();
    let amount = Paise(payment.map(|p| doc_amount(p, "amount")).unwrap_or(0));

    json!({
        "id": row.get_object_id("_id").map(|id| id.to_hex()).unwrap_or_default(),
        "receiptNumber": row.get_str("receipt_number").unwrap_or(""),
        "paymentId": row
            .get_object_id("payment_id")
            .map(|id| id.to_hex())
            .unwrap_or_default(),
        "generatedAt": row
            .get_datetime("generated_at")
            .map(|dt| dt.to_chrono().to_rfc3339())
            .unwrap_or_default(),
        "amount": amount.as_rupees(),
        "amountFormatted": format_inr(amount),
        "paymentMode": payment.and_then(|p| p.get_str("payment_mode").ok()).unwrap_or(""),
        "status": payment.and_then(|p| p.get_str("status").ok()).unwrap_or(""),
        "customerName": user.and_then(|u| u.get_str("name").ok()).unwrap_or("Unknown"),
        "customerEmail": user.and_then(|u| u.get_str("email").ok()).unwrap_or(""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(page_params(None, None), (1, DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_params(Some(0), Some(1000)), (1, MAX_PAGE_SIZE, 0));
        assert_eq!(page_params(Some(-3), Some(0)), (1, 1, 0));
        assert_eq!(page_params(Some(3), Some(10)), (3, 10, 20));
    }

    #[test]
    fn escapes_regex_metacharacters() {
        assert_eq!(regex_escape("AKRX-2025"), "AKRX-2025");
        assert_eq!(regex_escape("a.b*c"), r"a\.b\*c");
        assert_eq!(regex_escape("(x)|[y]"), r"\(x\)\|\[y\]");
    }

    #[test]
    fn reads_amounts_of_any_numeric_type() {
        assert_eq!(doc_amount(&doc! { "total": 150000_i64 }, "total"), 150000);
        assert_eq!(doc_amount(&doc! { "total": 42_i32 }, "total"), 42);
        assert_eq!(doc_amount(&doc! { "total": 99.0_f64 }, "total"), 99);
        assert_eq!(doc_amount(&doc! {}, "total"), 0);
    }
}
