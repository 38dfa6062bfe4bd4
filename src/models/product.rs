use sqlx::FromRow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Catalog row joined with its ledger entry. Stock is read from `stock`,
/// never stored on the product.
#[derive(Debug, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub price: Decimal,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub current_stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub created_at: DateTime<Utc>,
}
