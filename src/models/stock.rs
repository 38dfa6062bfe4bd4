use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockLevel {
    pub product_id: i64,
    pub product_name: String,
    pub category_name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub current_stock: i32,
    pub min_stock: i32,
    pub stock_in: i32,
    pub stock_out: i32,
    pub is_low: bool,
    pub last_updated: DateTime<Utc>,
}
