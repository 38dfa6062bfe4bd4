use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub transaction_code: String,
    pub user_id: i64,
    pub kasir_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub item_count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TransactionItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}
