//! Stock ledger, movement log and sale persistence behind one storage seam.
//!
//! Handlers and the [`recorder`] only ever talk to [`InventoryStore`]; the
//! production backend is [`postgres::PgInventory`]. Every mutation happens
//! inside a [`StockUnit`], which either commits as a whole or, when dropped
//! without [`StockUnit::commit`], leaves the store untouched.

pub mod postgres;
pub mod recorder;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Money columns are `NUMERIC(14,2)`: cents, below one trillion.
pub const MONEY_SCALE: u32 = 2;
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Checks that `amount` fits a money column without rounding.
pub fn check_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        Err("cannot be negative")
    } else if amount.normalize().scale() > MONEY_SCALE {
        Err("cannot have more than two decimal places")
    } else if amount >= AMOUNT_LIMIT {
        Err("is too large")
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_reason", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementReason {
    Manual,
    Transaction,
}

/// One product's ledger row, joined with the catalog fields the recorder needs.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StockEntry {
    pub product_id: i64,
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub is_active: bool,
    pub current_stock: i32,
    pub min_stock: i32,
    pub stock_in: i32,
    pub stock_out: i32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub code: String,
    pub user_id: i64,
    pub total_amount: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub product_id: i64,
    pub direction: MovementDirection,
    pub quantity: i32,
    pub reason: MovementReason,
    pub reference_id: Option<i64>,
    pub user_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no stock entry for product {0}")]
    MissingEntry(i64),
    #[error("product {product_id} has only {available} units in stock")]
    StockConflict { product_id: i64, available: i32 },
    #[error("transaction code {0} is already taken")]
    DuplicateCode(String),
    #[error("unit of work is already committed")]
    Finished,
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Ledger lookup (`getEntry`). Reads outside any unit of work.
    async fn stock_entry(&self, product_id: i64) -> Result<Option<StockEntry>, StoreError>;

    /// Opens an atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn StockUnit>, StoreError>;

    /// Soft-deletes a product so it can no longer be sold. Its ledger row and
    /// history stay. Returns `false` when no active product has that id.
    async fn retire_product(&self, product_id: i64) -> Result<bool, StoreError>;
}

/// Writes that become visible together on [`StockUnit::commit`].
#[async_trait]
pub trait StockUnit: Send {
    async fn insert_transaction(&mut self, header: &NewTransaction) -> Result<i64, StoreError>;

    async fn insert_line_item(&mut self, transaction_id: i64, item: &NewLineItem) -> Result<i64, StoreError>;

    /// Removes `quantity` units. Fails with [`StoreError::StockConflict`]
    /// rather than letting stock drop below zero. Locks the ledger row until
    /// the unit ends, so callers decrement in ascending `product_id` order.
    async fn decrement(&mut self, product_id: i64, quantity: i32) -> Result<(), StoreError>;

    async fn increment(&mut self, product_id: i64, quantity: i32) -> Result<StockEntry, StoreError>;

    /// Appends to the movement log. There is no update or delete counterpart.
    async fn append_movement(&mut self, movement: &NewMovement) -> Result<i64, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;
}
