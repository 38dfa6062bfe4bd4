// src/inventory/postgres.rs
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::{InventoryStore, NewLineItem, NewMovement, NewTransaction, StockEntry, StockUnit, StoreError};

#[derive(Clone)]
pub struct PgInventory {
    pool: PgPool,
}

impl PgInventory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventory {
    async fn stock_entry(&self, product_id: i64) -> Result<Option<StockEntry>, StoreError> {
        let entry = sqlx::query_as::<_, StockEntry>(
            "SELECT s.product_id, p.name AS product_name, p.price, p.is_active,
                    s.current_stock, s.min_stock, s.stock_in, s.stock_out, s.last_updated
             FROM stock s
             JOIN products p ON p.id = s.product_id
             WHERE s.product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn begin(&self) -> Result<Box<dyn StockUnit>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx: Some(tx) }))
    }

    async fn retire_product(&self, product_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// A database transaction. Dropping it uncommitted rolls it back.
pub struct PgUnit {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnit {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx.as_deref_mut().ok_or(StoreError::Finished)
    }
}

#[async_trait]
impl StockUnit for PgUnit {
    async fn insert_transaction(&mut self, header: &NewTransaction) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO transactions (transaction_code, user_id, total_amount, payment_method, notes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(&header.code)
        .bind(header.user_id)
        .bind(header.total_amount)
        .bind(&header.payment_method)
        .bind(&header.notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            let duplicate = e.as_database_error().and_then(|d| d.code()).as_deref() == Some("23505");
            if duplicate {
                StoreError::DuplicateCode(header.code.clone())
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn insert_line_item(&mut self, transaction_id: i64, item: &NewLineItem) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO transaction_items (transaction_id, product_id, quantity, unit_price, subtotal)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(transaction_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    async fn decrement(&mut self, product_id: i64, quantity: i32) -> Result<(), StoreError> {
        let conn = self.conn()?;

        // Check-and-set in one statement; the row lock serializes racing sales.
        let result = sqlx::query(
            "UPDATE stock
             SET current_stock = current_stock - $1,
                 stock_out = stock_out + $1,
                 last_updated = NOW()
             WHERE product_id = $2 AND current_stock >= $1",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let available = sqlx::query_scalar::<_, i32>("SELECT current_stock FROM stock WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

        Err(match available {
            Some(available) => StoreError::StockConflict { product_id, available },
            None => StoreError::MissingEntry(product_id),
        })
    }

    async fn increment(&mut self, product_id: i64, quantity: i32) -> Result<StockEntry, StoreError> {
        let conn = self.conn()?;
        sqlx::query_as::<_, StockEntry>(
            "WITH updated AS (
                 UPDATE stock
                 SET current_stock = current_stock + $1,
                     stock_in = stock_in + $1,
                     last_updated = NOW()
                 WHERE product_id = $2
                 RETURNING product_id, current_stock, min_stock, stock_in, stock_out, last_updated
             )
             SELECT u.product_id, p.name AS product_name, p.price, p.is_active,
                    u.current_stock, u.min_stock, u.stock_in, u.stock_out, u.last_updated
             FROM updated u
             JOIN products p ON p.id = u.product_id",
        )
        .bind(quantity)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::MissingEntry(product_id))
    }

    async fn append_movement(&mut self, movement: &NewMovement) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO stock_movements
                 (product_id, movement_type, quantity, reference_type, reference_id, user_id, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(movement.product_id)
        .bind(movement.direction)
        .bind(movement.quantity)
        .bind(movement.reason)
        .bind(movement.reference_id)
        .bind(movement.user_id)
        .bind(&movement.notes)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await?;
        Ok(())
    }
}
