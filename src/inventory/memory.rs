// src/inventory/memory.rs
//! In-process store used by the unit and router tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{InventoryStore, NewLineItem, NewMovement, NewTransaction, StockEntry, StockUnit, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTransaction {
    pub id: i64,
    pub header: NewTransaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredLineItem {
    pub id: i64,
    pub transaction_id: i64,
    pub item: NewLineItem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMovement {
    pub id: i64,
    pub movement: NewMovement,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entries: BTreeMap<i64, StockEntry>,
    pub transactions: Vec<StoredTransaction>,
    pub line_items: Vec<StoredLineItem>,
    pub movements: Vec<StoredMovement>,
}

#[derive(Default)]
struct Faults {
    fail_movements: AtomicBool,
    duplicate_codes: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryInventory {
    state: Arc<Mutex<Snapshot>>,
    faults: Arc<Faults>,
    // When set, `stock_entry` answers from this frozen copy.
    pinned_reads: Arc<Mutex<Option<Snapshot>>>,
    // Every decrement attempted, committed or not, in call order.
    decrements: Arc<Mutex<Vec<i64>>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product with `stock` units already received.
    pub async fn add_product(&self, product_id: i64, name: &str, price: Decimal, stock: i32) {
        let mut state = self.state.lock().await;
        state.entries.insert(
            product_id,
            StockEntry {
                product_id,
                product_name: name.to_string(),
                price,
                is_active: true,
                current_stock: stock,
                min_stock: 0,
                stock_in: stock,
                stock_out: 0,
                last_updated: Utc::now(),
            },
        );
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.clone()
    }

    pub fn fail_movement_appends(&self, fail: bool) {
        self.faults.fail_movements.store(fail, Ordering::SeqCst);
    }

    /// The next `count` header inserts report a taken transaction code.
    pub fn reject_codes(&self, count: usize) {
        self.faults.duplicate_codes.store(count, Ordering::SeqCst);
    }

    /// Freezes what `stock_entry` sees, simulating a validation read that
    /// goes stale before the write.
    pub async fn pin_reads(&self) {
        let current = self.snapshot().await;
        *self.pinned_reads.lock().await = Some(current);
    }

    /// Product ids passed to `decrement`, in the order units asked for them.
    pub async fn decrement_order(&self) -> Vec<i64> {
        self.decrements.lock().await.clone()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn stock_entry(&self, product_id: i64) -> Result<Option<StockEntry>, StoreError> {
        if let Some(pinned) = self.pinned_reads.lock().await.as_ref() {
            return Ok(pinned.entries.get(&product_id).cloned());
        }
        Ok(self.state.lock().await.entries.get(&product_id).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn StockUnit>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnit {
            guard,
            staged,
            faults: self.faults.clone(),
            decrements: self.decrements.clone(),
            finished: false,
        }))
    }

    async fn retire_product(&self, product_id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.entries.get_mut(&product_id) {
            Some(entry) if entry.is_active => {
                entry.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Holds the store lock for its whole lifetime, so units run one at a time.
struct MemoryUnit {
    guard: OwnedMutexGuard<Snapshot>,
    staged: Snapshot,
    faults: Arc<Faults>,
    decrements: Arc<Mutex<Vec<i64>>>,
    finished: bool,
}

impl MemoryUnit {
    fn staged(&mut self) -> Result<&mut Snapshot, StoreError> {
        if self.finished {
            return Err(StoreError::Finished);
        }
        Ok(&mut self.staged)
    }
}

#[async_trait]
impl StockUnit for MemoryUnit {
    async fn insert_transaction(&mut self, header: &NewTransaction) -> Result<i64, StoreError> {
        let taken = self
            .faults
            .duplicate_codes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let staged = self.staged()?;
        if taken || staged.transactions.iter().any(|t| t.header.code == header.code) {
            return Err(StoreError::DuplicateCode(header.code.clone()));
        }
        let id = staged.transactions.len() as i64 + 1;
        staged.transactions.push(StoredTransaction { id, header: header.clone() });
        Ok(id)
    }

    async fn insert_line_item(&mut self, transaction_id: i64, item: &NewLineItem) -> Result<i64, StoreError> {
        let staged = self.staged()?;
        let id = staged.line_items.len() as i64 + 1;
        staged.line_items.push(StoredLineItem { id, transaction_id, item: item.clone() });
        Ok(id)
    }

    async fn decrement(&mut self, product_id: i64, quantity: i32) -> Result<(), StoreError> {
        self.decrements.lock().await.push(product_id);
        let entry = self
            .staged()?
            .entries
            .get_mut(&product_id)
            .ok_or(StoreError::MissingEntry(product_id))?;
        if entry.current_stock < quantity {
            return Err(StoreError::StockConflict { product_id, available: entry.current_stock });
        }
        entry.current_stock -= quantity;
        entry.stock_out += quantity;
        entry.last_updated = Utc::now();
        Ok(())
    }

    async fn increment(&mut self, product_id: i64, quantity: i32) -> Result<StockEntry, StoreError> {
        let entry = self
            .staged()?
            .entries
            .get_mut(&product_id)
            .ok_or(StoreError::MissingEntry(product_id))?;
        entry.current_stock += quantity;
        entry.stock_in += quantity;
        entry.last_updated = Utc::now();
        Ok(entry.clone())
    }

    async fn append_movement(&mut self, movement: &NewMovement) -> Result<i64, StoreError> {
        if self.faults.fail_movements.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("movement log unavailable".into()));
        }
        let staged = self.staged()?;
        let id = staged.movements.len() as i64 + 1;
        staged.movements.push(StoredMovement { id, movement: movement.clone() });
        Ok(id)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(self.staged()?);
        *self.guard = staged;
        self.finished = true;
        Ok(())
    }
}
