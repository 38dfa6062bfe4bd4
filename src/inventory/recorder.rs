// src/inventory/recorder.rs
//! Point-of-sale checkout and stock receiving.
//!
//! A sale is validated against the ledger for the whole cart before anything
//! is written; the writes themselves (header, line items, decrements,
//! movements) run in a single [`StockUnit`]. The ledger's conditional
//! decrement is what keeps stock from going negative when two carts race for
//! the same product, so a stale validation read costs a rejected sale, never
//! an oversell.
//!
//! Amounts are exact [`Decimal`] cents end to end; a price the money columns
//! would have to round is rejected up front.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use super::{
    check_amount, InventoryStore, MovementDirection, MovementReason, NewLineItem, NewMovement,
    NewTransaction, StockEntry, StoreError, AMOUNT_LIMIT,
};

pub const DEFAULT_PAYMENT_METHOD: &str = "cash";
const CODE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
    /// Falls back to the catalog price when omitted.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub items: Vec<CartLine>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuotedLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// A validated cart with its totals. Produced without touching the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CartQuote {
    pub total_amount: Decimal,
    pub lines: Vec<QuotedLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSale {
    pub transaction_id: i64,
    pub transaction_code: String,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct StockReceipt {
    pub product_id: i64,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Transaction items are required")]
    EmptyCart,
    #[error("{0}")]
    InvalidLine(String),
    #[error("Product with ID {0} not found")]
    ProductNotFound(i64),
    #[error("Product {name} (ID {product_id}) is not active")]
    InactiveProduct { product_id: i64, name: String },
    #[error("Insufficient stock for product {name} (ID {product_id}). Remaining stock: {available}")]
    InsufficientStock { product_id: i64, name: String, available: i32 },
    #[error("Failed to persist stock change")]
    Persistence(#[source] StoreError),
}

/// Validates `items` against current stock and prices them. Never writes.
#[instrument(skip(store, items), fields(lines = items.len()))]
pub async fn validate_sale(store: &dyn InventoryStore, items: &[CartLine]) -> Result<CartQuote, RecordError> {
    if items.is_empty() {
        return Err(RecordError::EmptyCart);
    }

    let mut entries: HashMap<i64, StockEntry> = HashMap::new();
    let mut requested: HashMap<i64, i64> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity <= 0 {
            return Err(RecordError::InvalidLine(format!(
                "Quantity for product {} must be greater than 0",
                item.product_id
            )));
        }
        if let Some(price) = item.unit_price {
            check_amount(price).map_err(|problem| {
                RecordError::InvalidLine(format!("Unit price for product {} {problem}", item.product_id))
            })?;
        }

        if !entries.contains_key(&item.product_id) {
            let entry = store
                .stock_entry(item.product_id)
                .await
                .map_err(RecordError::Persistence)?
                .ok_or(RecordError::ProductNotFound(item.product_id))?;
            entries.insert(item.product_id, entry);
        }
        let entry = &entries[&item.product_id];

        if !entry.is_active {
            return Err(RecordError::InactiveProduct {
                product_id: entry.product_id,
                name: entry.product_name.clone(),
            });
        }

        // Repeated lines for one product draw on the same stock.
        let wanted = requested.entry(item.product_id).or_default();
        *wanted += i64::from(item.quantity);
        if *wanted > i64::from(entry.current_stock) {
            return Err(RecordError::InsufficientStock {
                product_id: entry.product_id,
                name: entry.product_name.clone(),
                available: entry.current_stock,
            });
        }

        let unit_price = item.unit_price.unwrap_or(entry.price);
        let subtotal = unit_price
            .checked_mul(Decimal::from(item.quantity))
            .filter(|subtotal| *subtotal < AMOUNT_LIMIT)
            .ok_or_else(|| {
                RecordError::InvalidLine(format!("Subtotal for product {} is too large", item.product_id))
            })?;
        lines.push(QuotedLine {
            product_id: item.product_id,
            product_name: entry.product_name.clone(),
            quantity: item.quantity,
            unit_price,
            subtotal,
        });
    }

    let total_amount = lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| {
            total.checked_add(line.subtotal).filter(|total| *total < AMOUNT_LIMIT)
        })
        .ok_or_else(|| RecordError::InvalidLine("Transaction total is too large".to_string()))?;
    Ok(CartQuote { total_amount, lines })
}

/// Records a sale for `acting_user`. Either every write lands or none does.
#[instrument(skip(store, request), fields(user_id = acting_user, lines = request.items.len()))]
pub async fn record_sale(
    store: &dyn InventoryStore,
    request: SaleRequest,
    acting_user: i64,
) -> Result<RecordedSale, RecordError> {
    let quote = validate_sale(store, &request.items).await?;

    let payment_method = request
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_METHOD)
        .to_string();

    let mut attempt = 0;
    loop {
        attempt += 1;
        let header = NewTransaction {
            code: generate_transaction_code(),
            user_id: acting_user,
            total_amount: quote.total_amount,
            payment_method: payment_method.clone(),
            notes: request.notes.clone(),
        };

        match persist_sale(store, &header, &quote).await {
            Ok(transaction_id) => {
                info!(
                    transaction_id,
                    code = %header.code,
                    lines = quote.lines.len(),
                    total = %quote.total_amount,
                    "Transaction recorded"
                );
                return Ok(RecordedSale {
                    transaction_id,
                    transaction_code: header.code,
                    total_amount: quote.total_amount,
                });
            }
            Err(StoreError::DuplicateCode(code)) if attempt < CODE_ATTEMPTS => {
                warn!(%code, attempt, "Transaction code collision, retrying");
            }
            Err(StoreError::StockConflict { product_id, available }) => {
                warn!(product_id, available, "Stock changed after validation, sale rolled back");
                let name = quote
                    .lines
                    .iter()
                    .find(|l| l.product_id == product_id)
                    .map(|l| l.product_name.clone())
                    .unwrap_or_default();
                return Err(RecordError::InsufficientStock { product_id, name, available });
            }
            Err(StoreError::MissingEntry(product_id)) => {
                return Err(RecordError::ProductNotFound(product_id));
            }
            Err(e) => {
                error!(error = %e, "Transaction rolled back");
                return Err(RecordError::Persistence(e));
            }
        }
    }
}

async fn persist_sale(store: &dyn InventoryStore, header: &NewTransaction, quote: &CartQuote) -> Result<i64, StoreError> {
    let mut unit = store.begin().await?;

    // Ledger rows are locked in ascending product order, whatever the cart order.
    let mut per_product: BTreeMap<i64, i32> = BTreeMap::new();
    for line in &quote.lines {
        *per_product.entry(line.product_id).or_default() += line.quantity;
    }
    for (product_id, quantity) in per_product {
        unit.decrement(product_id, quantity).await?;
    }

    let transaction_id = unit.insert_transaction(header).await?;
    for line in &quote.lines {
        unit.insert_line_item(
            transaction_id,
            &NewLineItem {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
            },
        )
        .await?;
        unit.append_movement(&NewMovement {
            product_id: line.product_id,
            direction: MovementDirection::Out,
            quantity: line.quantity,
            reason: MovementReason::Transaction,
            reference_id: Some(transaction_id),
            user_id: Some(header.user_id),
            notes: None,
        })
        .await?;
    }

    unit.commit().await?;
    Ok(transaction_id)
}

/// Books received goods into the ledger with a matching `in` movement.
#[instrument(skip(store, receipt), fields(product_id = receipt.product_id, quantity = receipt.quantity))]
pub async fn receive_stock(
    store: &dyn InventoryStore,
    receipt: StockReceipt,
    acting_user: i64,
) -> Result<StockEntry, RecordError> {
    if receipt.quantity <= 0 {
        return Err(RecordError::InvalidLine(
            "Product ID and valid quantity are required".to_string(),
        ));
    }

    let result = async {
        let mut unit = store.begin().await?;
        let entry = unit.increment(receipt.product_id, receipt.quantity).await?;
        unit.append_movement(&NewMovement {
            product_id: receipt.product_id,
            direction: MovementDirection::In,
            quantity: receipt.quantity,
            reason: MovementReason::Manual,
            reference_id: None,
            user_id: Some(acting_user),
            notes: receipt.notes.clone(),
        })
        .await?;
        unit.commit().await?;
        Ok::<_, StoreError>(entry)
    }
    .await;

    match result {
        Ok(entry) => {
            info!(current_stock = entry.current_stock, "Stock received");
            Ok(entry)
        }
        Err(StoreError::MissingEntry(product_id)) => Err(RecordError::ProductNotFound(product_id)),
        Err(e) => {
            error!(error = %e, "Stock receipt rolled back");
            Err(RecordError::Persistence(e))
        }
    }
}

/// `TRX-` followed by the unix time in milliseconds and six random digits.
pub fn generate_transaction_code() -> String {
    let entropy = (uuid::Uuid::new_v4().as_u128() % 1_000_000) as u32;
    format!("TRX-{}{:06}", Utc::now().timestamp_millis(), entropy)
}
