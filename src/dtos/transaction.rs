use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inventory::recorder::{CartLine, CartQuote, SaleRequest};
use crate::models::transaction::{Transaction, TransactionItem};

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateTransactionRequest> for SaleRequest {
    fn from(req: CreateTransactionRequest) -> Self {
        Self {
            items: req.items,
            payment_method: req.payment_method,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCreatedResponse {
    pub message: &'static str,
    pub transaction_id: i64,
    pub transaction_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuoteResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub items: Vec<QuotedItem>,
}

#[derive(Debug, Serialize)]
pub struct QuotedItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

impl From<CartQuote> for CartQuoteResponse {
    fn from(quote: CartQuote) -> Self {
        Self {
            total_amount: quote.total_amount,
            items: quote
                .lines
                .into_iter()
                .map(|l| QuotedItem {
                    product_id: l.product_id,
                    product_name: l.product_name,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    subtotal: l.subtotal,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
pub struct TransactionDetailResponse {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}
