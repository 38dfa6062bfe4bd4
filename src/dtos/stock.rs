use serde::{Deserialize, Serialize};

use crate::inventory::StockEntry;
use crate::models::{movement::StockMovement, stock::StockLevel};

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub low_stock: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StockInRequest {
    pub product_id: i64,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockListResponse {
    pub stock: Vec<StockLevel>,
}

#[derive(Debug, Serialize)]
pub struct StockInResponse {
    pub message: &'static str,
    pub stock: StockEntry,
}

#[derive(Debug, Serialize)]
pub struct MovementListResponse {
    pub movements: Vec<StockMovement>,
}
