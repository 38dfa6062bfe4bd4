use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::inventory::{MovementDirection, MovementReason};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub movement_type: MovementDirection,
    pub quantity: i32,
    pub reference_type: MovementReason,
    pub reference_id: Option<i64>,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub notes: Option<String>,
    pub movement_date: DateTime<Utc>,
}
