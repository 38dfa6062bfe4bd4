// src/dtos/product.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub category_id: Option<i64>,
    pub price: Decimal,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub min_stock: Option<i32>,
}

/// Absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub price: Option<Decimal>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub min_stock: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ProductDeletedResponse {
    pub message: &'static str,
    pub product_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub current_stock: i32,
    pub min_stock: i32,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

// Convert from Model to Response DTO
impl From<crate::models::product::Product> for ProductResponse {
    fn from(product: crate::models::product::Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            category_id: product.category_id,
            category_name: product.category_name,
            price: product.price,
            barcode: product.barcode,
            description: product.description,
            is_active: product.is_active,
            current_stock: product.current_stock.unwrap_or(0),
            min_stock: product.min_stock.unwrap_or(0),
            created_at: product.created_at.to_rfc3339(),
        }
    }
}
