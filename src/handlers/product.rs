// src/handlers/product.rs
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::{error, info, instrument};

use crate::dtos::product::{
    CreateProductRequest, Pagination, ProductDeletedResponse, ProductListResponse, ProductQuery, ProductResponse,
    UpdateProductRequest,
};
use crate::dtos::PageQuery;
use crate::error::{map_unique_violation, AppError};
use crate::inventory::check_amount;
use crate::middleware::auth::AuthContext;
use crate::models::product::Product;
use crate::state::AppState;

const PRODUCT_COLUMNS: &str = "SELECT p.id, p.name, p.category_id, c.name AS category_name,
        p.price, p.barcode, p.description, p.is_active,
        s.current_stock, s.min_stock, p.created_at
     FROM products p
     LEFT JOIN categories c ON p.category_id = c.id
     LEFT JOIN stock s ON s.product_id = p.id";

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, params: &ProductQuery) {
    query.push(" WHERE p.is_active");
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.push(" AND p.name ILIKE ").push_bind(format!("%{search}%"));
    }
    if let Some(category_id) = params.category_id {
        query.push(" AND p.category_id = ").push_bind(category_id);
    }
}

// GET /products - active products with their stock
#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<ProductListResponse>, AppError> {
    let page = PageQuery { page: params.page, limit: params.limit };
    let (limit, offset) = page.limit_offset(10);

    let mut query = QueryBuilder::<Postgres>::new(PRODUCT_COLUMNS);
    push_filters(&mut query, &params);
    query
        .push(" ORDER BY p.name LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let products = query
        .build_query_as::<Product>()
        .fetch_all(&state.db_pool)
        .await
        .map_err(|e| {
            error!(?e, "Failed to fetch products");
            AppError::db(e)
        })?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
    push_filters(&mut count, &params);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(&state.db_pool).await?;

    Ok(Json(ProductListResponse {
        products: products.into_iter().map(ProductResponse::from).collect(),
        pagination: Pagination { page: page.page.unwrap_or(1).max(1), limit, total },
    }))
}

// GET /products/{id}
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_COLUMNS} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products - product plus its empty ledger entry, atomically
#[instrument(skip(state, auth, payload), fields(by = %auth.username))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let Json(payload) = payload?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Product name is required"));
    }
    check_price(payload.price)?;
    let min_stock = payload.min_stock.unwrap_or(0);
    check_min_stock(min_stock)?;

    let mut tx = state.db_pool.begin().await?;
    if let Some(category_id) = payload.category_id {
        ensure_category(&mut tx, category_id).await?;
    }

    let product_id: i64 = sqlx::query_scalar(
        "INSERT INTO products (name, category_id, price, barcode, description)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(name)
    .bind(payload.category_id)
    .bind(payload.price)
    .bind(&payload.barcode)
    .bind(&payload.description)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, "Product name or barcode already exists"))?;

    sqlx::query("INSERT INTO stock (product_id, min_stock) VALUES ($1, $2)")
        .bind(product_id)
        .bind(min_stock)
        .execute(&mut *tx)
        .await?;

    let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_COLUMNS} WHERE p.id = $1"))
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(product_id, "Product created");

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /products/{id} - partial update of an active product
#[instrument(skip(state, auth, payload), fields(by = %auth.username))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, AppError> {
    let Json(payload) = payload?;

    let name = payload.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(AppError::validation("Product name cannot be empty"));
    }
    if let Some(price) = payload.price {
        check_price(price)?;
    }
    if let Some(min_stock) = payload.min_stock {
        check_min_stock(min_stock)?;
    }

    let mut tx = state.db_pool.begin().await?;
    if let Some(category_id) = payload.category_id {
        ensure_category(&mut tx, category_id).await?;
    }

    sqlx::query_scalar::<_, i64>(
        "UPDATE products SET
         name = COALESCE($1, name),
         category_id = COALESCE($2, category_id),
         price = COALESCE($3, price),
         barcode = COALESCE($4, barcode),
         description = COALESCE($5, description),
         updated_at = NOW()
         WHERE id = $6 AND is_active
         RETURNING id",
    )
    .bind(name)
    .bind(payload.category_id)
    .bind(payload.price)
    .bind(&payload.barcode)
    .bind(&payload.description)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, "Product name or barcode already exists"))?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    if let Some(min_stock) = payload.min_stock {
        sqlx::query("UPDATE stock SET min_stock = $1 WHERE product_id = $2")
            .bind(min_stock)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_COLUMNS} WHERE p.id = $1"))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(product_id = id, "Product updated");

    Ok(Json(ProductResponse::from(product)))
}

// DELETE /products/{id} - soft delete, past sales keep pointing at the row
#[instrument(skip(state, auth), fields(by = %auth.username))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ProductDeletedResponse>, AppError> {
    if !state.inventory.retire_product(id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    info!(product_id = id, "Product deactivated");
    Ok(Json(ProductDeletedResponse {
        message: "Product deleted successfully",
        product_id: id,
    }))
}

fn check_price(price: Decimal) -> Result<(), AppError> {
    check_amount(price).map_err(|problem| AppError::validation(format!("Price {problem}")))
}

fn check_min_stock(min_stock: i32) -> Result<(), AppError> {
    if min_stock < 0 {
        return Err(AppError::validation("Minimum stock cannot be negative"));
    }
    Ok(())
}

async fn ensure_category(conn: &mut PgConnection, category_id: i64) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
        .bind(category_id)
        .fetch_one(conn)
        .await?;
    if !exists {
        return Err(AppError::validation("Category not found"));
    }
    Ok(())
}
