use axum::extract::{rejection::JsonRejection, Extension, Query, State};
use axum::Json;
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;

use crate::dtos::stock::{
    MovementListResponse, MovementQuery, StockInRequest, StockInResponse, StockListResponse, StockQuery,
};
use crate::dtos::PageQuery;
use crate::error::AppError;
use crate::inventory::recorder::{receive_stock, StockReceipt};
use crate::middleware::auth::AuthContext;
use crate::models::{movement::StockMovement, stock::StockLevel};
use crate::state::AppState;

// GET /stock?low_stock=true
#[instrument(skip(state))]
pub async fn list_stock(
    State(state): State<AppState>,
    Query(params): Query<StockQuery>,
) -> Result<Json<StockListResponse>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT s.product_id, p.name AS product_name, c.name AS category_name,
                p.price, s.current_stock, s.min_stock, s.stock_in, s.stock_out,
                s.current_stock <= s.min_stock AS is_low, s.last_updated
         FROM stock s
         JOIN products p ON s.product_id = p.id
         LEFT JOIN categories c ON p.category_id = c.id
         WHERE p.is_active",
    );
    if params.low_stock.unwrap_or(false) {
        query.push(" AND s.current_stock <= s.min_stock");
    }
    query.push(" ORDER BY s.current_stock ASC, p.name");

    let stock = query.build_query_as::<StockLevel>().fetch_all(&state.db_pool).await?;
    Ok(Json(StockListResponse { stock }))
}

// POST /stock/in
#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id, username = %auth.username))]
pub async fn stock_in(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<StockInRequest>, JsonRejection>,
) -> Result<Json<StockInResponse>, AppError> {
    let Json(req) = payload?;

    let entry = receive_stock(
        state.inventory.as_ref(),
        StockReceipt {
            product_id: req.product_id,
            quantity: req.quantity,
            notes: req.notes,
        },
        auth.user_id,
    )
    .await?;

    Ok(Json(StockInResponse {
        message: "Stock added successfully",
        stock: entry,
    }))
}

// GET /stock/movements?product_id=&page=&limit=
#[instrument(skip(state))]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementQuery>,
) -> Result<Json<MovementListResponse>, AppError> {
    let (limit, offset) = PageQuery { page: params.page, limit: params.limit }.limit_offset(20);

    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT sm.id, sm.product_id, p.name AS product_name, sm.movement_type, sm.quantity,
                sm.reference_type, sm.reference_id, sm.user_id, u.full_name AS user_name,
                sm.notes, sm.movement_date
         FROM stock_movements sm
         JOIN products p ON sm.product_id = p.id
         LEFT JOIN users u ON sm.user_id = u.id",
    );
    if let Some(product_id) = params.product_id {
        query.push(" WHERE sm.product_id = ").push_bind(product_id);
    }
    query
        .push(" ORDER BY sm.movement_date DESC, sm.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let movements = query.build_query_as::<StockMovement>().fetch_all(&state.db_pool).await?;
    Ok(Json(MovementListResponse { movements }))
}
