use axum::extract::{rejection::JsonRejection, Extension, Path, Query, State};
use axum::Json;
use tracing::instrument;

use crate::dtos::transaction::{
    CartQuoteResponse, CreateTransactionRequest, TransactionCreatedResponse, TransactionDetailResponse,
    TransactionListResponse,
};
use crate::dtos::PageQuery;
use crate::error::AppError;
use crate::inventory::recorder::{record_sale, validate_sale};
use crate::middleware::auth::AuthContext;
use crate::models::transaction::{Transaction, TransactionItem};
use crate::state::AppState;

const TRANSACTION_COLUMNS: &str = "SELECT t.id, t.transaction_code, t.user_id, u.full_name AS kasir_name,
        t.total_amount, t.payment_method, t.notes, t.transaction_date,
        (SELECT COUNT(*) FROM transaction_items ti WHERE ti.transaction_id = t.id) AS item_count
     FROM transactions t
     JOIN users u ON t.user_id = u.id";

// POST /transactions - checkout
#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id, username = %auth.username, role = %auth.role))]
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<Json<TransactionCreatedResponse>, AppError> {
    let Json(req) = payload?;

    let recorded = record_sale(state.inventory.as_ref(), req.into(), auth.user_id).await?;

    Ok(Json(TransactionCreatedResponse {
        message: "Transaction created successfully",
        transaction_id: recorded.transaction_id,
        transaction_code: recorded.transaction_code,
        total_amount: recorded.total_amount,
    }))
}

// POST /transactions/validate - dry run, never writes
#[instrument(skip(state, payload))]
pub async fn validate_transaction(
    State(state): State<AppState>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<Json<CartQuoteResponse>, AppError> {
    let Json(req) = payload?;
    let quote = validate_sale(state.inventory.as_ref(), &req.items).await?;
    Ok(Json(quote.into()))
}

// GET /transactions?page=&limit=
#[instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let (limit, offset) = page.limit_offset(10);

    let transactions = sqlx::query_as::<_, Transaction>(&format!(
        "{TRANSACTION_COLUMNS} ORDER BY t.transaction_date DESC, t.id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(TransactionListResponse { transactions }))
}

// GET /transactions/{id}
#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TransactionDetailResponse>, AppError> {
    let transaction = sqlx::query_as::<_, Transaction>(&format!("{TRANSACTION_COLUMNS} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    let items = sqlx::query_as::<_, TransactionItem>(
        "SELECT ti.id, ti.product_id, p.name AS product_name, ti.quantity,
                ti.unit_price, ti.subtotal
         FROM transaction_items ti
         JOIN products p ON ti.product_id = p.id
         WHERE ti.transaction_id = $1
         ORDER BY ti.id",
    )
    .bind(id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(TransactionDetailResponse { transaction, items }))
}

#[cfg(test)]
mod tests {
    use crate::inventory::memory::MemoryInventory;
    use crate::routes::app;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn seeded() -> MemoryInventory {
        let store = MemoryInventory::new();
        store.add_product(1, "Bakpia Kacang Hijau", dec!(25000), 10).await;
        store.add_product(2, "Bakpia Keju", dec!(30000), 3).await;
        store
    }

    async fn post(state: AppState, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::post(uri).header("content-type", "application/json");
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let response = app(state)
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn state(store: &MemoryInventory) -> AppState {
        AppState::for_tests(Arc::new(store.clone()), Some(1))
    }

    #[tokio::test]
    async fn checkout_returns_code_and_decrements_stock() {
        let store = seeded().await;

        let (status, body) = post(
            state(&store),
            "/api/transactions",
            json!({ "items": [{ "product_id": 1, "quantity": 2, "unit_price": 25000 }] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Transaction created successfully");
        let code = body["transactionCode"].as_str().unwrap();
        let digits = code.strip_prefix("TRX-").unwrap();
        assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
        let transaction_id = body["transactionId"].as_i64().unwrap();

        let snap = store.snapshot().await;
        assert_eq!(snap.entries[&1].current_stock, 8);
        assert_eq!(snap.movements.len(), 1);
        assert_eq!(snap.movements[0].movement.quantity, 2);
        assert_eq!(snap.movements[0].movement.reference_id, Some(transaction_id));
    }

    #[tokio::test]
    async fn insufficient_stock_is_400_with_remaining_quantity() {
        let store = seeded().await;

        let (status, body) = post(
            state(&store),
            "/api/transactions",
            json!({ "items": [{ "product_id": 1, "quantity": 50 }] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("Bakpia Kacang Hijau"), "{error}");
        assert!(error.contains("ID 1"), "{error}");
        assert!(error.contains("Remaining stock: 10"), "{error}");
        assert_eq!(store.snapshot().await.entries[&1].current_stock, 10);
        assert!(store.snapshot().await.movements.is_empty());
    }

    #[tokio::test]
    async fn unknown_product_is_404() {
        let store = seeded().await;
        let before = store.snapshot().await;

        let (status, body) = post(
            state(&store),
            "/api/transactions",
            json!({ "items": [{ "product_id": 999, "quantity": 1 }] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("999"));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn mixed_cart_with_one_short_line_changes_nothing() {
        let store = seeded().await;
        let before = store.snapshot().await;

        let (status, _) = post(
            state(&store),
            "/api/transactions",
            json!({ "items": [
                { "product_id": 1, "quantity": 1, "unit_price": 25000 },
                { "product_id": 2, "quantity": 4, "unit_price": 30000 }
            ] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn missing_or_empty_items_are_400() {
        let store = seeded().await;

        for body in [json!({}), json!({ "items": [] })] {
            let (status, body) = post(state(&store), "/api/transactions", body, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Transaction items are required");
        }

        let (status, body) = post(state(&store), "/api/transactions", json!({ "items": "nope" }), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn storage_fault_is_500_with_details() {
        let store = seeded().await;
        let before = store.snapshot().await;
        store.fail_movement_appends(true);

        let (status, body) = post(
            state(&store),
            "/api/transactions",
            json!({ "items": [{ "product_id": 1, "quantity": 1, "unit_price": 25000 }] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["details"].as_str().unwrap().contains("movement log unavailable"));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn without_identity_or_default_user_checkout_is_401() {
        let store = seeded().await;
        let state = AppState::for_tests(Arc::new(store.clone()), None);

        let (status, _) = post(
            state,
            "/api/transactions",
            json!({ "items": [{ "product_id": 1, "quantity": 1 }] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(store.snapshot().await.transactions.is_empty());
    }

    #[tokio::test]
    async fn bearer_token_sets_acting_user() {
        use crate::auth::jwt::sign_token;
        use crate::models::user::User;

        let store = seeded().await;
        let state = AppState::for_tests(Arc::new(store.clone()), None);
        let user = User {
            id: 42,
            username: "dewi".into(),
            password_hash: String::new(),
            full_name: "Dewi".into(),
            role: "kasir".into(),
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        let token = sign_token(&user, &state.config.jwt_secret).unwrap();

        let (status, _) = post(
            state,
            "/api/transactions",
            json!({ "items": [{ "product_id": 1, "quantity": 1 }], "payment_method": "debit" }),
            Some(&token),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let snap = store.snapshot().await;
        assert_eq!(snap.transactions[0].header.user_id, 42);
        assert_eq!(snap.transactions[0].header.payment_method, "debit");
        assert_eq!(snap.movements[0].movement.user_id, Some(42));
    }

    #[tokio::test]
    async fn invalid_token_is_401_even_with_default_user() {
        let store = seeded().await;

        let (status, _) = post(
            state(&store),
            "/api/transactions",
            json!({ "items": [{ "product_id": 1, "quantity": 1 }] }),
            Some("not-a-jwt"),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sub_cent_unit_price_is_400() {
        let store = seeded().await;
        let before = store.snapshot().await;

        let (status, body) = post(
            state(&store),
            "/api/transactions",
            json!({ "items": [{ "product_id": 1, "quantity": 3, "unit_price": 0.125 }] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unit price for product 1 cannot have more than two decimal places");
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn validate_quotes_cart_without_writing() {
        let store = seeded().await;
        let before = store.snapshot().await;

        let (status, body) = post(
            AppState::for_tests(Arc::new(store.clone()), None),
            "/api/transactions/validate",
            json!({ "items": [
                { "product_id": 1, "quantity": 2 },
                { "product_id": 2, "quantity": 1, "unit_price": 28000 }
            ] }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalAmount"], 78000.0);
        assert_eq!(body["items"][0]["subtotal"], 50000.0);
        assert_eq!(body["items"][1]["product_name"], "Bakpia Keju");
        assert_eq!(store.snapshot().await, before);
    }
}
