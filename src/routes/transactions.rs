use axum::{middleware, routing::{get, post}, Router};
use crate::handlers::transaction::{create_transaction, get_transaction, list_transactions, validate_transaction};
use crate::middleware::auth::require_acting_user;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    // Only checkout needs an acting user; listing and dry runs stay open
    let checkout = post(create_transaction)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_acting_user));

    Router::new()
        .route("/transactions", get(list_transactions).merge(checkout))
        .route("/transactions/validate", post(validate_transaction))
        .route("/transactions/{id}", get(get_transaction))
}
