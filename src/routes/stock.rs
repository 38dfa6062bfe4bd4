use axum::{middleware, routing::{get, post}, Router};
use crate::handlers::stock::{list_movements, list_stock, stock_in};
use crate::middleware::auth::require_acting_user;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/stock", get(list_stock))
        .route("/stock/movements", get(list_movements));

    // Writes need to know who moved the stock
    let protected = Router::new()
        .route("/stock/in", post(stock_in))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_acting_user));

    open.merge(protected)
}
