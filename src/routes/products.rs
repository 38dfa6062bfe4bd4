use axum::{middleware, routing::{delete, get, post, put}, Router};
use crate::handlers::product::{create_product, delete_product, get_product, get_products, update_product};
use crate::middleware::auth::require_acting_user;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let acting_user = middleware::from_fn_with_state(state.clone(), require_acting_user);

    // Reads are open; catalog writes run as a known user
    Router::new()
        .route("/products", get(get_products).merge(post(create_product).route_layer(acting_user.clone())))
        .route(
            "/products/{id}",
            get(get_product).merge(put(update_product).delete(delete_product).route_layer(acting_user)),
        )
}
