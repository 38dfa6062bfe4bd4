use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::jwt::verify_token;
use crate::state::AppState;

/// Who is performing the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: String,
    pub username: String,
}

#[derive(Serialize)]
struct ErrorBody { error: String, code: &'static str }

/// Resolves the acting user and attaches it as an [`AuthContext`] extension.
///
/// A bearer token always wins and must be valid. Without one, the request
/// runs as `DEFAULT_ACTING_USER_ID` if the operator configured it and is
/// rejected otherwise.
pub async fn require_acting_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = req.headers().get(AUTHORIZATION).map(|v| v.to_str());

    let context = match header {
        Some(Ok(value)) => {
            let Some(token) = value.strip_prefix("Bearer ") else {
                return unauthorized("Invalid Authorization format");
            };
            match verify_token(token, &state.config.jwt_secret) {
                Ok(claims) => AuthContext {
                    user_id: claims.sub,
                    role: claims.role,
                    username: claims.username,
                },
                Err(e) => return unauthorized(&e.to_string()),
            }
        }
        Some(Err(_)) => return unauthorized("Invalid Authorization header"),
        None => match state.config.default_acting_user {
            Some(user_id) => {
                tracing::debug!(user_id, "No bearer token, using configured default acting user");
                AuthContext {
                    user_id,
                    role: "default".to_string(),
                    username: "default".to_string(),
                }
            }
            None => return unauthorized("Missing Authorization header"),
        },
    };

    req.extensions_mut().insert(context);
    next.run(req).await
}

fn unauthorized(msg: &str) -> Response {
    let body = axum::Json(ErrorBody { error: msg.to_string(), code: "unauthorized" });
    (StatusCode::UNAUTHORIZED, body).into_response()
}
