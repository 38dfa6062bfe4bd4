use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;
use axum::http::StatusCode;
use bcrypt::{hash, verify, DEFAULT_COST};
use tracing::{info, instrument};

use crate::auth::jwt::{sign_token, TOKEN_TTL_HOURS};
use crate::dtos::user::{LoginRequest, LoginResponse, MeResponse, RegisterUserRequest, UserProfile};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::user::User;
use crate::state::AppState;

const USER_COLUMNS: &str =
    "SELECT id, username, password_hash, full_name, role, is_active, created_at FROM users";

const ROLES: [&str; 2] = ["admin", "kasir"];

// POST /auth/register
#[instrument(skip(state, payload))]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let Json(payload) = payload?;
    let role = payload.role.as_deref().unwrap_or("kasir");
    if !ROLES.contains(&role) {
        return Err(AppError::validation("Invalid role"));
    }
    if payload.username.trim().is_empty() {
        return Err(AppError::validation("Username required"));
    }
    if payload.password.len() < 6 {
        return Err(AppError::validation("Password too short"));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash, full_name, role)
         VALUES ($1, $2, $3, $4)
         RETURNING id, username, password_hash, full_name, role, is_active, created_at",
    )
    .bind(payload.username.trim())
    .bind(password_hash)
    .bind(payload.full_name.trim())
    .bind(role)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Username already exists"))?;

    info!(user_id = user.id, role, "User registered");
    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

// POST /auth/login
#[instrument(skip(state, payload))]
pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }

    let user = sqlx::query_as::<_, User>(&format!("{USER_COLUMNS} WHERE username = $1 AND is_active"))
        .bind(payload.username.trim())
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    let ok = verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;
    if !ok {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let token = sign_token(&user, &state.config.jwt_secret)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        token_type: "Bearer",
        expires_in_seconds: TOKEN_TTL_HOURS * 60 * 60,
        user: UserProfile::from(user),
    }))
}

// GET /auth/me - profile of the acting user
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MeResponse>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{USER_COLUMNS} WHERE id = $1"))
        .bind(auth.user_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(MeResponse { user: UserProfile::from(user) }))
}
