use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        avatar::avatar_url,
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse},
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo_types::{NewUser, StoreError},
    },
    error::{ensure_valid, ApiError},
    extract::JsonBody,
    state::AppState,
    validation::{is_valid_email, normalize_email, Checks},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth", get(get_me).post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", post(register))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let mut checks = Checks::new();
    checks
        .required(&payload.name, "name", "Name is required")
        .check(is_valid_email(&email), "email", "Please include a valid email")
        .check(
            payload.password.chars().count() >= 6,
            "password",
            "Password must be 6 or more characters",
        );
    ensure_valid(checks.into_errors())?;

    let cfg = state.config.password.clone();
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, &cfg))
        .await
        .context("password hashing task")??;

    // No pre-check: the store's unique constraint decides between racing registrations.
    let new_user = NewUser {
        name: payload.name.trim().to_string(),
        avatar: avatar_url(&email),
        email,
        password_hash,
    };
    let user = match state.users.create(new_user).await {
        Ok(u) => u,
        Err(StoreError::Duplicate) => {
            warn!("email already registered");
            return Err(ApiError::Duplicate);
        }
        Err(StoreError::Other(e)) => return Err(ApiError::Internal(e.context("create user"))),
    };

    let token = state.keys.sign(user.id).context("sign token")?;

    info!(user_id = %user.id, "user registered");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let mut checks = Checks::new();
    checks
        .check(is_valid_email(&email), "email", "Please include a valid email")
        .check(!payload.password.is_empty(), "password", "Password is required");
    ensure_valid(checks.into_errors())?;

    let user = state
        .users
        .find_by_email(&email)
        .await
        .context("find user by email")?;

    // Unknown emails still pay for one Argon2 verification, against the decoy hash.
    let password = payload.password;
    let password_hash: Arc<str> = match &user {
        Some(u) => u.password_hash.as_str().into(),
        None => state.decoy_hash.clone(),
    };
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .context("password verification task")??;

    let user = match user {
        Some(u) if ok => u,
        Some(u) => {
            warn!(user_id = %u.id, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            warn!("login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = state.keys.sign(user.id).context("sign token")?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await
        .context("find user by id")?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(PublicUser::from(user)))
}
