use anyhow::Context;
use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ensure_valid, ApiError},
    extract::JsonBody,
    profiles::{
        dto::{EducationRequest, ExperienceRequest, MessageResponse, ProfileRequest},
        repo_types::{Profile, ProfileFields},
    },
    state::AppState,
    validation::{is_valid_github_login, Checks},
};

const NO_PROFILE: &str = "There is no profile for this user";
const FROM_DATE_MSG: &str = "From date is required and needs to be from the past";

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(list_profiles).post(upsert_profile).delete(delete_account))
        .route("/profile/me", get(get_my_profile))
        .route("/profile/user/:user_id", get(get_profile_by_user))
        .route("/profile/experience", put(add_experience))
        .route("/profile/experience/:exp_id", delete(remove_experience))
        .route("/profile/education", put(add_education))
        .route("/profile/education/:edu_id", delete(remove_education))
        .route("/profile/github/:username", get(github_repos))
}

#[instrument(skip(state))]
pub async fn get_my_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, ApiError> {
    state
        .profiles
        .find_by_user(user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::BadRequest(NO_PROFILE))
}

#[instrument(skip(state, payload))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<ProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let fields = ProfileFields::from(payload);

    let mut checks = Checks::new();
    checks
        .required(&fields.status, "status", "Status is required")
        .check(!fields.skills.is_empty(), "skills", "Skills is required");
    ensure_valid(checks.into_errors())?;

    let profile = state.profiles.upsert(user_id, fields).await?;
    info!(%user_id, profile_id = %profile.id, "profile saved");
    Ok(Json(profile))
}

#[instrument(skip(state))]
pub async fn list_profiles(State(state): State<AppState>) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(state.profiles.list().await?))
}

#[instrument(skip(state))]
pub async fn get_profile_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    const NOT_FOUND: ApiError = ApiError::BadRequest("Profile not found");

    let Ok(user_id) = Uuid::parse_str(&user_id) else {
        return Err(NOT_FOUND);
    };
    state
        .profiles
        .find_by_user(user_id)
        .await?
        .map(Json)
        .ok_or(NOT_FOUND)
}

/// Removes the profile, then the user.
#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .profiles
        .delete_by_user(user_id)
        .await
        .context("delete profile")?;
    state.users.delete(user_id).await.context("delete user")?;

    info!(%user_id, "user deleted");
    Ok(Json(MessageResponse { msg: "User deleted" }))
}

#[instrument(skip(state, payload))]
pub async fn add_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<ExperienceRequest>,
) -> Result<Json<Profile>, ApiError> {
    let mut checks = Checks::new();
    checks
        .required(&payload.title, "title", "Title is required")
        .required(&payload.company, "company", "Company is required")
        .date_range(&payload.from, payload.to.as_deref(), FROM_DATE_MSG);
    ensure_valid(checks.into_errors())?;

    state
        .profiles
        .add_experience(user_id, payload.into_entry())
        .await?
        .map(Json)
        .ok_or(ApiError::BadRequest(NO_PROFILE))
}

#[instrument(skip(state))]
pub async fn remove_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(exp_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    state
        .profiles
        .remove_experience(user_id, &exp_id)
        .await?
        .map(Json)
        .ok_or(ApiError::BadRequest(NO_PROFILE))
}

#[instrument(skip(state, payload))]
pub async fn add_education(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<EducationRequest>,
) -> Result<Json<Profile>, ApiError> {
    let mut checks = Checks::new();
    checks
        .required(&payload.school, "school", "School is required")
        .required(&payload.degree, "degree", "Degree is required")
        .required(&payload.fieldofstudy, "fieldofstudy", "Field of study is required")
        .date_range(&payload.from, payload.to.as_deref(), FROM_DATE_MSG);
    ensure_valid(checks.into_errors())?;

    state
        .profiles
        .add_education(user_id, payload.into_entry())
        .await?
        .map(Json)
        .ok_or(ApiError::BadRequest(NO_PROFILE))
}

#[instrument(skip(state))]
pub async fn remove_education(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(edu_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    state
        .profiles
        .remove_education(user_id, &edu_id)
        .await?
        .map(Json)
        .ok_or(ApiError::BadRequest(NO_PROFILE))
}

#[instrument(skip(state))]
pub async fn github_repos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    const NOT_FOUND: ApiError = ApiError::NotFound("No Github profile found");

    if !is_valid_github_login(&username) {
        return Err(NOT_FOUND);
    }
    state
        .github
        .list_repos(&username)
        .await
        .map(Json)
        .ok_or(NOT_FOUND)
}
