use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, instrument};

use super::dto::{ProfileRequest, ProfileResponse};
use super::repo_types::ProfileRow;
use super::targets::compute_target;
use crate::auth::services::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(put_profile))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let row = ProfileRow::find_by_user(&state.db, user_id)
        .await?
        .ok_or(AppError::ProfileNotFound)?;
    Ok(Json(ProfileResponse::from_row(&row)?))
}

/// Saves the profile and recomputes daily targets in the same write.
#[instrument(skip(state, payload))]
async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = payload.into_profile();
    let target = compute_target(&profile)?;
    let row = ProfileRow::upsert(&state.db, user_id, &profile, &target).await?;
    info!(user_id = %user_id, calories = target.calories, "profile saved");
    Ok(Json(ProfileResponse::from_row(&row)?))
}
