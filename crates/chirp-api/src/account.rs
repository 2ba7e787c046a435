//! Self-service account changes. Each one re-checks the current password
//! except deletion, which the authenticated session alone authorizes.

use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::info;

use chirp_types::api::{ChangePasswordRequest, RenameRequest, SuccessResponse};

use crate::auth::{hash_password, validate_password, validate_username, verify_password};
use crate::context::RequestContext;
use crate::error::AppError;
use crate::state::{AppState, run_db};

async fn check_password(state: &AppState, user_id: i64, password: String) -> Result<(), AppError> {
    let user = run_db(state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !verify_password(&password, &user.password) {
        return Err(AppError::Forbidden("incorrect password"));
    }
    Ok(())
}

/// POST /account/username
pub async fn rename(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;
    check_password(&state, ctx.viewer_id, req.password).await?;

    let viewer = ctx.viewer_id;
    let name = username.clone();
    if !run_db(&state, move |db| db.rename_user(viewer, &name)).await? {
        return Err(AppError::Conflict("username already taken"));
    }

    info!("User {} renamed to {}", viewer, username);
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /account/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_password(&req.new_password)?;
    check_password(&state, ctx.viewer_id, req.old_password).await?;

    let password_hash = hash_password(&req.new_password)?;
    let viewer = ctx.viewer_id;
    run_db(&state, move |db| db.set_password(viewer, &password_hash)).await?;

    info!("User {} changed password", viewer);
    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /account
///
/// Soft delete. Posts, votes and messages stay and are attributed to
/// "Deleted User [id]" from now on; existing tokens stop working.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    if !run_db(&state, move |db| db.soft_delete_user(viewer)).await? {
        return Err(AppError::NotFound("user not found"));
    }

    info!("User {} deleted their account", viewer);
    Ok(Json(SuccessResponse { success: true }))
}
