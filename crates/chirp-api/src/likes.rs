use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use chirp_types::api::LikeResponse;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::state::{AppState, run_db};

/// POST /posts/{post_id}/like
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    let (action, like_count) = run_db(&state, move |db| db.toggle_like(viewer, post_id))
        .await?
        .ok_or(AppError::NotFound("post not found"))?;

    Ok(Json(LikeResponse { action, like_count }))
}
