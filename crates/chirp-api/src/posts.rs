use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use chirp_db::models::Mutation;
use chirp_db::users::query_post_count;
use chirp_types::api::{
    CreatePostRequest, CreatePostResponse, DeletePostResponse, EditPostRequest, SuccessResponse,
};
use chirp_types::time::now_for_storage;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::feed::build_post;
use crate::polls::validate_poll;
use crate::state::{AppState, run_db};

fn check_mutation(outcome: Mutation) -> Result<(), AppError> {
    match outcome {
        Mutation::Applied => Ok(()),
        Mutation::NotFound => Err(AppError::NotFound("post not found")),
        Mutation::Forbidden => Err(AppError::Forbidden("forbidden")),
    }
}

fn validate_text(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::invalid("post content required"));
    }
    Ok(())
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    let author = run_db(&state, move |db| db.get_user_by_id(viewer))
        .await?
        .ok_or(AppError::Unauthorized)?;
    if author.is_muted {
        return Err(AppError::Forbidden("muted"));
    }

    let created_at = now_for_storage();
    let response = match req {
        CreatePostRequest::Text { content, is_public } => {
            validate_text(&content)?;
            let (post, post_count) = run_db(&state, move |db| {
                let post_id = db.create_text_post(viewer, &content, is_public, &created_at)?;
                db.with_snapshot(|conn| {
                    Ok((build_post(conn, viewer, post_id)?, query_post_count(conn, viewer)?))
                })
            })
            .await?;
            CreatePostResponse {
                success: true,
                post,
                post_count,
            }
        }
        CreatePostRequest::Poll {
            question,
            options,
            is_public,
        } => {
            let (question, options) = validate_poll(&question, &options)?;
            let post_count = run_db(&state, move |db| {
                db.create_poll(viewer, &question, &options, is_public, &created_at)?;
                db.post_count(viewer)
            })
            .await?;
            CreatePostResponse {
                success: true,
                post: None,
                post_count,
            }
        }
    };

    info!("User {} created a post ({} total)", viewer, response.post_count);
    Ok((StatusCode::CREATED, Json(response)))
}

/// PATCH /posts/{post_id}
pub async fn edit_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<EditPostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(content) = &req.content {
        validate_text(content)?;
    }

    let RequestContext { viewer_id, is_admin } = ctx;
    let outcome = run_db(&state, move |db| {
        db.update_post(viewer_id, is_admin, post_id, req.content.as_deref(), req.is_public)
    })
    .await?;
    check_mutation(outcome)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /posts/{post_id}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let RequestContext { viewer_id, is_admin } = ctx;
    let (outcome, post_count) = run_db(&state, move |db| {
        let outcome = db.delete_post(viewer_id, is_admin, post_id)?;
        Ok((outcome, db.post_count(viewer_id)?))
    })
    .await?;
    check_mutation(outcome)?;

    info!("User {} deleted post {}", viewer_id, post_id);
    Ok(Json(DeletePostResponse {
        success: true,
        post_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(validate_text("").is_err());
        assert!(validate_text(" \n\t").is_err());
        assert!(validate_text("hi").is_ok());
    }

    #[test]
    fn mutation_outcomes_map_to_errors() {
        assert!(check_mutation(Mutation::Applied).is_ok());
        assert!(matches!(
            check_mutation(Mutation::NotFound),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            check_mutation(Mutation::Forbidden),
            Err(AppError::Forbidden(_))
        ));
    }
}
