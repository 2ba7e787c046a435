use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use chirp_db::posts::FeedScope;
use chirp_db::users::query_post_count;
use chirp_types::api::{ProfileResponse, ProfileUser, SearchQuery, SearchResponse, UserSummary};
use chirp_types::models::display_name;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::feed::build_feed;
use crate::state::{AppState, run_db};

const SEARCH_LIMIT: u32 = 10;

/// GET /profile/{username}
///
/// Another user's profile shows only their public posts; your own shows
/// everything.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    let profile = run_db(&state, move |db| {
        let Some(user) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        db.with_snapshot(|conn| {
            let posts = build_feed(conn, viewer, FeedScope::Author(user.id))?;
            let post_count = query_post_count(conn, user.id)?;
            Ok(Some(ProfileResponse {
                user: ProfileUser {
                    id: user.id,
                    username: user.username.unwrap_or_default(),
                    post_count,
                    is_me: user.id == viewer,
                    is_muted: user.is_muted,
                },
                posts,
            }))
        })
    })
    .await?
    .ok_or(AppError::NotFound("user not found"))?;

    Ok(Json(profile))
}

/// GET /users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = run_db(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or(AppError::NotFound("user not found"))?;

    Ok(Json(UserSummary {
        id: user.id,
        username: display_name(user.id, user.username.as_deref(), user.is_deleted),
    }))
}

/// GET /users/search?q=
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let needle = query.q.trim().to_string();
    if needle.is_empty() {
        return Ok(Json(SearchResponse { users: Vec::new() }));
    }

    let viewer = ctx.viewer_id;
    let users = run_db(&state, move |db| db.search_users(&needle, viewer, SEARCH_LIMIT))
        .await?
        .into_iter()
        .map(|(id, username)| UserSummary { id, username })
        .collect();

    Ok(Json(SearchResponse { users }))
}
