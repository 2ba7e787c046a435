use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use chirp_db::posts::FeedScope;
use chirp_types::api::{AddWordRequest, AdminPanelResponse, AdminUserEntry, MuteResponse, SuccessResponse};

use crate::context::RequestContext;
use crate::error::AppError;
use crate::feed::build_feed;
use crate::state::{AppState, run_db};

/// Wordlist entries are stored lowercased; matching is case-insensitive
/// anyway, so this only keeps the list free of near-duplicates.
pub fn normalize_word(word: &str) -> Result<String, AppError> {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        return Err(AppError::invalid("word required"));
    }
    Ok(word)
}

/// POST /admin/mute/{user_id}
pub async fn toggle_mute(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    ctx.require_admin()?;

    let muted = run_db(&state, move |db| db.toggle_mute(user_id))
        .await?
        .ok_or(AppError::NotFound("user not found"))?;

    info!("Admin {} set mute={} on user {}", ctx.viewer_id, muted, user_id);
    Ok(Json(MuteResponse { muted }))
}

/// POST /admin/words
pub async fn add_word(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<AddWordRequest>,
) -> Result<impl IntoResponse, AppError> {
    ctx.require_admin()?;
    let word = normalize_word(&req.word)?;

    let w = word.clone();
    let added = run_db(&state, move |db| db.add_censored_word(&w)).await?;
    if added {
        info!("Admin {} added censored word {:?}", ctx.viewer_id, word);
    }

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /admin/panel
pub async fn panel(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    ctx.require_admin()?;

    let viewer = ctx.viewer_id;
    let (users, private_posts) = run_db(&state, move |db| {
        let users = db.list_active_users()?;
        let posts = db.with_snapshot(|conn| build_feed(conn, viewer, FeedScope::PrivateOnly))?;
        Ok((users, posts))
    })
    .await?;

    Ok(Json(AdminPanelResponse {
        users: users
            .into_iter()
            .map(|(id, username, is_muted)| AdminUserEntry {
                id,
                username,
                is_muted,
            })
            .collect(),
        private_posts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_trimmed_and_lowercased() {
        assert_eq!(normalize_word("  DaRn ").unwrap(), "darn");
        assert!(normalize_word("   ").is_err());
    }
}
