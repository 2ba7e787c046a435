use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use chirp_db::models::TallyRow;
use chirp_types::api::{PollOptionView, VoteResponse};

use crate::context::RequestContext;
use crate::error::AppError;
use crate::state::{AppState, run_db};

pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 5;

/// Share of the poll's votes, in percent with one decimal. Halves round to
/// even. An empty poll reads 0 everywhere.
pub fn percent(votes: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (votes as f64 / total as f64 * 1000.0).round_ties_even() / 10.0
}

pub fn option_views(tally: Vec<TallyRow>) -> Vec<PollOptionView> {
    let total: i64 = tally.iter().map(|t| t.votes).sum();
    tally
        .into_iter()
        .map(|t| PollOptionView {
            id: t.option_id,
            percent: percent(t.votes, total),
            text: t.option_text,
            votes: t.votes,
            voted_by_me: t.voted_by_me,
        })
        .collect()
}

/// Trimmed question and non-blank options, or why the poll is malformed.
pub fn validate_poll(question: &str, options: &[String]) -> Result<(String, Vec<String>), AppError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::invalid("poll question required"));
    }

    let options: Vec<String> = options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    if !(MIN_POLL_OPTIONS..=MAX_POLL_OPTIONS).contains(&options.len()) {
        return Err(AppError::invalid(format!(
            "poll must have {}-{} options",
            MIN_POLL_OPTIONS, MAX_POLL_OPTIONS
        )));
    }

    Ok((question.to_string(), options))
}

/// POST /votes/{option_id}
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(option_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    let outcome = run_db(&state, move |db| db.cast_vote(viewer, option_id))
        .await?
        .ok_or_else(|| AppError::invalid("invalid option"))?;

    debug!(
        "User {} {:?} option {} on poll {}",
        viewer, outcome.action, option_id, outcome.post_id
    );

    Ok(Json(VoteResponse {
        action: outcome.action,
        post_id: outcome.post_id,
        options: option_views(outcome.tally),
    }))
}
