use axum::{
    extract::{Query, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use chirp_types::api::Claims;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::state::{AppState, run_db};

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer header first; the `token` query parameter is for EventSource
/// clients, which cannot set headers.
fn bearer_token(req: &Request) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(q)| q.token)
    })
}

/// Validate the token, then resolve the live account behind it. Unknown and
/// soft-deleted accounts are unauthorized even with a well-formed token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(AppError::Unauthorized)?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = token_data.claims.sub;
    let user = run_db(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .filter(|u| !u.is_deleted)
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(RequestContext {
        viewer_id: user.id,
        is_admin: user.is_admin,
    });
    Ok(next.run(req).await)
}
