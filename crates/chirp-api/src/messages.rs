use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, info};

use chirp_db::models::MessageRow;
use chirp_gateway::channel::DeliveryChannel;
use chirp_gateway::sse::{event_stream, last_event_id};
use chirp_types::api::{
    ConversationResponse, DmListEntry, DmListResponse, MessageView, SendMessageRequest,
};
use chirp_types::models::display_name;
use chirp_types::time::{display_time, now_for_storage};

use crate::context::RequestContext;
use crate::error::AppError;
use crate::state::{AppState, run_db};

fn message_view(row: MessageRow) -> MessageView {
    MessageView {
        id: row.id,
        sender_id: row.sender_id,
        receiver_id: row.receiver_id,
        time: display_time(&row.created_at),
        content: row.content,
    }
}

/// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::invalid("message content required"));
    }
    if req.receiver_id == ctx.viewer_id {
        return Err(AppError::invalid("cannot message yourself"));
    }

    let sender = ctx.viewer_id;
    let receiver = req.receiver_id;
    let created_at = now_for_storage();
    let message = run_db(&state, move |db| {
        let live = db.get_user_by_id(receiver)?.is_some_and(|u| !u.is_deleted);
        if !live {
            return Ok(None);
        }
        let id = db.insert_message(sender, receiver, &req.content, &created_at)?;
        Ok(Some(MessageRow {
            id,
            sender_id: sender,
            receiver_id: receiver,
            content: req.content,
            created_at,
        }))
    })
    .await?
    .ok_or(AppError::NotFound("user not found"))?;

    debug!("Message {} from {} to {}", message.id, sender, receiver);
    Ok((StatusCode::CREATED, Json(message_view(message))))
}

/// GET /messages/{other_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(other_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    let messages = run_db(&state, move |db| {
        if db.get_user_by_id(other_id)?.is_none() {
            return Ok(None);
        }
        db.conversation(viewer, other_id).map(Some)
    })
    .await?
    .ok_or(AppError::NotFound("user not found"))?;

    Ok(Json(ConversationResponse {
        messages: messages.into_iter().map(message_view).collect(),
    }))
}

/// GET /messages
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    let users = run_db(&state, move |db| db.dm_counterparts(viewer))
        .await?
        .into_iter()
        .map(|row| DmListEntry {
            username: display_name(row.id, row.username.as_deref(), row.is_deleted),
            id: row.id,
            last_message: row.last_message,
        })
        .collect();

    Ok(Json(DmListResponse { users }))
}

/// GET /messages/stream
///
/// Server-Sent Events feed of new inbound messages. A reconnecting client
/// that sends `Last-Event-ID` gets everything after that id replayed.
pub async fn stream_messages(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let recipient = ctx.viewer_id;
    let db = state.db.clone();
    let channel = match last_event_id(&headers) {
        Some(cursor) => DeliveryChannel::resume(db, recipient, cursor, state.poll_interval),
        None => DeliveryChannel::open(db, recipient, state.poll_interval).await?,
    };

    info!("User {} subscribed to messages at cursor {}", recipient, channel.cursor());
    Ok(event_stream(channel))
}
