use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{account, admin, auth, feed, likes, messages, polls, posts, users};

/// The whole HTTP surface. Everything except register and login sits behind
/// the auth middleware.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/feed", get(feed::get_feed))
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}", patch(posts::edit_post).delete(posts::delete_post))
        .route("/posts/{post_id}/like", post(likes::toggle_like))
        .route("/votes/{option_id}", post(polls::cast_vote))
        .route("/profile/{username}", get(users::get_profile))
        .route("/users/search", get(users::search_users))
        .route("/users/{user_id}", get(users::get_user))
        .route("/messages", get(messages::list_conversations).post(messages::send_message))
        .route("/messages/stream", get(messages::stream_messages))
        .route("/messages/{other_id}", get(messages::get_conversation))
        .route("/account", delete(account::delete_account))
        .route("/account/username", post(account::rename))
        .route("/account/password", post(account::change_password))
        .route("/admin/panel", get(admin::panel))
        .route("/admin/mute/{user_id}", post(admin::toggle_mute))
        .route("/admin/words", post(admin::add_word))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
