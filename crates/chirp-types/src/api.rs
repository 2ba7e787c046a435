use serde::{Deserialize, Serialize};

use crate::models::{LikeAction, VoteAction};

// -- JWT Claims --

/// Bearer token claims. Only the account id is trusted; everything else about
/// the caller is re-read from the store on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

// -- Posts --

fn default_public() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CreatePostRequest {
    Text {
        content: String,
        #[serde(default = "default_public")]
        is_public: bool,
    },
    Poll {
        question: String,
        options: Vec<String>,
        #[serde(default = "default_public")]
        is_public: bool,
    },
}

/// Text posts come back rendered so the client can prepend them; polls only
/// report success.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<PostView>,
    pub post_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPostRequest {
    pub content: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletePostResponse {
    pub success: bool,
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollOptionView {
    pub id: i64,
    pub text: String,
    pub votes: i64,
    pub percent: f64,
    pub voted_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PostBody {
    /// `content` is already rendered HTML.
    Text { content: String },
    Poll {
        question: String,
        options: Vec<PollOptionView>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub is_deleted_user: bool,
    pub author_is_admin: bool,
    pub time: String,
    pub is_public: bool,
    pub like_count: i64,
    pub liked_by_me: bool,
    #[serde(flatten)]
    pub body: PostBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub viewer_id: i64,
    pub username: String,
    pub is_admin: bool,
    pub post_count: i64,
    pub posts: Vec<PostView>,
}

// -- Votes & likes --

/// Always the whole poll, never a delta.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub action: VoteAction,
    pub post_id: i64,
    pub options: Vec<PollOptionView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub action: LikeAction,
    pub like_count: i64,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileUser {
    pub id: i64,
    pub username: String,
    pub post_count: i64,
    pub is_me: bool,
    pub is_muted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: ProfileUser,
    pub posts: Vec<PostView>,
}

// -- Direct messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub time: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmListEntry {
    pub id: i64,
    pub username: String,
    pub last_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmListResponse {
    pub users: Vec<DmListEntry>,
}

// -- Account --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
pub struct MuteResponse {
    pub muted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddWordRequest {
    pub word: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserEntry {
    pub id: i64,
    pub username: String,
    pub is_muted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminPanelResponse {
    pub users: Vec<AdminUserEntry>,
    pub private_posts: Vec<PostView>,
}
