//! Row types, mapped directly from SQLite rows. Kept separate from the
//! `chirp-types` wire models so the storage layer stays independent.

use chirp_types::models::{PostKind, VoteAction};

pub struct UserRow {
    pub id: i64,
    /// `None` once the account is soft-deleted.
    pub username: Option<String>,
    pub password: String,
    pub is_admin: bool,
    pub is_muted: bool,
    pub is_deleted: bool,
    pub created_at: String,
}

/// One post as the feed sees it, with its like aggregate already joined.
pub struct FeedRow {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub kind: PostKind,
    pub username: Option<String>,
    pub author_deleted: bool,
    pub author_is_admin: bool,
    pub created_at: String,
    pub is_public: bool,
    pub like_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyRow {
    pub option_id: i64,
    pub option_text: String,
    pub votes: i64,
    pub voted_by_me: bool,
}

#[derive(Debug)]
pub struct VoteOutcome {
    pub post_id: i64,
    pub action: VoteAction,
    pub tally: Vec<TallyRow>,
}

pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub created_at: String,
}

/// A message addressed to a delivery-channel recipient, with the sender's
/// attribution columns.
pub struct InboundRow {
    pub id: i64,
    pub sender_id: i64,
    pub sender_username: Option<String>,
    pub sender_deleted: bool,
}

pub struct DmCounterpartRow {
    pub id: i64,
    pub username: Option<String>,
    pub is_deleted: bool,
    pub last_message: Option<String>,
}

/// Result of an ownership-checked mutation on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    NotFound,
    Forbidden,
}
