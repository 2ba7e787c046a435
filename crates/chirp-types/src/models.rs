use serde::{Deserialize, Serialize};

/// Discriminator stored in `posts.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Poll,
}

impl PostKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Poll => "poll",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "poll" => Some(Self::Poll),
            _ => None,
        }
    }
}

/// Which branch a vote toggle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Voted,
    Removed,
}

/// Which branch a like toggle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Liked,
    Unliked,
}

/// Name shown for an author or sender. Soft-deleted accounts never expose
/// their old username, only a label derived from their id.
pub fn display_name(user_id: i64, username: Option<&str>, is_deleted: bool) -> String {
    match username {
        Some(name) if !is_deleted => name.to_string(),
        _ => format!("Deleted User [{}]", user_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_users_get_stable_label() {
        assert_eq!(display_name(7, Some("alice"), false), "alice");
        assert_eq!(display_name(7, Some("alice"), true), "Deleted User [7]");
        assert_eq!(display_name(12, None, true), "Deleted User [12]");
    }

    #[test]
    fn post_kind_roundtrips_through_column_text() {
        assert_eq!(PostKind::parse(PostKind::Poll.as_str()), Some(PostKind::Poll));
        assert_eq!(PostKind::parse("video"), None);
    }
}
