use serde::{Deserialize, Serialize};

/// Pushed to a recipient once per newly arrived direct message.
///
/// Carries only what a notification needs; the body is fetched on demand
/// through the conversation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageNotification {
    pub message_id: i64,
    pub sender_id: i64,
    pub sender: String,
}
