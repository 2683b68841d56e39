// src/models/message.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the append-only message log. Immutable once created; `id` is
/// assigned by the store on insert and is strictly increasing in insertion
/// order across all conversations, which is what makes it usable as a
/// watermark.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub from_user_id: String,
    pub to_user_id: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Message {
    /// Whether the local user authored this message.
    pub fn is_from(&self, user_id: &str) -> bool {
        self.from_user_id == user_id
    }
}

/// Inbox projection: the single most recent message of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationPreview {
    pub partner_id: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
