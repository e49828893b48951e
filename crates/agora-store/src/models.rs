//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be pushed to realtime clients
//! and REST callers without an intermediate DTO. Field names follow the
//! camelCase / `...ID` convention the web clients expect.

use agora_shared::{ConversationId, MessageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "conversationID")]
    pub conversation_id: ConversationId,
    #[serde(rename = "senderID")]
    pub sender_id: UserId,
    pub content: String,
    /// Opaque attachment references (upload ids or URLs).
    #[serde(default)]
    pub attachments: Vec<String>,
    pub read: bool,
    #[serde(rename = "isEdited")]
    pub is_edited: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A direct (two-party) or group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    /// Participants in insertion order; never contains duplicates.
    pub participants: Vec<UserId>,
    #[serde(rename = "isGroup")]
    pub is_group: bool,
    /// Display name, groups only.
    pub name: Option<String>,
    /// Current state of the most recent message, if any.
    #[serde(rename = "lastMessage")]
    pub last_message: Option<Message>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Last presence status reported by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStatus {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub status: String,
    #[serde(rename = "lastSeen")]
    pub last_seen: DateTime<Utc>,
}
