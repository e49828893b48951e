//! Realtime wire protocol.
//!
//! Every inbound frame is a JSON envelope `{"type": <kind>, "data": {...}}`.
//! The envelope is decoded first, then `data` is decoded against the schema
//! selected by `type`, and finally every identifier is validated. The result
//! is a [`Command`], which the session handler matches exhaustively.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FrameError, IdError};
use crate::types::{ConversationId, MessageId, UserId};

pub const KIND_SEND_MESSAGE: &str = "send_message";
pub const KIND_EDIT_MESSAGE: &str = "edit_message";
pub const KIND_GET_CONVERSATIONS: &str = "get_conversations";
pub const KIND_UPDATE_STATUS: &str = "update_status";

/// Outbound `type` for a newly persisted message.
pub const KIND_CONVERSATIONS_UPDATE: &str = "conversations_update";
/// Outbound `type` for a conversation list reply.
pub const KIND_CONVERSATIONS: &str = "conversations";

/// Untyped envelope; `data` stays opaque until the kind is known.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Wire payloads (identifiers still unvalidated)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    #[serde(rename = "senderID")]
    sender_id: String,
    /// Accepted for compatibility; routing uses the conversation.
    #[serde(rename = "recipientID", default)]
    #[allow(dead_code)]
    recipient_id: Option<String>,
    #[serde(rename = "conversationID")]
    conversation_id: String,
    content: String,
    #[serde(default)]
    attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EditMessagePayload {
    #[serde(rename = "messageID")]
    message_id: String,
    content: String,
    #[serde(rename = "conversationID")]
    conversation_id: String,
    #[serde(rename = "senderID")]
    sender_id: String,
}

#[derive(Debug, Deserialize)]
struct GetConversationsPayload {
    #[serde(rename = "userID")]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusPayload {
    #[serde(rename = "userID")]
    user_id: String,
    status: String,
}

// ---------------------------------------------------------------------------
// Validated commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessage {
    pub sender_id: UserId,
    pub conversation_id: ConversationId,
    pub content: String,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditMessage {
    pub message_id: MessageId,
    pub content: String,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SendMessage(SendMessage),
    EditMessage(EditMessage),
    GetConversations { user_id: UserId },
    UpdateStatus { user_id: UserId, status: String },
}

impl Command {
    /// Decode one inbound text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(FrameError::Envelope)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, FrameError> {
        let Envelope { kind, data } = envelope;
        match kind.as_str() {
            KIND_SEND_MESSAGE => {
                let p: SendMessagePayload = payload(KIND_SEND_MESSAGE, data)?;
                const K: &str = KIND_SEND_MESSAGE;
                Ok(Command::SendMessage(SendMessage {
                    sender_id: ident(K, UserId::from_hex(&p.sender_id))?,
                    conversation_id: ident(K, ConversationId::from_hex(&p.conversation_id))?,
                    content: p.content,
                    attachments: p.attachments,
                }))
            }
            KIND_EDIT_MESSAGE => {
                let p: EditMessagePayload = payload(KIND_EDIT_MESSAGE, data)?;
                const K: &str = KIND_EDIT_MESSAGE;
                Ok(Command::EditMessage(EditMessage {
                    message_id: ident(K, MessageId::from_hex(&p.message_id))?,
                    content: p.content,
                    conversation_id: ident(K, ConversationId::from_hex(&p.conversation_id))?,
                    sender_id: ident(K, UserId::from_hex(&p.sender_id))?,
                }))
            }
            KIND_GET_CONVERSATIONS => {
                let p: GetConversationsPayload = payload(KIND_GET_CONVERSATIONS, data)?;
                Ok(Command::GetConversations {
                    user_id: ident(KIND_GET_CONVERSATIONS, UserId::from_hex(&p.user_id))?,
                })
            }
            KIND_UPDATE_STATUS => {
                let p: UpdateStatusPayload = payload(KIND_UPDATE_STATUS, data)?;
                Ok(Command::UpdateStatus {
                    user_id: ident(KIND_UPDATE_STATUS, UserId::from_hex(&p.user_id))?,
                    status: p.status,
                })
            }
            _ => Err(FrameError::UnknownKind(kind)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::SendMessage(_) => KIND_SEND_MESSAGE,
            Command::EditMessage(_) => KIND_EDIT_MESSAGE,
            Command::GetConversations { .. } => KIND_GET_CONVERSATIONS,
            Command::UpdateStatus { .. } => KIND_UPDATE_STATUS,
        }
    }

    /// The identity the frame claims to act as.
    pub fn claimed_user(&self) -> UserId {
        match self {
            Command::SendMessage(m) => m.sender_id,
            Command::EditMessage(m) => m.sender_id,
            Command::GetConversations { user_id } => *user_id,
            Command::UpdateStatus { user_id, .. } => *user_id,
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(kind: &'static str, data: Value) -> Result<T, FrameError> {
    serde_json::from_value(data).map_err(|source| FrameError::Payload { kind, source })
}

fn ident<T>(kind: &'static str, result: Result<T, IdError>) -> Result<T, FrameError> {
    result.map_err(|source| FrameError::Identifier { kind, source })
}
