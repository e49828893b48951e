//! Outbound realtime frames.
//!
//! A frame is encoded once into shared text and the same allocation is
//! queued on every recipient's connection.

use std::sync::Arc;

use agora_shared::protocol::{KIND_CONVERSATIONS, KIND_CONVERSATIONS_UPDATE};
use agora_store::{Conversation, Message};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub enum ServerFrame<'a> {
    /// `{"type":"conversations_update","message":{...}}`
    ConversationsUpdate(&'a Message),
    /// The edited message, untagged.
    MessageEdited(&'a Message),
    /// `{"type":"conversations","conversations":[...]}`
    Conversations(&'a [Conversation]),
}

#[derive(Serialize)]
struct MessageUpdate<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a Message,
}

#[derive(Serialize)]
struct ConversationList<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    conversations: &'a [Conversation],
}

impl ServerFrame<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ServerFrame::ConversationsUpdate(_) => KIND_CONVERSATIONS_UPDATE,
            ServerFrame::MessageEdited(_) => "message_edited",
            ServerFrame::Conversations(_) => KIND_CONVERSATIONS,
        }
    }

    pub fn encode(&self) -> Result<Arc<str>, serde_json::Error> {
        let text = match *self {
            ServerFrame::ConversationsUpdate(message) => serde_json::to_string(&MessageUpdate {
                kind: KIND_CONVERSATIONS_UPDATE,
                message,
            })?,
            ServerFrame::MessageEdited(message) => serde_json::to_string(message)?,
            ServerFrame::Conversations(conversations) => {
                serde_json::to_string(&ConversationList {
                    kind: KIND_CONVERSATIONS,
                    conversations,
                })?
            }
        };
        Ok(Arc::from(text))
    }
}
