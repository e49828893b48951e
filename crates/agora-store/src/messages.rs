use agora_shared::{ConversationId, MessageId, UserId};
use rusqlite::{params, OptionalExtension};

use crate::database::{id_column, now, ts_column, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::Message;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, content, attachments, is_read, is_edited, created_at, updated_at";

impl Database {
    /// Persist a new message and make it the conversation's last message.
    ///
    /// The conversation's existence is checked before the insert; there is
    /// no foreign key behind it, so a conversation deleted between the check
    /// and the insert leaves an orphaned message. That window is logged, not
    /// closed.
    pub fn save_message(
        &self,
        sender_id: UserId,
        conversation_id: ConversationId,
        content: &str,
        attachments: &[String],
    ) -> Result<Message> {
        if !self.conversation_exists(conversation_id)? {
            return Err(StoreError::ConversationNotFound(conversation_id));
        }

        let ts = now();
        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            attachments: attachments.to_vec(),
            read: false,
            is_edited: false,
            created_at: ts,
            updated_at: ts,
        };

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                message.id.to_hex(),
                conversation_id.to_hex(),
                sender_id.to_hex(),
                message.content,
                serde_json::to_string(&message.attachments)?,
                message.read,
                message.is_edited,
                ts_to_sql(&message.created_at),
                ts_to_sql(&message.updated_at),
            ],
        )?;
        let updated = tx.execute(
            "UPDATE conversations SET last_message_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![message.id.to_hex(), ts_to_sql(&ts), conversation_id.to_hex()],
        )?;
        tx.commit()?;

        if updated == 0 {
            tracing::warn!(
                conversation = %conversation_id,
                message = %message.id,
                "conversation vanished while saving message; last message not updated"
            );
        }

        Ok(message)
    }

    /// Replace a message's content and mark it edited.
    ///
    /// The conversation stored on the message is authoritative; a different
    /// `conversation_id` argument is only reported. When the message is the
    /// conversation's current last message the conversation is touched as
    /// well. `sender_id` is not checked against the original author.
    pub fn save_edited_message(
        &self,
        message_id: MessageId,
        content: &str,
        conversation_id: ConversationId,
        sender_id: UserId,
    ) -> Result<Message> {
        let original = self.get_message(message_id)?;

        if original.conversation_id != conversation_id {
            tracing::warn!(
                message = %message_id,
                stored = %original.conversation_id,
                claimed = %conversation_id,
                "edit names a different conversation than the stored message"
            );
        }
        if original.sender_id != sender_id {
            tracing::debug!(
                message = %message_id,
                author = %original.sender_id.short(),
                editor = %sender_id.short(),
                "message edited by someone other than its author"
            );
        }

        let ts = now();
        self.conn().execute(
            "UPDATE messages SET content = ?1, is_edited = 1, updated_at = ?2 WHERE id = ?3",
            params![content, ts_to_sql(&ts), message_id.to_hex()],
        )?;

        let refreshed = self.conn().execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2 AND last_message_id = ?3",
            params![
                ts_to_sql(&ts),
                original.conversation_id.to_hex(),
                message_id.to_hex()
            ],
        )?;
        if refreshed > 0 {
            tracing::debug!(
                conversation = %original.conversation_id,
                message = %message_id,
                "edited message is the last message; conversation refreshed"
            );
        }

        Ok(Message {
            content: content.to_string(),
            is_edited: true,
            updated_at: ts,
            ..original
        })
    }

    /// Remove a message and return it.
    ///
    /// If it was the conversation's last message, the pointer moves back to
    /// the newest message that remains (or is cleared) in the same
    /// transaction.
    pub fn delete_message(&self, id: MessageId) -> Result<Message> {
        let message = self.get_message(id)?;

        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM messages WHERE id = ?1", params![id.to_hex()])?;
        let repointed = tx.execute(
            "UPDATE conversations
             SET last_message_id = (
                 SELECT id FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1
             )
             WHERE id = ?1 AND last_message_id = ?2",
            params![message.conversation_id.to_hex(), id.to_hex()],
        )?;
        tx.commit()?;

        if repointed > 0 {
            tracing::debug!(
                conversation = %message.conversation_id,
                message = %id,
                "deleted the last message; pointer moved to the previous one"
            );
        }

        Ok(message)
    }

    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id.to_hex()],
                row_to_message,
            )
            .optional()?
            .ok_or(StoreError::MessageNotFound(id))
    }

    /// Page through a conversation's history, newest first.
    pub fn get_messages_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(
            params![conversation_id.to_hex(), limit, offset],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let attachments: String = row.get(4)?;
    let attachments: Vec<String> = serde_json::from_str(&attachments).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id: id_column(row, 0)?,
        conversation_id: id_column(row, 1)?,
        sender_id: id_column(row, 2)?,
        content: row.get(3)?,
        attachments,
        read: row.get(5)?,
        is_edited: row.get(6)?,
        created_at: ts_column(row, 7)?,
        updated_at: ts_column(row, 8)?,
    })
}
