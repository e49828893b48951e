//! CRUD operations for [`Conversation`] records.

use agora_shared::{ConversationId, MessageId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::{id_column, now, ts_column, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::Conversation;

/// Columns of the `conversations` table in the order [`ConversationRow`]
/// expects them.
const CONVERSATION_COLUMNS: &str =
    "c.id, c.is_group, c.name, c.last_message_id, c.created_at, c.updated_at";

/// A `conversations` row before participants and the last message are
/// attached.
struct ConversationRow {
    id: ConversationId,
    is_group: bool,
    name: Option<String>,
    last_message_id: Option<MessageId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Return the direct conversation between `a` and `b`, creating it if it
    /// does not exist yet. The pair is unordered: `(a, b)` and `(b, a)`
    /// resolve to the same conversation.
    ///
    /// The boolean is `true` when a new conversation was created.
    pub fn find_or_create_direct_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<(Conversation, bool)> {
        if a == b {
            return Err(StoreError::InvalidConversation(
                "a direct conversation needs two distinct participants".into(),
            ));
        }

        let key = direct_key(a, b);
        let existing: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM conversations WHERE direct_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            let id: ConversationId = id.parse()?;
            return Ok((self.get_conversation(id)?, false));
        }

        let conversation = self.insert_conversation(&[a, b], false, None, Some(&key))?;
        tracing::debug!(
            conversation = %conversation.id,
            a = %a.short(),
            b = %b.short(),
            "created direct conversation"
        );
        Ok((conversation, true))
    }

    /// Create a group conversation. Duplicate participants are dropped,
    /// keeping the first occurrence; at least two distinct participants are
    /// required.
    pub fn create_group_conversation(
        &self,
        name: Option<&str>,
        participants: &[UserId],
    ) -> Result<Conversation> {
        let mut unique: Vec<UserId> = Vec::with_capacity(participants.len());
        for p in participants {
            if !unique.contains(p) {
                unique.push(*p);
            }
        }
        if unique.len() < 2 {
            return Err(StoreError::InvalidConversation(format!(
                "a group needs at least two distinct participants, got {}",
                unique.len()
            )));
        }

        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let conversation = self.insert_conversation(&unique, true, name, None)?;
        tracing::debug!(
            conversation = %conversation.id,
            participants = conversation.participants.len(),
            "created group conversation"
        );
        Ok(conversation)
    }

    fn insert_conversation(
        &self,
        participants: &[UserId],
        is_group: bool,
        name: Option<&str>,
        direct_key: Option<&str>,
    ) -> Result<Conversation> {
        let id = ConversationId::new();
        let ts = now();

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO conversations (id, is_group, name, direct_key, last_message_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
            params![id.to_hex(), is_group, name, direct_key, ts_to_sql(&ts)],
        )?;
        for (position, user) in participants.iter().enumerate() {
            tx.execute(
                "INSERT INTO conversation_participants (conversation_id, user_id, position)
                 VALUES (?1, ?2, ?3)",
                params![id.to_hex(), user.to_hex(), position as i64],
            )?;
        }
        tx.commit()?;

        Ok(Conversation {
            id,
            participants: participants.to_vec(),
            is_group,
            name: name.map(str::to_string),
            last_message: None,
            created_at: ts,
            updated_at: ts,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn conversation_exists(&self, id: ConversationId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Fetch a single conversation with its participants and the current
    /// state of its last message.
    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?1"),
                params![id.to_hex()],
                row_to_conversation,
            )
            .optional()?
            .ok_or(StoreError::ConversationNotFound(id))?;

        self.hydrate(row)
    }

    /// All conversations `user` participates in, most recently active first.
    /// Returns an empty list, not an error, when there are none.
    pub fn get_conversations_for_user(&self, user: UserId) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS}
             FROM conversations c
             JOIN conversation_participants p ON p.conversation_id = c.id
             WHERE p.user_id = ?1
             ORDER BY c.updated_at DESC, c.id DESC"
        ))?;

        let rows = stmt.query_map(params![user.to_hex()], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(self.hydrate(row?)?);
        }
        Ok(conversations)
    }

    pub fn get_participants(&self, id: ConversationId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM conversation_participants
             WHERE conversation_id = ?1
             ORDER BY position ASC",
        )?;

        let rows = stmt.query_map(params![id.to_hex()], |row| id_column::<UserId>(row, 0))?;

        let mut participants = Vec::new();
        for row in rows {
            participants.push(row?);
        }
        Ok(participants)
    }

    fn hydrate(&self, row: ConversationRow) -> Result<Conversation> {
        let participants = self.get_participants(row.id)?;

        // `delete_message` keeps the pointer current. A row removed by any
        // other means leaves the conversation without a preview.
        let last_message = match row.last_message_id {
            Some(message_id) => match self.get_message(message_id) {
                Ok(message) => Some(message),
                Err(StoreError::MessageNotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(Conversation {
            id: row.id,
            participants,
            is_group: row.is_group,
            name: row.name,
            last_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a conversation and all its messages. Returns `true` if the
    /// conversation existed.
    pub fn delete_conversation(&self, id: ConversationId) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![id.to_hex()],
        )?;
        let affected = tx.execute("DELETE FROM conversations WHERE id = ?1", params![id.to_hex()])?;
        tx.commit()?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Order-independent key for a participant pair.
fn direct_key(a: UserId, b: UserId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}", lo.to_hex(), hi.to_hex())
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    let last_message_id: Option<String> = row.get(3)?;
    let last_message_id = last_message_id
        .map(|s| s.parse::<MessageId>())
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ConversationRow {
        id: id_column(row, 0)?,
        is_group: row.get(1)?,
        name: row.get(2)?,
        last_message_id,
        created_at: ts_column(row, 4)?,
        updated_at: ts_column(row, 5)?,
    })
}
