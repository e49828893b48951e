//! v001 -- Initial schema creation.
//!
//! Creates `conversations`, `conversation_participants`, `messages` and
//! `user_status`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id              TEXT PRIMARY KEY NOT NULL,  -- 32 hex chars
    is_group        INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    name            TEXT,                       -- groups only
    direct_key      TEXT UNIQUE,                -- "<lo>:<hi>" participant pair, 1:1 only
    last_message_id TEXT,                       -- soft reference -> messages(id)
    created_at      TEXT NOT NULL,              -- RFC-3339
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversation_participants (
    conversation_id TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    position        INTEGER NOT NULL,

    PRIMARY KEY (conversation_id, user_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_participants_user
    ON conversation_participants(user_id);

-- ----------------------------------------------------------------
-- Messages
--
-- conversation_id is deliberately not a foreign key: existence is checked
-- by the application right before insert.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,
    conversation_id TEXT NOT NULL,
    sender_id       TEXT NOT NULL,
    content         TEXT NOT NULL,
    attachments     TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    is_read         INTEGER NOT NULL DEFAULT 0,
    is_edited       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_created
    ON messages(conversation_id, created_at DESC);

-- ----------------------------------------------------------------
-- Presence
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_status (
    user_id   TEXT PRIMARY KEY NOT NULL,
    status    TEXT NOT NULL,
    last_seen TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
