use agora_shared::{ConversationId, IdError, MessageId};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The referenced conversation does not exist.
    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// The referenced message does not exist.
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// A conversation request violates the participant rules.
    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored identifier is not valid hex.
    #[error("Identifier error: {0}")]
    Id(#[from] IdError),

    /// Attachment list (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
