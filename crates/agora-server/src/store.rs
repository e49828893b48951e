//! Async access to the SQLite [`Database`].
//!
//! The connection lives behind a mutex and every call runs on tokio's
//! blocking pool, so sessions never stall the runtime on disk I/O.

use std::sync::{Arc, Mutex, PoisonError};

use agora_shared::{ConversationId, MessageId, UserId};
use agora_store::{Conversation, Database, Message, StoreError, UserStatus};

type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    async fn call<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let task = tokio::task::spawn_blocking(move || {
            let guard = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(StoreError::Io(std::io::Error::other(e))),
        }
    }

    pub async fn save_message(
        &self,
        sender_id: UserId,
        conversation_id: ConversationId,
        content: String,
        attachments: Vec<String>,
    ) -> StoreResult<Message> {
        self.call(move |db| db.save_message(sender_id, conversation_id, &content, &attachments))
            .await
    }

    pub async fn save_edited_message(
        &self,
        message_id: MessageId,
        content: String,
        conversation_id: ConversationId,
        sender_id: UserId,
    ) -> StoreResult<Message> {
        self.call(move |db| {
            db.save_edited_message(message_id, &content, conversation_id, sender_id)
        })
        .await
    }

    pub async fn get_message(&self, id: MessageId) -> StoreResult<Message> {
        self.call(move |db| db.get_message(id)).await
    }

    pub async fn delete_message(&self, id: MessageId) -> StoreResult<Message> {
        self.call(move |db| db.delete_message(id)).await
    }

    pub async fn get_conversation(&self, id: ConversationId) -> StoreResult<Conversation> {
        self.call(move |db| db.get_conversation(id)).await
    }

    pub async fn get_conversations(&self, user: UserId) -> StoreResult<Vec<Conversation>> {
        self.call(move |db| db.get_conversations_for_user(user)).await
    }

    pub async fn find_or_create_direct_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> StoreResult<(Conversation, bool)> {
        self.call(move |db| db.find_or_create_direct_conversation(a, b))
            .await
    }

    pub async fn create_group_conversation(
        &self,
        name: Option<String>,
        participants: Vec<UserId>,
    ) -> StoreResult<Conversation> {
        self.call(move |db| db.create_group_conversation(name.as_deref(), &participants))
            .await
    }

    pub async fn get_messages(
        &self,
        conversation_id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> StoreResult<Vec<Message>> {
        self.call(move |db| db.get_messages_for_conversation(conversation_id, limit, offset))
            .await
    }

    pub async fn delete_conversation(&self, id: ConversationId) -> StoreResult<bool> {
        self.call(move |db| db.delete_conversation(id)).await
    }

    pub async fn update_user_status(&self, user: UserId, status: String) -> StoreResult<UserStatus> {
        self.call(move |db| db.update_user_status(user, &status)).await
    }

    pub async fn get_user_status(&self, user: UserId) -> StoreResult<Option<UserStatus>> {
        self.call(move |db| db.get_user_status(user)).await
    }
}
