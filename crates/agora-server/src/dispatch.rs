//! Fan-out of persisted messages to connected participants.
//!
//! Delivery is online-only and best effort: a participant without a registry
//! entry gets nothing, and a failed write is logged and skipped. The message
//! is already durable by the time fan-out starts.

use std::sync::Arc;

use agora_shared::UserId;
use agora_store::{Message, StoreError};
use tracing::{debug, error, warn};

use crate::frames::ServerFrame;
use crate::registry::ConnectionRegistry;
use crate::store::Store;

/// Outcome of one fan-out, per participant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub offline: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    store: Store,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, store: Store) -> Self {
        Self { registry, store }
    }

    /// Push a new message to every reachable participant.
    pub async fn message_created(&self, message: &Message) -> FanOutReport {
        self.fan_out(message, ServerFrame::ConversationsUpdate(message))
            .await
    }

    /// Push an edited message to every reachable participant.
    pub async fn message_edited(&self, message: &Message) -> FanOutReport {
        self.fan_out(message, ServerFrame::MessageEdited(message)).await
    }

    async fn fan_out(&self, message: &Message, frame: ServerFrame<'_>) -> FanOutReport {
        let participants = match self.store.get_conversation(message.conversation_id).await {
            Ok(conversation) => conversation.participants,
            Err(StoreError::ConversationNotFound(id)) => {
                warn!(
                    conversation = %id,
                    message = %message.id,
                    "conversation vanished before fan-out; skipping"
                );
                return FanOutReport::default();
            }
            Err(e) => {
                error!(
                    conversation = %message.conversation_id,
                    error = %e,
                    "failed to resolve participants"
                );
                return FanOutReport::default();
            }
        };

        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                error!(frame = frame.name(), error = %e, "failed to encode frame");
                return FanOutReport::default();
            }
        };

        let report = self.deliver(&participants, &text, frame.name());
        debug!(
            conversation = %message.conversation_id,
            message = %message.id,
            frame = frame.name(),
            delivered = report.delivered,
            offline = report.offline,
            failed = report.failed,
            "fan-out complete"
        );
        report
    }

    /// Queue `text` on each participant's connection. Every participant is
    /// attempted regardless of earlier failures.
    pub fn deliver(&self, participants: &[UserId], text: &Arc<str>, frame: &str) -> FanOutReport {
        let mut report = FanOutReport::default();

        for &user in participants {
            let Some(connection) = self.registry.lookup(user) else {
                report.offline += 1;
                continue;
            };

            match connection.send(Arc::clone(text)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        user = %user.short(),
                        connection = connection.id(),
                        frame,
                        error = %e,
                        "write to participant failed"
                    );
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Connection;
    use agora_shared::ConversationId;
    use serde_json::Value;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        store: Store,
        dispatcher: Dispatcher,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Store::open_in_memory().unwrap();
        let dispatcher = Dispatcher::new(Arc::clone(&registry), store.clone());
        Fixture {
            registry,
            store,
            dispatcher,
        }
    }

    #[tokio::test]
    async fn save_then_fan_out_reaches_both_participants() {
        let f = fixture();
        let (a, b) = (UserId::new(), UserId::new());
        let (conn_a, mut rx_a) = Connection::channel(a, 8);
        let (conn_b, mut rx_b) = Connection::channel(b, 8);
        f.registry.register(conn_a);
        f.registry.register(conn_b);

        let (conv, _) = f.store.find_or_create_direct_conversation(a, b).await.unwrap();
        let msg = f
            .store
            .save_message(a, conv.id, "hi".into(), Vec::new())
            .await
            .unwrap();

        let report = f.dispatcher.message_created(&msg).await;
        assert_eq!(
            report,
            FanOutReport {
                delivered: 2,
                offline: 0,
                failed: 0
            }
        );

        for rx in [&mut rx_a, &mut rx_b] {
            let frame: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            assert_eq!(frame["type"], "conversations_update");
            assert_eq!(frame["message"]["id"], msg.id.to_hex());
            assert_eq!(frame["message"]["content"], "hi");
        }

        let stored = f.store.get_conversation(conv.id).await.unwrap();
        assert_eq!(stored.last_message, Some(msg));
    }

    #[tokio::test]
    async fn offline_participant_is_skipped() {
        let f = fixture();
        let (a, b) = (UserId::new(), UserId::new());
        let (conn_a, mut rx_a) = Connection::channel(a, 8);
        f.registry.register(conn_a);

        let (conv, _) = f.store.find_or_create_direct_conversation(a, b).await.unwrap();
        let msg = f
            .store
            .save_message(b, conv.id, "you there?".into(), Vec::new())
            .await
            .unwrap();

        let report = f.dispatcher.message_created(&msg).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.offline, 1);
        assert_eq!(report.failed, 0);
        assert!(rx_a.recv().await.is_some());
    }

    #[tokio::test]
    async fn stalled_participant_does_not_block_others() {
        let f = fixture();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let (stalled, _rx_a) = Connection::channel(a, 1);
        stalled.send(Arc::from("backlog")).unwrap();
        let (closed, rx_b) = Connection::channel(b, 8);
        drop(rx_b);
        let (healthy, mut rx_c) = Connection::channel(c, 8);
        f.registry.register(stalled);
        f.registry.register(closed);
        f.registry.register(healthy);

        let group = f
            .store
            .create_group_conversation(None, vec![a, b, c])
            .await
            .unwrap();
        let msg = f
            .store
            .save_message(a, group.id, "hello all".into(), Vec::new())
            .await
            .unwrap();

        let report = f.dispatcher.message_created(&msg).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 2);
        assert!(rx_c.recv().await.is_some());

        // Failed writes leave registry entries to their owning sessions.
        assert!(f.registry.lookup(a).is_some());
        assert!(f.registry.lookup(b).is_some());
    }

    #[tokio::test]
    async fn edit_is_pushed_as_bare_message() {
        let f = fixture();
        let (a, b) = (UserId::new(), UserId::new());
        let (conn_b, mut rx_b) = Connection::channel(b, 8);
        f.registry.register(conn_b);

        let (conv, _) = f.store.find_or_create_direct_conversation(a, b).await.unwrap();
        let msg = f
            .store
            .save_message(a, conv.id, "helo".into(), Vec::new())
            .await
            .unwrap();
        let edited = f
            .store
            .save_edited_message(msg.id, "hello".into(), conv.id, a)
            .await
            .unwrap();

        f.dispatcher.message_edited(&edited).await;
        let frame: Message = serde_json::from_str(&rx_b.recv().await.unwrap()).unwrap();
        assert_eq!(frame, edited);
    }

    #[tokio::test]
    async fn vanished_conversation_skips_fan_out() {
        let f = fixture();
        let (a, b) = (UserId::new(), UserId::new());
        let (conn_a, mut rx_a) = Connection::channel(a, 8);
        f.registry.register(conn_a);

        let (conv, _) = f.store.find_or_create_direct_conversation(a, b).await.unwrap();
        let msg = f
            .store
            .save_message(a, conv.id, "last words".into(), Vec::new())
            .await
            .unwrap();
        f.store.delete_conversation(conv.id).await.unwrap();

        assert_eq!(f.dispatcher.message_created(&msg).await, FanOutReport::default());
        assert!(rx_a.try_recv().is_err());

        let orphan = Message {
            conversation_id: ConversationId::new(),
            ..msg
        };
        assert_eq!(f.dispatcher.message_edited(&orphan).await, FanOutReport::default());
    }
}
