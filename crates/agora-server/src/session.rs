//! Realtime session lifecycle, from upgrade to close.
//!
//! A session is two tasks: the read loop below, which decodes and dispatches
//! inbound frames one at a time, and a writer task that owns the websocket
//! sink and drains the connection's outbound queue. The registry entry is
//! held by a [`Registration`](crate::registry::Registration) guard, so it is
//! released on every exit path from the read loop, panics included.

use agora_shared::protocol::{Command, EditMessage, SendMessage};
use agora_shared::{FrameError, UserId};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::api::AppState;
use crate::error::SessionError;
use crate::frames::ServerFrame;
use crate::registry::Connection;

/// Drive one websocket until the peer goes away.
pub async fn run(socket: WebSocket, user: UserId, authenticated: bool, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (connection, mut outbound) = Connection::channel(user, state.config.outbound_buffer);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let connection_id = connection.id();

    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(text) => {
                        if sink.send(WsMessage::Text(text.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                // Fires on an explicit shutdown and when the read loop
                // unwinds without sending one.
                _ = &mut shutdown_rx => break,
            }
        }
        let _ = sink.send(WsMessage::Close(None)).await;
        let _ = sink.close().await;
    });

    let registration = state.registry.attach(connection);
    let session = Session::new(user, authenticated, registration.connection().clone(), state);
    info!(
        user = %user.short(),
        connection = connection_id,
        authenticated,
        "session active"
    );

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(user = %user.short(), error = %e, "read failed; closing session");
                break;
            }
        };

        let text = match frame {
            WsMessage::Text(text) => text.as_str().to_owned(),
            WsMessage::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    debug!(user = %user.short(), len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            WsMessage::Close(_) => {
                debug!(user = %user.short(), "client sent close frame");
                break;
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
        };

        if let Err(e) = session.handle_text(&text).await {
            session.report_dropped(&e);
        }
    }

    drop(registration);
    let _ = shutdown_tx.send(());
    let _ = writer.await;
    info!(user = %user.short(), connection = connection_id, "session closed");
}

/// Per-connection frame handling, independent of the socket.
pub struct Session {
    user: UserId,
    authenticated: bool,
    connection: Connection,
    state: AppState,
}

impl Session {
    pub fn new(user: UserId, authenticated: bool, connection: Connection, state: AppState) -> Self {
        Self {
            user,
            authenticated,
            connection,
            state,
        }
    }

    /// Decode and execute one inbound text frame. An error means the frame
    /// was dropped; the session itself is unaffected.
    pub async fn handle_text(&self, text: &str) -> Result<(), SessionError> {
        let command = Command::parse(text)?;

        // A token-verified session may only act as itself.
        let claimed = command.claimed_user();
        if self.authenticated && claimed != self.user {
            return Err(SessionError::IdentityMismatch {
                kind: command.kind(),
                session: self.user,
                claimed,
            });
        }

        self.dispatch(command).await
    }

    async fn dispatch(&self, command: Command) -> Result<(), SessionError> {
        let store = &self.state.store;
        let kind = command.kind();
        let rejected = |source| SessionError::Store { kind, source };

        match command {
            Command::SendMessage(SendMessage {
                sender_id,
                conversation_id,
                content,
                attachments,
            }) => {
                let message = store
                    .save_message(sender_id, conversation_id, content, attachments)
                    .await
                    .map_err(rejected)?;
                debug!(
                    user = %self.user.short(),
                    conversation = %conversation_id,
                    message = %message.id,
                    "message saved"
                );
                self.state.dispatcher.message_created(&message).await;
            }
            Command::EditMessage(EditMessage {
                message_id,
                content,
                conversation_id,
                sender_id,
            }) => {
                let message = store
                    .save_edited_message(message_id, content, conversation_id, sender_id)
                    .await
                    .map_err(rejected)?;
                debug!(
                    user = %self.user.short(),
                    message = %message.id,
                    "message edited"
                );
                self.state.dispatcher.message_edited(&message).await;
            }
            Command::GetConversations { user_id } => {
                let conversations = store.get_conversations(user_id).await.map_err(rejected)?;
                let frame = ServerFrame::Conversations(&conversations)
                    .encode()
                    .map_err(|source| SessionError::Encode { kind, source })?;
                if let Err(e) = self.connection.send(frame) {
                    warn!(
                        user = %self.user.short(),
                        error = %e,
                        "could not queue conversation list"
                    );
                }
            }
            Command::UpdateStatus { user_id, status } => {
                // Presence is best effort.
                if let Err(e) = store.update_user_status(user_id, status).await {
                    warn!(user = %user_id.short(), error = %e, "failed to store status");
                }
            }
        }

        Ok(())
    }

    pub fn report_dropped(&self, err: &SessionError) {
        let user = self.user.short();
        match err {
            SessionError::Frame(FrameError::UnknownKind(kind)) => {
                warn!(user = %user, kind = %kind, error = %err, "ignoring frame of unknown kind");
            }
            SessionError::Frame(e) => {
                warn!(
                    user = %user,
                    kind = e.kind().unwrap_or("-"),
                    error = %e,
                    "dropping malformed frame"
                );
            }
            SessionError::IdentityMismatch { kind, claimed, .. } => {
                warn!(
                    user = %user,
                    kind = %kind,
                    claimed = %claimed.short(),
                    error = %err,
                    "dropping frame claiming another identity"
                );
            }
            SessionError::Store { kind, source } => {
                warn!(
                    user = %user,
                    kind = %kind,
                    error = %source,
                    "dropping frame the store rejected"
                );
            }
            SessionError::Encode { kind, source } => {
                error!(
                    user = %user,
                    kind = %kind,
                    error = %source,
                    "failed to encode reply"
                );
            }
        }
    }
}
