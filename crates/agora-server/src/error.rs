use agora_shared::{FrameError, UserId};
use agora_store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConversationNotFound(_) | StoreError::MessageNotFound(_) => {
                ServerError::NotFound(e.to_string())
            }
            StoreError::InvalidConversation(_) | StoreError::Id(_) => {
                ServerError::BadRequest(e.to_string())
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Why one inbound realtime frame was dropped. None of these end the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("{kind} frame claims {claimed} but the session belongs to {session}")]
    IdentityMismatch {
        kind: &'static str,
        session: UserId,
        claimed: UserId,
    },

    #[error("{kind} frame rejected by the store: {source}")]
    Store {
        kind: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode {kind} reply: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    /// Kind of the frame that was dropped, when it got far enough to have one.
    pub fn kind(&self) -> Option<&str> {
        match self {
            SessionError::Frame(e) => e.kind(),
            SessionError::IdentityMismatch { kind, .. }
            | SessionError::Store { kind, .. }
            | SessionError::Encode { kind, .. } => Some(*kind),
        }
    }
}

/// A single write to a connection's outbound queue failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The peer is not draining its queue.
    #[error("outbound queue full")]
    Full,

    /// The session owning the connection has ended.
    #[error("connection closed")]
    Closed,
}
