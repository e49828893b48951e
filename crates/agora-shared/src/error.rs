use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Reasons an inbound realtime frame is dropped before dispatch.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("Unknown frame kind: {0}")]
    UnknownKind(String),

    #[error("Malformed {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind}: {source}")]
    Identifier {
        kind: &'static str,
        #[source]
        source: IdError,
    },
}

impl FrameError {
    /// Kind of the frame that failed, when it was known.
    pub fn kind(&self) -> Option<&str> {
        match self {
            FrameError::Envelope(_) => None,
            FrameError::UnknownKind(kind) => Some(kind.as_str()),
            FrameError::Payload { kind, .. } | FrameError::Identifier { kind, .. } => Some(*kind),
        }
    }
}
