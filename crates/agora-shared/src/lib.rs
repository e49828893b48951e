//! # agora-shared
//!
//! Types shared by the store and the server: hex identifiers, the realtime
//! wire protocol, and protocol-level errors.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{FrameError, IdError};
pub use types::{ConversationId, MessageId, UserId};
