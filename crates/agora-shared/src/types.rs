use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ID_HEX_LEN;
use crate::error::IdError;

/// Parse a 32-character hex string into the 16 raw bytes of an identifier.
fn parse_hex_id(s: &str) -> Result<Uuid, IdError> {
    if s.len() != ID_HEX_LEN {
        return Err(IdError::InvalidIdentifier(s.to_string()));
    }
    let bytes = hex::decode(s).map_err(|_| IdError::InvalidIdentifier(s.to_string()))?;
    let mut arr = [0u8; 16];
    arr.copy_from_slice(&bytes);
    Ok(Uuid::from_bytes(arr))
}

// Every identifier is 16 opaque bytes, displayed and serialized as 32
// lowercase hex characters.
macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Fresh, time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_hex(s: &str) -> Result<Self, IdError> {
                parse_hex_id(s).map(Self)
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0.as_bytes())
            }

            pub fn short(&self) -> String {
                self.to_hex()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::from_hex(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_hex()
            }
        }
    };
}

hex_id!(
    /// Identity of a user account. Owned by the account subsystem.
    UserId
);

hex_id!(
    /// Identity of a conversation (direct or group).
    ConversationId
);

hex_id!(
    /// Identity of a single message.
    MessageId
);
