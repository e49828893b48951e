//! # agora-store
//!
//! Durable storage for conversations, messages and presence, backed by
//! SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for every domain model.
//! Callers that live on an async runtime are expected to serialize access and
//! run these helpers on a blocking thread.

pub mod conversations;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
