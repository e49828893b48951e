//! # agora-server
//!
//! Realtime messaging server: websocket sessions, the connection registry,
//! fan-out of persisted messages, and a small REST surface over the store.

pub mod api;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frames;
pub mod registry;
pub mod session;
pub mod store;

pub use api::{build_router, serve, serve_on, AppState};
pub use config::ServerConfig;
