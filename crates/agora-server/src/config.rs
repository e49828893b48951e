//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use agora_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_OUTBOUND_BUFFER, MAX_FRAME_SIZE};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP and websocket listener.
    /// Env: `HTTP_ADDR`, port overridable with `PORT`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (platform data directory)
    pub database_path: Option<PathBuf>,

    /// HS256 secret used to verify bearer tokens.
    /// Env: `JWT_SECRET`
    /// Default: unset (client-supplied `userID` is trusted)
    pub jwt_secret: Option<String>,

    /// Capacity of each connection's outbound queue.
    /// Env: `OUTBOUND_BUFFER`
    pub outbound_buffer: usize,

    /// Largest inbound websocket frame accepted, in bytes.
    /// Env: `MAX_FRAME_SIZE`
    pub max_frame_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            jwt_secret: None,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

// The secret must never reach the logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("outbound_buffer", &self.outbound_buffer)
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. `from_env` uses the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        // Hosting platforms usually hand out a bare port.
        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(p) => config.http_addr.set_port(p),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, ignoring"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(secret) = lookup("JWT_SECRET") {
            if !secret.is_empty() {
                config.jwt_secret = Some(secret);
            }
        }

        if let Some(val) = lookup("OUTBOUND_BUFFER") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.outbound_buffer = n,
                _ => tracing::warn!(value = %val, "Invalid OUTBOUND_BUFFER, using default"),
            }
        }

        if let Some(val) = lookup("MAX_FRAME_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_frame_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_FRAME_SIZE, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
