/// Application name
pub const APP_NAME: &str = "Agora";

/// Identifier size in bytes
pub const ID_SIZE: usize = 16;

/// Identifier length in hex characters
pub const ID_HEX_LEN: usize = ID_SIZE * 2;

/// Maximum inbound realtime frame size in bytes (256 KiB)
pub const MAX_FRAME_SIZE: usize = 262_144;

/// Default per-connection outbound queue capacity
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default page size for message history
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound for a single page of message history
pub const MAX_PAGE_SIZE: u32 = 200;
