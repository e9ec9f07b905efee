//! Live Channel Transports
//!
//! Provides abstraction over the channel that pushes new log entries:
//! - `InProcess`: Direct channel communication (embedding, tests)
//! - `WebSocket`: StatusHub server streams (`websocket` feature)
//!
//! The transport only moves messages. Ordering, deduplication and recovery
//! belong to [`LiveLogStream`](crate::streaming::LiveLogStream).

pub mod in_process;
pub mod traits;
#[cfg(feature = "websocket")]
pub mod websocket;

// Re-exports for convenience
pub use in_process::{MemoryConnection, MemoryTransport, MemoryTransportHandle};
pub use traits::{ChannelCloser, LogTransport, TransportChannel, TransportError, TransportEvent};

#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
