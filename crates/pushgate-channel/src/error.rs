//! Error types for the channel client.

use thiserror::Error;

/// Channel-specific errors.
///
/// The channel handles every failure internally: connect errors and
/// transport errors feed the reconnect loop, never the caller. The only
/// place this type crosses the public API today is the reserved error slot
/// of the message callback, which current behavior always leaves `None`.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// Dialing the gateway failed before a session opened.
    #[error("connect error: {0}")]
    Connect(String),
    /// The transport reported a protocol error mid-session.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A specialized Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
