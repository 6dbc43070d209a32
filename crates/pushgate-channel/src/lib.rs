//! Reconnecting push-notification channel client for Pushgate.
//!
//! A Pushgate gateway pushes notifications to clients over a single
//! WebSocket endpoint at `/connect`. This crate owns the client side of
//! that channel: it dials the gateway, forwards every inbound text frame
//! to an observer callback, and when the session drops unexpectedly it
//! waits out a backoff delay and dials again, for as long as the process
//! lives or until the gateway says it is going away.
//!
//! # Dialing the channel
//!
//! ```ignore
//! use pushgate_channel::dial;
//!
//! // After the user session is established:
//! let client = dial("gateway.internal", 8080, 0, |message, _error| {
//!     println!("notification: {message}");
//! });
//!
//! // ...much later, on shutdown:
//! client.close();
//! ```
//!
//! `dial` returns immediately; the connection loop runs on a spawned tokio
//! task. The same callback is carried across every reconnect, so the
//! hosting application registers it exactly once.
//!
//! # Reconnect behavior
//!
//! - The first attempt of a dial waits a small randomized window (3-5 s by
//!   default) before a retry, which spreads out reconnect storms when many
//!   clients restart at once.
//! - Retry `n` waits `e^n` seconds. There is no upper cap; see
//!   [`ReconnectPolicy`] for the exact law.
//! - A close with code 1001 ("going away") is the gateway ending the
//!   session on purpose: the client stops for good. Every other close code
//!   schedules exactly one reconnect.
//! - Binary frames are not part of the channel protocol; they are logged
//!   and dropped without disturbing the session.

pub mod channel;
mod error;

pub use error::{ChannelError, Result};

// Re-export commonly used types at the crate root
pub use channel::{
    CONNECT_PATH, ChannelClient, ChannelConfig, ChannelState, CloseCode, MessageHandler,
    ReconnectPolicy, dial,
};
