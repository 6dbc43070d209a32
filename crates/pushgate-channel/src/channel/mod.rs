//! Reconnecting push-notification channel.
//!
//! The channel is a long-lived, receive-only WebSocket connection to a
//! Pushgate gateway. One logical channel spans any number of underlying
//! transport sessions: when a session drops unexpectedly the client waits
//! out a backoff delay and dials a replacement, carrying the same observer
//! callback forward. At most one transport session is live at a time.
//!
//! # Example
//!
//! ```ignore
//! use pushgate_channel::channel::{ChannelClient, ChannelConfig};
//!
//! let config = ChannelConfig::new("gateway.internal", 8080);
//! let client = ChannelClient::new(config);
//!
//! client.dial(0, |message, _error| {
//!     println!("notification: {message}");
//! });
//! ```

mod backoff;
mod client;
mod message;

pub use backoff::ReconnectPolicy;
pub use client::{CONNECT_PATH, ChannelClient, ChannelConfig, MessageHandler, dial};
pub use message::{ChannelState, CloseCode};
