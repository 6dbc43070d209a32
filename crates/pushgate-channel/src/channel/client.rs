//! Reconnecting channel client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WireCloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::backoff::ReconnectPolicy;
use super::message::{ChannelState, CloseCode};
use crate::error::ChannelError;

/// Path the gateway serves the notification channel on.
pub const CONNECT_PATH: &str = "/connect";

/// Type alias for a connected WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callback receiving every message delivered on the channel.
///
/// Exactly one of the two arguments is meaningful per invocation. The
/// error slot is reserved: current behavior always passes `None` and
/// reports connection trouble through reconnection instead.
pub type MessageHandler = Box<dyn FnMut(String, Option<ChannelError>) + Send + 'static>;

/// Configuration for a channel client.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Reconnect delay policy.
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    /// Create a configuration for the gateway at `host:port`.
    ///
    /// The host is taken as given; validating it is the caller's business.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Override the reconnect delay policy.
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// The channel endpoint URL.
    pub fn url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, CONNECT_PATH)
    }
}

/// Internal state shared between the client handle and its connection task.
struct ChannelInner {
    state: ChannelState,
    retry_count: u32,
}

/// How a transport session (or a failed attempt at one) ended.
enum SessionEnd {
    /// Close code 1001 from the gateway, or a local `close()`. The
    /// logical channel is done; no reconnect.
    Terminal,
    /// Everything else: schedule a reconnect.
    Dropped,
}

/// A reconnecting push-notification channel client.
///
/// One `ChannelClient` owns one logical channel. [`dial`](Self::dial)
/// spawns a connection task that dials the gateway, forwards inbound text
/// frames to the handler, and replaces the transport session on failure
/// after a backoff delay. Attempts are strictly sequential, so at most one
/// session is ever live. The handle stays cheap to share: it only carries the config and
/// the state the task publishes.
///
/// The loop ends in exactly two ways: the gateway closes with code 1001
/// ("going away"), or [`close`](Self::close) is called locally. Either
/// way the client parks in [`ChannelState::Closed`] until a fresh `dial`.
///
/// # Example
///
/// ```ignore
/// let client = ChannelClient::new(ChannelConfig::new("gateway.internal", 8080));
///
/// client.dial(0, |message, _error| {
///     println!("notification: {message}");
/// });
///
/// // On shutdown:
/// client.close();
/// ```
pub struct ChannelClient {
    config: ChannelConfig,
    inner: Arc<Mutex<ChannelInner>>,
    close_tx: Arc<Mutex<Option<mpsc::UnboundedSender<()>>>>,
    is_running: Arc<AtomicBool>,
}

impl ChannelClient {
    /// Create a new channel client with the given configuration.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(ChannelInner {
                state: ChannelState::Idle,
                retry_count: 0,
            })),
            close_tx: Arc::new(Mutex::new(None)),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current state of the logical channel.
    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    /// Whether a transport session is currently open.
    pub fn is_open(&self) -> bool {
        self.inner.lock().state == ChannelState::Open
    }

    /// Retry count of the attempt currently connecting or waiting.
    ///
    /// Resets to 0 the moment a session opens.
    pub fn retry_count(&self) -> u32 {
        self.inner.lock().retry_count
    }

    /// The endpoint URL this client dials.
    pub fn url(&self) -> String {
        self.config.url()
    }

    /// Start the connection loop.
    ///
    /// Returns immediately; connecting, message delivery, and reconnecting
    /// all happen on a spawned task. `retry_count` seeds the backoff, with
    /// 0 marking an initial, non-retry dial. The handler is invoked for every
    /// inbound text frame across all transport sessions of this dial.
    ///
    /// If the loop is already running, this is a no-op.
    pub fn dial<F>(&self, retry_count: u32, handler: F)
    where
        F: FnMut(String, Option<ChannelError>) + Send + 'static,
    {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return; // Already running
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.close_tx.lock() = Some(tx);

        tokio::spawn(run_channel(
            self.config.clone(),
            self.inner.clone(),
            self.close_tx.clone(),
            self.is_running.clone(),
            rx,
            retry_count,
            Box::new(handler),
        ));
    }

    /// Tear the logical channel down.
    ///
    /// Closes a live session with a normal close frame, or cancels the
    /// pending reconnect if the loop is waiting out a backoff delay. Like
    /// a terminal close from the gateway, this is absorbing; a later
    /// `dial` starts a fresh loop.
    pub fn close(&self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.close_tx.lock().as_ref() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelClient")
            .field("url", &self.url())
            .field("state", &self.state())
            .finish()
    }
}

/// Dial the push-notification channel on `host:port`.
///
/// The one entry point the hosting application needs: builds a client
/// with the default reconnect policy, starts its connection loop, and
/// returns the handle so the caller can inspect or close the channel.
/// Call it once, after the user session is established.
pub fn dial<F>(host: impl Into<String>, port: u16, retry_count: u32, handler: F) -> ChannelClient
where
    F: FnMut(String, Option<ChannelError>) + Send + 'static,
{
    let client = ChannelClient::new(ChannelConfig::new(host, port));
    client.dial(retry_count, handler);
    client
}

/// The connection loop: connect, pump, and on an unexpected close wait
/// out the backoff delay and go again. One invocation per `dial`.
async fn run_channel(
    config: ChannelConfig,
    inner: Arc<Mutex<ChannelInner>>,
    close_tx: Arc<Mutex<Option<mpsc::UnboundedSender<()>>>>,
    is_running: Arc<AtomicBool>,
    mut close_rx: mpsc::UnboundedReceiver<()>,
    mut retry_count: u32,
    mut handler: MessageHandler,
) {
    let url = config.url();

    loop {
        {
            let mut guard = inner.lock();
            guard.state = if retry_count > 0 {
                ChannelState::Reconnecting
            } else {
                ChannelState::Connecting
            };
            guard.retry_count = retry_count;
        }

        // Computed before the attempt: this is how long to wait before the
        // next attempt if this one fails, even when this attempt opens
        // successfully first and the session drops later.
        let delay = config.reconnect.delay_for_attempt(retry_count);

        tracing::debug!(target: "pushgate_channel::channel", %url, retry_count, "dialing gateway");

        let end = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                // Successful open resets the backoff.
                retry_count = 0;
                {
                    let mut guard = inner.lock();
                    guard.state = ChannelState::Open;
                    guard.retry_count = 0;
                }
                tracing::info!(target: "pushgate_channel::channel", %url, "channel connected");

                pump_session(stream, &mut handler, &mut close_rx).await
            }
            Err(err) => {
                let err = ChannelError::Connect(err.to_string());
                tracing::warn!(target: "pushgate_channel::channel", %url, error = %err, "connect attempt failed");
                SessionEnd::Dropped
            }
        };

        match end {
            SessionEnd::Terminal => break,
            SessionEnd::Dropped => {
                inner.lock().state = ChannelState::Reconnecting;
                tracing::info!(
                    target: "pushgate_channel::channel",
                    delay_secs = delay.as_secs_f64(),
                    "reconnecting after backoff"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = close_rx.recv() => break,
                }
                // close() may have raced the sleep.
                if !is_running.load(Ordering::SeqCst) {
                    break;
                }

                retry_count += 1;
            }
        }
    }

    *close_tx.lock() = None;
    inner.lock().state = ChannelState::Closed;
    is_running.store(false, Ordering::SeqCst);
}

/// Pump one live session: forward text frames to the handler until the
/// session ends, and report how it ended.
async fn pump_session(
    stream: WsStream,
    handler: &mut MessageHandler,
    close_rx: &mut mpsc::UnboundedReceiver<()>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            // Local close() while the session is live.
            _ = close_rx.recv() => {
                let frame = CloseFrame {
                    code: WireCloseCode::Normal,
                    reason: "client closing".into(),
                };
                let _ = write.send(Message::Close(Some(frame))).await;
                tracing::info!(target: "pushgate_channel::channel", "channel closed locally");
                return SessionEnd::Terminal;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(target: "pushgate_channel::channel", len = text.len(), "message received");
                        handler(text.to_string(), None);
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // Framing anomaly: diagnostics only, the session stays up.
                        tracing::error!(target: "pushgate_channel::channel", len = data.len(), "unexpected binary frame dropped");
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pong replies are handled by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame
                            .as_ref()
                            .map(|f| CloseCode::from_u16(u16::from(f.code)))
                            .unwrap_or(CloseCode::NoStatus);
                        let reason = frame.as_ref().map(|f| f.reason.to_string()).unwrap_or_default();
                        tracing::info!(
                            target: "pushgate_channel::channel",
                            code = code.as_u16(),
                            %reason,
                            "channel disconnected"
                        );
                        if code.is_terminal() {
                            tracing::info!(target: "pushgate_channel::channel", "gateway is going away, not reconnecting");
                            return SessionEnd::Terminal;
                        }
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frame, ignore
                    }
                    Some(Err(err)) => {
                        let err = ChannelError::Transport(err.to_string());
                        tracing::warn!(target: "pushgate_channel::channel", error = %err, "transport error");
                        return SessionEnd::Dropped;
                    }
                    None => {
                        // Stream ended without a close frame.
                        return SessionEnd::Dropped;
                    }
                }
            }
        }
    }
}
