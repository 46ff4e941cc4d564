//! # Inventory Channel
//!
//! WebSocket client with explicit connect/disconnect and fixed-interval
//! reconnection.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Inventory Channel States                             │
//! │                                                                         │
//! │  ┌────────────┐   connect()    ┌────────────┐                          │
//! │  │Disconnected│ ─────────────► │ Connecting │                          │
//! │  └────────────┘                └─────┬──────┘                          │
//! │        ▲                             │                                  │
//! │        │                   success   │   failure                       │
//! │        │                       ┌─────┴─────┐                           │
//! │        │                       ▼           ▼                            │
//! │        │             ┌────────────┐  ┌────────────┐  attempts          │
//! │        │             │ Connected  │  │  Backoff   │─ exhausted ─┐      │
//! │        │             └─────┬──────┘  └─────┬──────┘             ▼      │
//! │        │                   │               │              ┌─────────┐  │
//! │        │     disconnect()/ │               │ fixed        │ Failed  │  │
//! │        │     connection    │               │ interval     └────┬────┘  │
//! │        │     lost          ▼               │ elapsed           │       │
//! │        │             ┌────────────┐        │     parks until next      │
//! │        └──────────── │ (retrying) │ ◄──────┘     explicit connect()    │
//! │                      └────────────┘                                    │
//! │                                                                         │
//! │  RECONNECT STRATEGY (Fixed Interval)                                   │
//! │  ───────────────────────────────────                                   │
//! │  Attempt 1..max_reconnect_attempts, reconnect_interval apart.          │
//! │  Exhaustion emits ChannelEvent::ReconnectFailed and schedules          │
//! │  NOTHING further - stale stock data is an accepted degraded mode.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use caja_core::types::InventoryChangeEvent;

use crate::config::ChannelConfig;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{ClientMessage, ServerMessage};

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for the inventory channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected, not trying.
    Disconnected,
    /// Attempting to connect.
    Connecting,
    /// Connected and subscribed.
    Connected,
    /// Waiting out the fixed interval before the next attempt.
    Backoff,
    /// Retry budget exhausted; parked until an explicit connect.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Backoff => write!(f, "backoff"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Events & Commands
// =============================================================================

/// What the channel reports back to its subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Connection established and subscription sent.
    Connected,
    /// Connection ended (requested or lost).
    Disconnected,
    /// A stock change pushed by the backend.
    InventoryChange(InventoryChangeEvent),
    /// The retry budget ran out; no further reconnect is scheduled.
    ReconnectFailed { attempts: u32 },
}

/// Commands the handle sends to the channel task.
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Send(ClientMessage),
    Shutdown,
}

/// How a connected session ended.
enum SessionEnd {
    /// The connection dropped out from under us; retrying is appropriate.
    Lost,
    /// The operator asked for the disconnect; do not retry.
    Requested,
    /// The whole channel is shutting down.
    Shutdown,
}

/// How a connect/retry cycle ended.
enum CycleEnd {
    /// Back to idle; wait for the next command.
    Idle,
    /// The whole channel is shutting down.
    Shutdown,
}

// =============================================================================
// Channel Handle
// =============================================================================

/// Handle for interacting with the channel from other components.
///
/// All operations are explicit; nothing connects or reconnects behind the
/// caller's back. Dropping every handle tears the task down.
#[derive(Clone)]
pub struct ChannelHandle {
    cmd_tx: mpsc::Sender<Command>,
    state: Arc<RwLock<ConnectionState>>,
}

impl ChannelHandle {
    /// Starts connecting (or reconnecting after a `Failed` park).
    pub async fn connect(&self) -> SyncResult<()> {
        self.command(Command::Connect).await
    }

    /// Closes the current connection without retrying.
    pub async fn disconnect(&self) -> SyncResult<()> {
        self.command(Command::Disconnect).await
    }

    /// Sends a message over the channel (dropped with a warning when not
    /// connected).
    pub async fn send(&self, message: ClientMessage) -> SyncResult<()> {
        self.command(Command::Send(message)).await
    }

    /// Stops the channel task entirely.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.command(Command::Shutdown).await
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Returns true if currently connected.
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    async fn command(&self, command: Command) -> SyncResult<()> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| SyncError::Channel("Channel task is gone".into()))
    }
}

// =============================================================================
// Inventory Channel
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The inventory push-channel client.
///
/// ## Usage
/// ```rust,ignore
/// let config = ChannelConfig {
///     endpoint: "wss://pos.example.com".into(),
///     branch_id: "branch-7".into(),
///     token: token.clone(),
///     ..Default::default()
/// };
///
/// let (handle, mut events) = InventoryChannel::spawn(config);
/// handle.connect().await?;
///
/// while let Some(event) = events.recv().await {
///     if let ChannelEvent::InventoryChange(change) = event {
///         cart_store.apply_inventory_change(&change);
///     }
/// }
/// ```
pub struct InventoryChannel {
    config: ChannelConfig,
    state: Arc<RwLock<ConnectionState>>,
    cmd_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<ChannelEvent>,
}

impl InventoryChannel {
    /// Creates the channel and spawns its background task.
    ///
    /// Returns a handle for explicit operations and the event stream.
    /// The task does NOT connect until [`ChannelHandle::connect`] is called.
    pub fn spawn(config: ChannelConfig) -> (ChannelHandle, mpsc::Receiver<ChannelEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(32);
        let (events_tx, events_rx) = mpsc::channel::<ChannelEvent>(100);
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));

        let channel = InventoryChannel {
            config,
            state: state.clone(),
            cmd_rx,
            events_tx,
        };

        tokio::spawn(channel.run());

        let handle = ChannelHandle { cmd_tx, state };
        (handle, events_rx)
    }

    /// Main command loop: idle until told to connect.
    async fn run(mut self) {
        info!(branch_id = %self.config.branch_id, "Inventory channel task starting");

        loop {
            match self.cmd_rx.recv().await {
                None | Some(Command::Shutdown) => break,
                Some(Command::Connect) => {
                    if let CycleEnd::Shutdown = self.connect_cycle().await {
                        break;
                    }
                }
                Some(Command::Disconnect) => {
                    debug!("Disconnect requested while already disconnected");
                }
                Some(Command::Send(msg)) => {
                    warn!(msg_type = %msg.type_name(), "Not connected, dropping outgoing message");
                }
            }
        }

        *self.state.write().await = ConnectionState::Disconnected;
        info!("Inventory channel task stopped");
    }

    /// Connect-retry cycle: runs until the operator disconnects, the retry
    /// budget is exhausted, or shutdown.
    async fn connect_cycle(&mut self) -> CycleEnd {
        let mut attempts: u32 = 0;

        loop {
            *self.state.write().await = ConnectionState::Connecting;

            match self.connect_once().await {
                Ok(ws) => {
                    info!("Inventory channel connected");
                    attempts = 0;
                    *self.state.write().await = ConnectionState::Connected;
                    let _ = self.events_tx.send(ChannelEvent::Connected).await;

                    let end = self.session(ws).await;

                    *self.state.write().await = ConnectionState::Disconnected;
                    let _ = self.events_tx.send(ChannelEvent::Disconnected).await;

                    match end {
                        SessionEnd::Requested => return CycleEnd::Idle,
                        SessionEnd::Shutdown => return CycleEnd::Shutdown,
                        SessionEnd::Lost => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempts + 1, "Failed to connect");
                }
            }

            attempts += 1;
            if attempts >= self.config.max_reconnect_attempts {
                error!(attempts, "Reconnect attempts exhausted, parking channel");
                *self.state.write().await = ConnectionState::Failed;
                let _ = self
                    .events_tx
                    .send(ChannelEvent::ReconnectFailed { attempts })
                    .await;
                return CycleEnd::Idle;
            }

            // Fixed-interval wait, interruptible by commands.
            *self.state.write().await = ConnectionState::Backoff;
            debug!(
                interval_ms = self.config.reconnect_interval.as_millis() as u64,
                attempt = attempts,
                "Waiting before reconnect"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_interval) => {}
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Shutdown) => return CycleEnd::Shutdown,
                    Some(Command::Disconnect) => {
                        *self.state.write().await = ConnectionState::Disconnected;
                        return CycleEnd::Idle;
                    }
                    Some(Command::Connect) => {} // Already reconnecting
                    Some(Command::Send(msg)) => {
                        warn!(msg_type = %msg.type_name(), "Not connected, dropping outgoing message");
                    }
                },
            }
        }
    }

    /// Opens the WebSocket with the configured timeout.
    async fn connect_once(&self) -> SyncResult<WsStream> {
        let url = self.config.url()?;
        debug!(url = %url, "Opening inventory channel");

        match timeout(self.config.connect_timeout, connect_async(url.as_str())).await {
            Ok(Ok((ws_stream, response))) => {
                debug!(status = ?response.status(), "WebSocket handshake complete");
                Ok(ws_stream)
            }
            Ok(Err(e)) => Err(SyncError::from(e)),
            Err(_) => Err(SyncError::Timeout(self.config.connect_timeout.as_secs())),
        }
    }

    /// One connected session: subscribe, then pump messages and keepalives
    /// until something ends it.
    async fn session(&mut self, ws_stream: WsStream) -> SessionEnd {
        let (mut write, mut read) = ws_stream.split();

        // Subscription goes out exactly once per successful connect.
        match ClientMessage::subscribe_inventory().to_json() {
            Ok(json) => {
                if let Err(e) = write.send(WsMessage::Text(json.into())).await {
                    warn!(error = %e, "Failed to send subscription");
                    return SessionEnd::Lost;
                }
                debug!("Subscription sent");
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize subscription");
                return SessionEnd::Lost;
            }
        }

        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Commands from the handle
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Shutdown) => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        return SessionEnd::Shutdown;
                    }
                    Some(Command::Disconnect) => {
                        info!("Disconnect requested, closing channel");
                        let _ = write.send(WsMessage::Close(None)).await;
                        return SessionEnd::Requested;
                    }
                    Some(Command::Connect) => {
                        debug!("Connect requested while already connected");
                    }
                    Some(Command::Send(msg)) => {
                        match msg.to_json() {
                            Ok(json) => {
                                debug!(msg_type = %msg.type_name(), "Sending message");
                                if let Err(e) = write.send(WsMessage::Text(json.into())).await {
                                    error!(error = %e, "Send failed");
                                    return SessionEnd::Lost;
                                }
                            }
                            Err(e) => warn!(error = %e, "Failed to serialize message"),
                        }
                    }
                },

                // Inbound traffic
                incoming = read.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        match ServerMessage::from_json(&text) {
                            Ok(msg) => {
                                debug!(msg_type = %msg.type_name(), "Received message");
                                match msg {
                                    change @ ServerMessage::InventoryChange { .. } => {
                                        if let Some(event) = change.into_inventory_event() {
                                            info!(
                                                product_id = %event.product_id,
                                                new_stock = event.new_stock,
                                                "Stock change received"
                                            );
                                            if self
                                                .events_tx
                                                .send(ChannelEvent::InventoryChange(event))
                                                .await
                                                .is_err()
                                            {
                                                warn!("Event receiver dropped, closing channel");
                                                return SessionEnd::Requested;
                                            }
                                        }
                                    }
                                    ServerMessage::Pong { .. } => {
                                        debug!("Received keepalive pong");
                                    }
                                    ServerMessage::Error { code, message } => {
                                        warn!(%code, %message, "Backend reported channel error");
                                    }
                                }
                            }
                            // Malformed traffic is dropped, never fatal.
                            Err(e) => warn!(error = %e, "Dropping unparseable message"),
                        }
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        if write.send(WsMessage::Pong(data)).await.is_err() {
                            return SessionEnd::Lost;
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {
                        debug!("Received pong frame");
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!(?frame, "Received close frame");
                        return SessionEnd::Lost;
                    }
                    Some(Ok(WsMessage::Binary(_))) => {
                        warn!("Received unexpected binary message");
                    }
                    Some(Ok(WsMessage::Frame(_))) => {
                        // Raw frame, ignore
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        return SessionEnd::Lost;
                    }
                    None => {
                        info!("Channel stream ended");
                        return SessionEnd::Lost;
                    }
                },

                // Periodic keepalive
                _ = ping_interval.tick() => {
                    match ClientMessage::ping().to_json() {
                        Ok(json) => {
                            if write.send(WsMessage::Text(json.into())).await.is_err() {
                                return SessionEnd::Lost;
                            }
                            debug!("Sent keepalive ping");
                        }
                        Err(e) => warn!(error = %e, "Failed to serialize ping"),
                    }
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
