//! Reya WebSocket transport
//!
//! Socket plumbing for the stream client. Each opened connection runs in
//! its own task and reports back through a single event channel, so the
//! stream client sees open/message/close events in arrival order and never
//! blocks on I/O. Reconnect timers work the same way: a fired timer is just
//! another event on its own channel.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use tracker_core::{
    ConnectionId, ReconnectTimer, TimerId, TrackerError, TrackerResult, Transport, TransportEvent,
};

/// Reya WebSocket URL
pub const REYA_WS_URL: &str = "wss://ws.reya.xyz";

// ============================================================================
// WebSocket Transport
// ============================================================================

/// tokio-tungstenite backed [`Transport`]
pub struct WsTransport {
    url: String,
    /// Events for every connection opened by this transport
    events: mpsc::UnboundedSender<TransportEvent>,
    /// Outbound frame queues of live connections; dropping one closes the socket
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

impl WsTransport {
    /// Create a transport and the receiver its events arrive on
    pub fn new(url: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                url: url.into(),
                events,
                connections: HashMap::new(),
            },
            events_rx,
        )
    }

    /// Connection task: handshake, then pump frames both ways until either
    /// side goes away
    async fn run_connection(
        id: ConnectionId,
        url: String,
        events: mpsc::UnboundedSender<TransportEvent>,
        mut outbound: mpsc::UnboundedReceiver<Message>,
    ) {
        info!("[Reya WS] Connecting to {} ({})", url, id);

        let ws_stream = match connect_async(url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                error!("[Reya WS] Connection failed ({}): {}", id, e);
                let _ = events.send(TransportEvent::Error(id, e.to_string()));
                let _ = events.send(TransportEvent::Closed(id));
                return;
            }
        };

        info!("[Reya WS] Connected successfully ({})", id);
        let _ = events.send(TransportEvent::Opened(id));

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                // Handle incoming messages
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if events.send(TransportEvent::Message(id, text.to_string())).is_err() {
                                debug!("[Reya WS] Event receiver dropped, closing {}", id);
                                let _ = write.close().await;
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            // Protocol-level ping, separate from the JSON ping/pong
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                warn!("[Reya WS] Failed to send pong frame: {}", e);
                                let _ = events.send(TransportEvent::Error(id, e.to_string()));
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("[Reya WS] Connection closed by server ({})", id);
                            let _ = write.close().await;
                            break;
                        }
                        Some(Err(e)) => {
                            error!("[Reya WS] Error ({}): {}", id, e);
                            let _ = events.send(TransportEvent::Error(id, e.to_string()));
                            break;
                        }
                        None => {
                            info!("[Reya WS] Stream ended ({})", id);
                            break;
                        }
                        _ => {}
                    }
                }

                // Handle outgoing frames
                outgoing = outbound.recv() => {
                    match outgoing {
                        Some(message) => {
                            if let Err(e) = write.send(message).await {
                                warn!("[Reya WS] Failed to send ({}): {}", id, e);
                                let _ = events.send(TransportEvent::Error(id, e.to_string()));
                                break;
                            }
                        }
                        None => {
                            debug!("[Reya WS] Closing {}", id);
                            let _ = write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        let _ = events.send(TransportEvent::Closed(id));
    }
}

impl Transport for WsTransport {
    fn open(&mut self, id: ConnectionId) {
        self.connections.retain(|_, tx| !tx.is_closed());

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.connections.insert(id, outbound_tx);

        let url = self.url.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            Self::run_connection(id, url, events, outbound_rx).await;
        });
    }

    fn send(&mut self, id: ConnectionId, text: String) -> TrackerResult<()> {
        let tx = self
            .connections
            .get(&id)
            .ok_or_else(|| TrackerError::transport(format!("{} is not open", id)))?;

        tx.send(Message::Text(text.into()))
            .map_err(|_| TrackerError::transport(format!("{} is already closed", id)))
    }

    fn close(&mut self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            debug!("[Reya WS] Close requested for {}", id);
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.url)
            .field("connections", &self.connections.len())
            .finish()
    }
}

// ============================================================================
// Reconnect Timer
// ============================================================================

/// [`ReconnectTimer`] backed by `tokio::time::sleep`
pub struct TokioTimer {
    fired: mpsc::UnboundedSender<TimerId>,
    pending: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimer {
    /// Create a timer and the receiver fired timer ids arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerId>) {
        let (fired, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                fired,
                pending: HashMap::new(),
            },
            fired_rx,
        )
    }

    pub fn pending(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl ReconnectTimer for TokioTimer {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.pending.retain(|_, handle| !handle.is_finished());

        let fired = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(id);
        });
        self.pending.insert(id, handle);
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.pending.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}
