//! Async driver for the stream client
//!
//! The state machine is synchronous; this task feeds it. It selects over
//! control commands, transport events and fired timers, and after every
//! input publishes the client's status on a watch channel.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use tracker_core::{ConnectionState, ReconnectTimer, TimerId, Transport, TransportEvent, WalletAddress};
use tracker_reya::{TokioTimer, WsTransport};

use super::client::{StreamClient, StreamEvent, StreamStatus};
use crate::cache::EntityCache;

/// Start/stop control over the stream
#[async_trait]
pub trait StreamControl: Send + Sync {
    /// Connect if not already connected or connecting
    async fn start(&self);

    /// Close and stay closed until the next start
    async fn stop(&self);
}

#[derive(Debug)]
enum StreamCommand {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
}

/// Clonable handle to a running driver
#[derive(Debug, Clone)]
pub struct StreamHandle {
    commands: mpsc::Sender<StreamCommand>,
    status: watch::Receiver<StreamStatus>,
    states: broadcast::Sender<ConnectionState>,
}

impl StreamHandle {
    /// Latest published status
    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    /// Connection state transitions from now on
    pub fn subscribe_state(&self) -> broadcast::Receiver<ConnectionState> {
        self.states.subscribe()
    }

    async fn request(&self, command: fn(oneshot::Sender<()>) -> StreamCommand) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(command(ack_tx)).await.is_err() {
            warn!("[Reya WS] Stream driver is gone");
            return;
        }
        let _ = ack_rx.await;
    }
}

#[async_trait]
impl StreamControl for StreamHandle {
    async fn start(&self) {
        self.request(StreamCommand::Start).await;
    }

    async fn stop(&self) {
        self.request(StreamCommand::Stop).await;
    }
}

/// Task owning a [`StreamClient`]
pub struct StreamDriver<T: Transport, R: ReconnectTimer> {
    client: StreamClient<T, R>,
    commands: mpsc::Receiver<StreamCommand>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    timer_events: mpsc::UnboundedReceiver<TimerId>,
    status: watch::Sender<StreamStatus>,
}

impl<T: Transport, R: ReconnectTimer> StreamDriver<T, R> {
    pub fn new(
        client: StreamClient<T, R>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        timer_events: mpsc::UnboundedReceiver<TimerId>,
    ) -> (Self, StreamHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(client.status());
        let handle = StreamHandle {
            commands: commands_tx,
            status: status_rx,
            states: client.state_sender(),
        };

        (
            Self {
                client,
                commands: commands_rx,
                transport_events,
                timer_events,
                status: status_tx,
            },
            handle,
        )
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        loop {
            let mut ack = None;

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(StreamCommand::Start(tx)) => {
                        self.client.handle_event(StreamEvent::Start);
                        ack = Some(tx);
                    }
                    Some(StreamCommand::Stop(tx)) => {
                        self.client.handle_event(StreamEvent::Stop);
                        ack = Some(tx);
                    }
                    None => {
                        info!("[Reya WS] All stream handles dropped, shutting down");
                        self.client.handle_event(StreamEvent::Stop);
                        self.status.send_replace(self.client.status());
                        break;
                    }
                },

                Some(event) = self.transport_events.recv() => {
                    self.client.handle_event(StreamEvent::Transport(event));
                }

                Some(timer) = self.timer_events.recv() => {
                    self.client.handle_event(StreamEvent::ReconnectDue(timer));
                }
            }

            // Published before the ack so callers observe the new state
            self.status.send_replace(self.client.status());
            if let Some(tx) = ack {
                let _ = tx.send(());
            }
        }
    }
}

/// Spawn a driver on a real WebSocket transport
pub fn spawn_ws_stream(
    ws_url: &str,
    reconnect_delay: Duration,
    cache: Arc<EntityCache>,
    address: watch::Receiver<Option<WalletAddress>>,
) -> (StreamHandle, JoinHandle<()>) {
    let (transport, transport_events) = WsTransport::new(ws_url);
    let (timer, timer_events) = TokioTimer::new();
    let client = StreamClient::new(transport, timer, cache, address, reconnect_delay);

    let (driver, handle) = StreamDriver::new(client, transport_events, timer_events);
    let task = tokio::spawn(driver.run());
    (handle, task)
}
