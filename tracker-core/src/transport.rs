//! Transport abstraction used by the stream client
//!
//! The stream client never touches sockets or timers directly. It drives a
//! [`Transport`] and a [`ReconnectTimer`], and everything they observe comes
//! back to it as a [`TransportEvent`] or a fired [`TimerId`]. Each opened
//! connection gets a fresh [`ConnectionId`]; events carrying an id the client
//! no longer tracks are stale and are dropped, which is how handlers are
//! detached.

use std::fmt;
use std::time::Duration;

use crate::error::TrackerResult;

/// Identifier of one opened connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identifier of one scheduled reconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Something that happened on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished, the connection can send
    Opened(ConnectionId),
    /// Text frame received
    Message(ConnectionId, String),
    /// Connection failed or errored; a `Closed` event follows
    Error(ConnectionId, String),
    /// Connection is gone
    Closed(ConnectionId),
}

impl TransportEvent {
    pub fn connection(&self) -> ConnectionId {
        match self {
            TransportEvent::Opened(id)
            | TransportEvent::Message(id, _)
            | TransportEvent::Error(id, _)
            | TransportEvent::Closed(id) => *id,
        }
    }
}

/// A push-channel transport
///
/// `open` only starts the connection; the outcome is reported later as
/// `Opened`, or as `Error` followed by `Closed`.
pub trait Transport: Send {
    fn open(&mut self, id: ConnectionId);

    fn send(&mut self, id: ConnectionId, text: String) -> TrackerResult<()>;

    /// Close the connection. No further events for `id` are expected to matter.
    fn close(&mut self, id: ConnectionId);
}

/// Schedules one-shot reconnect attempts
pub trait ReconnectTimer: Send {
    /// Arrange for `id` to fire after `delay`
    fn schedule(&mut self, id: TimerId, delay: Duration);

    fn cancel(&mut self, id: TimerId);
}
