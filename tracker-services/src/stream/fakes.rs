//! Recording transport and timer for state machine tests

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use tracker_core::{ConnectionId, ReconnectTimer, TimerId, TrackerResult, Transport};

#[derive(Debug, Default)]
struct TransportLog {
    opened: Vec<ConnectionId>,
    sent: Vec<(ConnectionId, String)>,
    closed: Vec<ConnectionId>,
}

/// Transport that only records what it was asked to do
///
/// Clones share the same log, so a test can keep one while the client
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct FakeTransport {
    log: Arc<Mutex<TransportLog>>,
}

impl FakeTransport {
    pub fn opened(&self) -> Vec<ConnectionId> {
        self.log.lock().opened.clone()
    }

    pub fn sent(&self) -> Vec<(ConnectionId, String)> {
        self.log.lock().sent.clone()
    }

    pub fn closed(&self) -> Vec<ConnectionId> {
        self.log.lock().closed.clone()
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, id: ConnectionId) {
        self.log.lock().opened.push(id);
    }

    fn send(&mut self, id: ConnectionId, text: String) -> TrackerResult<()> {
        self.log.lock().sent.push((id, text));
        Ok(())
    }

    fn close(&mut self, id: ConnectionId) {
        self.log.lock().closed.push(id);
    }
}

#[derive(Debug, Default)]
struct TimerLog {
    scheduled: Vec<(TimerId, Duration)>,
    cancelled: Vec<TimerId>,
}

/// Timer that never fires on its own
#[derive(Debug, Default, Clone)]
pub struct FakeTimer {
    log: Arc<Mutex<TimerLog>>,
}

impl FakeTimer {
    pub fn scheduled(&self) -> Vec<(TimerId, Duration)> {
        self.log.lock().scheduled.clone()
    }

    pub fn cancelled(&self) -> Vec<TimerId> {
        self.log.lock().cancelled.clone()
    }
}

impl ReconnectTimer for FakeTimer {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.log.lock().scheduled.push((id, delay));
    }

    fn cancel(&mut self, id: TimerId) {
        self.log.lock().cancelled.push(id);
    }
}
