//! Live price and position stream
//!
//! - `client`: the synchronous connection state machine
//! - `driver`: the task that feeds it and the handle used to control it

mod client;
mod driver;

#[cfg(test)]
pub(crate) mod fakes;

pub use client::{StreamClient, StreamEvent, StreamStats, StreamStatus, RECONNECT_DELAY};
pub use driver::{spawn_ws_stream, StreamControl, StreamDriver, StreamHandle};
