//! WebSocket message types for the Reya streaming API
//!
//! Every frame is a JSON object tagged by `type`. The client subscribes to
//! channels by name and answers server pings; the server pushes channel
//! snapshots (`subscribed`) and deltas (`channel_data`).

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::WalletAddress;

/// Shared prices channel
pub const PRICES_CHANNEL: &str = "/v2/prices";

/// Per-wallet positions channel name
///
/// Always built from the lower-cased address so the subscribe request and
/// the channel echoed back in `channel_data` compare equal.
pub fn positions_channel(address: &WalletAddress) -> String {
    format!("/v2/wallet/{}/positions", address.normalized())
}

// ============================================================================
// Client -> Server Messages
// ============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a channel
    Subscribe {
        channel: String,
    },
    /// Reply to a server ping
    Pong {
        /// Client timestamp in epoch milliseconds
        timestamp: i64,
    },
}

impl ClientMessage {
    pub fn subscribe(channel: impl Into<String>) -> Self {
        ClientMessage::Subscribe {
            channel: channel.into(),
        }
    }

    /// Pong stamped with the current time
    pub fn pong_now() -> Self {
        ClientMessage::Pong {
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Keep-alive; must be answered with a pong
    Ping {
        #[serde(default)]
        timestamp: i64,
    },
    /// Subscription confirmed, optionally carrying the channel's current content
    Subscribed {
        channel: String,
        #[serde(default)]
        contents: Option<serde_json::Value>,
    },
    /// Update pushed on a subscribed channel
    ChannelData {
        channel: String,
        #[serde(default)]
        timestamp: i64,
        /// Prices or positions, depending on the channel
        data: serde_json::Value,
    },
    /// Server-side error report
    Error {
        message: String,
        #[serde(default)]
        channel: Option<String>,
    },
    /// Any message type this client does not know about
    #[serde(other)]
    Unknown,
}

/// Connection state of the stream client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected, a reconnect may be pending
    Disconnected,
    /// Transport is being opened
    Connecting,
    /// Connected and subscribed
    Connected,
    /// Stopped on purpose, will not reconnect
    Closed,
}

impl ConnectionState {
    /// Whether a start request should be ignored in this state
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}
