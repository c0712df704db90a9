//! Core types for the Reya wallet position tracker
//!
//! This crate defines the shared data structures used across the tracker,
//! including positions, prices, wallet addresses, the streaming wire
//! protocol and the transport abstraction the stream client runs on.

pub mod deviation;
pub mod error;
pub mod position;
pub mod price;
pub mod transport;
pub mod wallet;
pub mod websocket;

pub use deviation::{change_in_bips, should_accept, DEFAULT_THRESHOLD_BIPS};
pub use error::{TrackerError, TrackerResult};
pub use position::{base_asset, Position, PositionKey, Side};
pub use price::Price;
pub use transport::{ConnectionId, ReconnectTimer, TimerId, Transport, TransportEvent};
pub use wallet::WalletAddress;
pub use websocket::{positions_channel, ClientMessage, ConnectionState, ServerMessage, PRICES_CHANNEL};
