//! Reya integration for the wallet position tracker
//!
//! This crate provides the REST client used to load position and price
//! snapshots, and the WebSocket transport the stream client runs on.
//! Neither endpoint requires authentication.

pub mod client;
pub mod websocket;

pub use client::{classify_status, Endpoint, ReyaClient, REYA_API_BASE};
pub use websocket::{TokioTimer, WsTransport, REYA_WS_URL};
