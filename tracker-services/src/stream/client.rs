//! Stream client state machine
//!
//! Owns the single push connection of the tracker. Every input (start/stop
//! requests, transport events, fired reconnect timers) goes through
//! [`StreamClient::handle_event`], so all state changes happen in one place
//! and in arrival order.
//!
//! A connection's handlers are detached by forgetting its [`ConnectionId`]:
//! any later event tagged with an id the client no longer tracks is dropped.
//! Reconnect timers are detached the same way through [`TimerId`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use tracker_core::{
    positions_channel, ClientMessage, ConnectionId, ConnectionState, Position, Price,
    ReconnectTimer, ServerMessage, TimerId, Transport, TransportEvent, WalletAddress,
    PRICES_CHANNEL,
};

use crate::cache::EntityCache;

/// Delay between a lost connection and the next attempt
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Inputs of the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Start,
    Stop,
    Transport(TransportEvent),
    ReconnectDue(TimerId),
}

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    pub connections_opened: u64,
    pub reconnect_attempts: u64,
    pub messages_handled: u64,
    pub prices_accepted: u64,
    /// `channel_data` frames whose channel matched no subscription
    pub unmatched_channel_data: u64,
    pub malformed_messages: u64,
    /// Events dropped because their connection or timer was detached
    pub stale_events: u64,
}

/// Point-in-time view of the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub state: ConnectionState,
    pub reconnect_pending: bool,
    pub stats: StreamStats,
}

impl Default for StreamStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_pending: false,
            stats: StreamStats::default(),
        }
    }
}

/// Push-channel client for one wallet at a time
pub struct StreamClient<T: Transport, R: ReconnectTimer> {
    transport: T,
    timer: R,
    cache: Arc<EntityCache>,
    address: watch::Receiver<Option<WalletAddress>>,
    reconnect_delay: Duration,

    state: ConnectionState,
    /// The live connection; events for any other id are stale
    connection: Option<ConnectionId>,
    /// Channel the live connection subscribed positions on
    positions_channel: Option<String>,
    pending_timer: Option<TimerId>,
    manual_close: bool,
    next_connection: u64,
    next_timer: u64,

    state_tx: broadcast::Sender<ConnectionState>,
    stats: StreamStats,
}

impl<T: Transport, R: ReconnectTimer> StreamClient<T, R> {
    pub fn new(
        transport: T,
        timer: R,
        cache: Arc<EntityCache>,
        address: watch::Receiver<Option<WalletAddress>>,
        reconnect_delay: Duration,
    ) -> Self {
        let (state_tx, _) = broadcast::channel(64);
        Self {
            transport,
            timer,
            cache,
            address,
            reconnect_delay,
            state: ConnectionState::Disconnected,
            connection: None,
            positions_channel: None,
            pending_timer: None,
            manual_close: false,
            next_connection: 1,
            next_timer: 1,
            state_tx,
            stats: StreamStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            state: self.state,
            reconnect_pending: self.pending_timer.is_some(),
            stats: self.stats.clone(),
        }
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    pub fn is_manual_close(&self) -> bool {
        self.manual_close
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timer(&self) -> &R {
        &self.timer
    }

    /// Sender side of the connection state broadcast
    pub fn state_sender(&self) -> broadcast::Sender<ConnectionState> {
        self.state_tx.clone()
    }

    pub fn subscribe_state(&self) -> broadcast::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn start(&mut self) {
        self.handle_event(StreamEvent::Start);
    }

    pub fn stop(&mut self) {
        self.handle_event(StreamEvent::Stop);
    }

    /// Single entry point of the state machine
    pub fn handle_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Start => self.on_start(),
            StreamEvent::Stop => self.on_stop(),
            StreamEvent::Transport(event) => {
                if self.connection != Some(event.connection()) {
                    debug!(
                        "[Reya WS] Ignoring event from detached {}",
                        event.connection()
                    );
                    self.stats.stale_events += 1;
                    return;
                }
                match event {
                    TransportEvent::Opened(_) => self.on_opened(),
                    TransportEvent::Message(_, text) => self.on_message(&text),
                    TransportEvent::Error(id, message) => self.on_error(id, &message),
                    TransportEvent::Closed(id) => self.on_closed(id),
                }
            }
            StreamEvent::ReconnectDue(id) => self.on_reconnect_due(id),
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn on_start(&mut self) {
        if self.state.is_active() {
            debug!("[Reya WS] Already {:?}, ignoring start", self.state);
            return;
        }

        let Some(address) = self.current_address() else {
            warn!("[Reya WS] No wallet address set, not connecting");
            return;
        };

        self.manual_close = false;
        self.cancel_pending_timer();
        self.connect(&address);
    }

    fn on_stop(&mut self) {
        self.manual_close = true;
        self.cancel_pending_timer();

        // Detach before closing so nothing from this connection is applied
        if let Some(id) = self.connection.take() {
            self.positions_channel = None;
            info!("[Reya WS] Closing {}", id);
            self.transport.close(id);
        }

        self.set_state(ConnectionState::Closed);
    }

    fn connect(&mut self, address: &WalletAddress) {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;

        self.connection = Some(id);
        self.positions_channel = Some(positions_channel(address));
        self.stats.connections_opened += 1;
        self.set_state(ConnectionState::Connecting);

        self.transport.open(id);
    }

    fn on_opened(&mut self) {
        self.set_state(ConnectionState::Connected);

        self.send(ClientMessage::subscribe(PRICES_CHANNEL));
        if let Some(channel) = self.positions_channel.clone() {
            info!("[Reya WS] Subscribing to {}", channel);
            self.send(ClientMessage::subscribe(channel));
        }
    }

    fn on_error(&mut self, id: ConnectionId, message: &str) {
        if !self.manual_close {
            error!("[Reya WS] Connection error on {}: {}", id, message);
        }
    }

    fn on_closed(&mut self, id: ConnectionId) {
        self.connection = None;
        self.positions_channel = None;

        if self.manual_close {
            self.set_state(ConnectionState::Closed);
            return;
        }

        info!("[Reya WS] {} closed", id);
        self.set_state(ConnectionState::Disconnected);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        self.cancel_pending_timer();

        let id = TimerId(self.next_timer);
        self.next_timer += 1;

        info!("[Reya WS] Reconnecting in {:?}", self.reconnect_delay);
        self.timer.schedule(id, self.reconnect_delay);
        self.pending_timer = Some(id);
    }

    fn cancel_pending_timer(&mut self) {
        if let Some(id) = self.pending_timer.take() {
            self.timer.cancel(id);
        }
    }

    fn on_reconnect_due(&mut self, id: TimerId) {
        if self.pending_timer != Some(id) {
            debug!("[Reya WS] Ignoring cancelled {}", id);
            self.stats.stale_events += 1;
            return;
        }
        self.pending_timer = None;

        if self.manual_close || self.state.is_active() {
            return;
        }

        let Some(address) = self.current_address() else {
            warn!("[Reya WS] Wallet address cleared, not reconnecting");
            return;
        };

        self.stats.reconnect_attempts += 1;
        self.connect(&address);
    }

    fn current_address(&self) -> Option<WalletAddress> {
        self.address.borrow().clone()
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!("[Reya WS] {:?} -> {:?}", self.state, state);
        self.state = state;
        let _ = self.state_tx.send(state);
    }

    fn send(&mut self, message: ClientMessage) {
        let Some(id) = self.connection else {
            return;
        };

        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!("[Reya WS] Failed to serialize {:?}: {}", message, e);
                return;
            }
        };

        if let Err(e) = self.transport.send(id, text) {
            warn!("[Reya WS] Failed to send on {}: {}", id, e);
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn on_message(&mut self, text: &str) {
        self.stats.messages_handled += 1;

        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("[Reya WS] Failed to parse message: {}", e);
                self.stats.malformed_messages += 1;
                return;
            }
        };

        match message {
            ServerMessage::Ping { .. } => {
                self.send(ClientMessage::pong_now());
            }
            ServerMessage::Subscribed { channel, contents } => {
                debug!("[Reya WS] Subscribed to {}", channel);
                if let Some(contents) = contents {
                    self.apply_catch_up(&channel, contents);
                }
            }
            ServerMessage::ChannelData { channel, data, .. } => {
                self.apply_channel_data(&channel, data);
            }
            ServerMessage::Error { message, channel } => match channel {
                Some(channel) => error!("[Reya WS] Server error on {}: {}", channel, message),
                None => error!("[Reya WS] Server error: {}", message),
            },
            ServerMessage::Unknown => {
                debug!("[Reya WS] Ignoring unknown message type");
            }
        }
    }

    /// Initial channel content sent with the subscription confirmation
    fn apply_catch_up(&mut self, channel: &str, contents: Value) {
        if channel == PRICES_CHANNEL {
            let prices: Vec<Price> = self.parse_items(contents, "price");
            if prices.is_empty() {
                return;
            }
            debug!("[Reya WS] Replacing prices with {} from catch-up", prices.len());
            self.cache.prices_mut().replace_all(prices);
        } else if self.is_positions_channel(channel) {
            let positions: Vec<Position> = self.parse_items(contents, "position");
            self.cache.positions_mut().apply_updates(positions);
        }
    }

    fn apply_channel_data(&mut self, channel: &str, data: Value) {
        if channel == PRICES_CHANNEL {
            let prices: Vec<Price> = self.parse_items(data, "price");
            let accepted = self.cache.prices_mut().upsert_batch(prices);
            self.stats.prices_accepted += accepted as u64;
        } else if self.is_positions_channel(channel) {
            let positions: Vec<Position> = self.parse_items(data, "position");
            let summary = self.cache.positions_mut().apply_updates(positions);
            debug!(
                "[Reya WS] Position update: {} upserted, {} removed, {} stale",
                summary.upserted, summary.removed, summary.stale
            );
        } else {
            warn!("[Reya WS] channel_data for unsubscribed channel {}", channel);
            self.stats.unmatched_channel_data += 1;
        }
    }

    fn is_positions_channel(&self, channel: &str) -> bool {
        self.positions_channel
            .as_deref()
            .is_some_and(|subscribed| subscribed.eq_ignore_ascii_case(channel))
    }

    /// Parse a batch item by item, skipping entries that do not parse
    fn parse_items<D: DeserializeOwned>(&mut self, data: Value, kind: &str) -> Vec<D> {
        let items = match data {
            Value::Array(items) => items,
            Value::Object(_) => vec![data],
            other => {
                warn!("[Reya WS] Expected a {} batch, got {}", kind, other);
                self.stats.malformed_messages += 1;
                return Vec::new();
            }
        };

        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value(item) {
                Ok(value) => parsed.push(value),
                Err(e) => {
                    warn!("[Reya WS] Skipping malformed {}: {}", kind, e);
                    self.stats.malformed_messages += 1;
                }
            }
        }
        parsed
    }
}

impl<T: Transport, R: ReconnectTimer> std::fmt::Debug for StreamClient<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("state", &self.state)
            .field("connection", &self.connection)
            .field("pending_timer", &self.pending_timer)
            .field("manual_close", &self.manual_close)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::fakes::{FakeTimer, FakeTransport};
    use rust_decimal_macros::dec;
    use tracker_core::{PositionKey, Side, DEFAULT_THRESHOLD_BIPS};

    const ADDRESS: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";
    const CHANNEL: &str = "/v2/wallet/0xabcdef0123456789abcdef0123456789abcdef01/positions";

    struct Harness {
        client: StreamClient<FakeTransport, FakeTimer>,
        cache: Arc<EntityCache>,
        address_tx: watch::Sender<Option<WalletAddress>>,
    }

    fn harness() -> Harness {
        let cache = Arc::new(EntityCache::new(DEFAULT_THRESHOLD_BIPS));
        let address = WalletAddress::parse(ADDRESS).unwrap();
        let (address_tx, address_rx) = watch::channel(Some(address));
        let client = StreamClient::new(
            FakeTransport::default(),
            FakeTimer::default(),
            cache.clone(),
            address_rx,
            RECONNECT_DELAY,
        );
        Harness {
            client,
            cache,
            address_tx,
        }
    }

    impl Harness {
        fn deliver(&mut self, event: TransportEvent) {
            self.client.handle_event(StreamEvent::Transport(event));
        }

        /// Start and complete the handshake, returning the live connection
        fn connect(&mut self) -> ConnectionId {
            self.client.start();
            let id = self.client.connection().unwrap();
            self.deliver(TransportEvent::Opened(id));
            id
        }

        fn message(&mut self, id: ConnectionId, json: serde_json::Value) {
            self.deliver(TransportEvent::Message(id, json.to_string()));
        }
    }

    fn sent_json(transport: &FakeTransport) -> Vec<serde_json::Value> {
        transport
            .sent()
            .into_iter()
            .map(|(_, text)| serde_json::from_str(&text).unwrap())
            .collect()
    }

    #[test]
    fn test_start_subscribes_prices_and_lower_case_positions() {
        let mut h = harness();
        let id = h.connect();

        assert_eq!(h.client.state(), ConnectionState::Connected);
        assert_eq!(h.client.transport().opened(), vec![id]);
        assert_eq!(
            sent_json(h.client.transport()),
            vec![
                serde_json::json!({"type": "subscribe", "channel": "/v2/prices"}),
                serde_json::json!({"type": "subscribe", "channel": CHANNEL}),
            ]
        );
    }

    #[test]
    fn test_start_twice_opens_one_connection() {
        let mut h = harness();
        h.client.start();
        h.client.start();
        assert_eq!(h.client.transport().opened().len(), 1);

        let id = h.client.connection().unwrap();
        h.deliver(TransportEvent::Opened(id));
        h.client.start();
        assert_eq!(h.client.transport().opened().len(), 1);
    }

    #[test]
    fn test_start_without_address_does_nothing() {
        let mut h = harness();
        h.address_tx.send_replace(None);

        h.client.start();

        assert!(h.client.transport().opened().is_empty());
        assert_eq!(h.client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_ping_is_answered_with_pong() {
        let mut h = harness();
        let id = h.connect();

        h.message(id, serde_json::json!({"type": "ping", "timestamp": 1}));

        let sent = sent_json(h.client.transport());
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2]["type"], "pong");
        assert!(sent[2]["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_subscribed_with_contents_replaces_prices() {
        let mut h = harness();
        h.cache
            .prices_mut()
            .replace_all(vec![Price::new("OLDRUSDPERP", dec!(1), 0)]);
        let id = h.connect();

        h.message(
            id,
            serde_json::json!({
                "type": "subscribed",
                "channel": "/v2/prices",
                "contents": [
                    {"symbol": "BTCRUSDPERP", "oraclePrice": "41000"},
                    {"symbol": "ETHRUSDPERP", "oraclePrice": "3000"}
                ]
            }),
        );

        let prices = h.cache.prices();
        assert_eq!(prices.len(), 2);
        assert!(prices.get("OLDRUSDPERP").is_none());
    }

    #[test]
    fn test_subscribed_with_empty_contents_keeps_prices() {
        let mut h = harness();
        h.cache
            .prices_mut()
            .replace_all(vec![Price::new("BTCRUSDPERP", dec!(41000), 0)]);
        let id = h.connect();

        h.message(
            id,
            serde_json::json!({
                "type": "subscribed",
                "channel": "/v2/prices",
                "contents": []
            }),
        );

        assert_eq!(h.cache.prices().oracle_price("BTCRUSDPERP"), Some(dec!(41000)));
    }

    #[test]
    fn test_subscribed_positions_contents_are_merged() {
        let mut h = harness();
        h.cache.positions_mut().replace_all(vec![
            Position {
                exchange_id: 1,
                symbol: "BTCRUSDPERP".to_string(),
                account_id: 7,
                qty: dec!(1),
                side: Side::Long,
                avg_entry_price: dec!(40000),
                avg_entry_funding_value: dec!(0),
                last_trade_sequence_number: 2,
            },
            Position {
                exchange_id: 1,
                symbol: "SOLRUSDPERP".to_string(),
                account_id: 7,
                qty: dec!(10),
                side: Side::Short,
                avg_entry_price: dec!(150),
                avg_entry_funding_value: dec!(0),
                last_trade_sequence_number: 1,
            },
        ]);
        let id = h.connect();

        h.message(
            id,
            serde_json::json!({
                "type": "subscribed",
                "channel": CHANNEL,
                "contents": [
                    {
                        "exchangeId": 1,
                        "symbol": "BTCRUSDPERP",
                        "accountId": 7,
                        "qty": "2",
                        "side": "B",
                        "avgEntryPrice": "40500",
                        "avgEntryFundingValue": "0",
                        "lastTradeSequenceNumber": 4
                    },
                    {
                        "exchangeId": 1,
                        "symbol": "ETHRUSDPERP",
                        "accountId": 7,
                        "qty": "3",
                        "side": "A",
                        "avgEntryPrice": "3000",
                        "avgEntryFundingValue": "0",
                        "lastTradeSequenceNumber": 4
                    }
                ]
            }),
        );

        let positions = h.cache.positions().list();
        let symbols: Vec<&str> = positions.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCRUSDPERP", "ETHRUSDPERP", "SOLRUSDPERP"]);
        assert_eq!(positions[0].qty, dec!(2));
        assert_eq!(positions[2].qty, dec!(10));
    }

    #[test]
    fn test_price_data_goes_through_deviation_filter() {
        let mut h = harness();
        h.cache
            .prices_mut()
            .replace_all(vec![Price::new("BTCRUSDPERP", dec!(41000), 0)]);
        let id = h.connect();

        h.message(
            id,
            serde_json::json!({
                "type": "channel_data",
                "channel": "/v2/prices",
                "timestamp": 2,
                "data": [
                    {"symbol": "BTCRUSDPERP", "oraclePrice": "41001"},
                    {"symbol": "SOLRUSDPERP", "oraclePrice": "150"}
                ]
            }),
        );

        assert_eq!(h.client.stats().prices_accepted, 1);
        assert_eq!(h.cache.prices().oracle_price("BTCRUSDPERP"), Some(dec!(41000)));
        assert_eq!(h.cache.prices().oracle_price("SOLRUSDPERP"), Some(dec!(150)));
    }

    #[test]
    fn test_position_data_matches_channel_ignoring_case() {
        let mut h = harness();
        let id = h.connect();

        h.message(
            id,
            serde_json::json!({
                "type": "channel_data",
                "channel": CHANNEL.replace("abcdef01/", "ABCDEF01/"),
                "timestamp": 3,
                "data": [{
                    "exchangeId": 1,
                    "symbol": "BTCRUSDPERP",
                    "accountId": 7,
                    "qty": "1.5",
                    "side": "B",
                    "avgEntryPrice": "40000",
                    "avgEntryFundingValue": "0",
                    "lastTradeSequenceNumber": 3
                }]
            }),
        );

        let key = PositionKey {
            account_id: 7,
            symbol: "BTCRUSDPERP".to_string(),
        };
        assert_eq!(h.cache.positions().get(&key).unwrap().qty, dec!(1.5));
        assert_eq!(h.client.stats().unmatched_channel_data, 0);
    }

    #[test]
    fn test_malformed_item_does_not_drop_batch() {
        let mut h = harness();
        let id = h.connect();

        h.message(
            id,
            serde_json::json!({
                "type": "channel_data",
                "channel": "/v2/prices",
                "data": [
                    {"symbol": "BTCRUSDPERP"},
                    {"symbol": "ETHRUSDPERP", "oraclePrice": "3000"}
                ]
            }),
        );

        assert_eq!(h.cache.prices().len(), 1);
        assert_eq!(h.client.stats().malformed_messages, 1);
    }

    #[test]
    fn test_unmatched_channel_is_counted_not_applied() {
        let mut h = harness();
        let id = h.connect();

        h.message(
            id,
            serde_json::json!({
                "type": "channel_data",
                "channel": "/v2/wallet/0x0000000000000000000000000000000000000000/positions",
                "data": []
            }),
        );

        assert_eq!(h.client.stats().unmatched_channel_data, 1);
        assert!(h.cache.positions().is_empty());
    }

    #[test]
    fn test_garbage_and_unknown_types_are_ignored() {
        let mut h = harness();
        let id = h.connect();

        h.deliver(TransportEvent::Message(id, "not json".to_string()));
        h.message(id, serde_json::json!({"type": "unsubscribed", "channel": "/v2/prices"}));
        h.message(id, serde_json::json!({"type": "error", "message": "nope"}));

        assert_eq!(h.client.state(), ConnectionState::Connected);
        assert_eq!(h.client.stats().malformed_messages, 1);
        assert_eq!(h.client.stats().messages_handled, 3);
    }

    #[test]
    fn test_unexpected_close_schedules_one_reconnect() {
        let mut h = harness();
        let id = h.connect();

        h.deliver(TransportEvent::Error(id, "reset".to_string()));
        h.deliver(TransportEvent::Closed(id));

        assert_eq!(h.client.state(), ConnectionState::Disconnected);
        let scheduled = h.client.timer().scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].1, RECONNECT_DELAY);

        let timer = h.client.pending_timer().unwrap();
        h.client.handle_event(StreamEvent::ReconnectDue(timer));

        assert_eq!(h.client.state(), ConnectionState::Connecting);
        assert_eq!(h.client.transport().opened().len(), 2);
        assert_eq!(h.client.stats().reconnect_attempts, 1);
    }

    #[test]
    fn test_stop_closes_without_reconnect() {
        let mut h = harness();
        let id = h.connect();

        h.client.stop();
        h.deliver(TransportEvent::Closed(id));

        assert_eq!(h.client.state(), ConnectionState::Closed);
        assert_eq!(h.client.transport().closed(), vec![id]);
        assert!(h.client.timer().scheduled().is_empty());
        assert!(h.client.pending_timer().is_none());
    }

    #[test]
    fn test_stop_cancels_pending_reconnect() {
        let mut h = harness();
        let id = h.connect();
        h.deliver(TransportEvent::Closed(id));
        let timer = h.client.pending_timer().unwrap();

        h.client.stop();
        h.client.handle_event(StreamEvent::ReconnectDue(timer));

        assert_eq!(h.client.timer().cancelled(), vec![timer]);
        assert_eq!(h.client.transport().opened().len(), 1);
        assert_eq!(h.client.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_events_from_detached_connection_are_ignored() {
        let mut h = harness();
        let id = h.connect();
        h.client.stop();

        h.message(
            id,
            serde_json::json!({
                "type": "channel_data",
                "channel": "/v2/prices",
                "data": [{"symbol": "BTCRUSDPERP", "oraclePrice": "41000"}]
            }),
        );
        h.deliver(TransportEvent::Closed(id));

        assert!(h.cache.prices().is_empty());
        assert_eq!(h.client.stats().stale_events, 2);
        assert!(h.client.timer().scheduled().is_empty());
    }

    #[test]
    fn test_restart_after_stop_uses_new_connection() {
        let mut h = harness();
        let first = h.connect();
        h.client.stop();

        let second = h.connect();

        assert_ne!(first, second);
        assert!(!h.client.is_manual_close());
        assert_eq!(h.client.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_state_changes_are_broadcast() {
        let mut h = harness();
        let mut states = h.client.subscribe_state();

        let id = h.connect();
        h.client.stop();
        h.deliver(TransportEvent::Closed(id));

        assert_eq!(states.try_recv().unwrap(), ConnectionState::Connecting);
        assert_eq!(states.try_recv().unwrap(), ConnectionState::Connected);
        assert_eq!(states.try_recv().unwrap(), ConnectionState::Closed);
        assert!(states.try_recv().is_err());
    }
}
