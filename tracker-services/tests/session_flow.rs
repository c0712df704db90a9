//! Wallet session end to end, with the socket and REST API replaced by fakes

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use tracker_core::{
    ConnectionId, ConnectionState, Position, Price, ReconnectTimer, Side, TimerId, TrackerResult,
    Transport, TransportEvent, WalletAddress, DEFAULT_THRESHOLD_BIPS,
};
use tracker_services::{
    positions_view, EntityCache, MarkSource, SessionController, SessionTransition, SnapshotLoader,
    SnapshotOutcome, SnapshotSource, StreamClient, StreamDriver, StreamHandle, StreamStatus,
    WalletStore, RECONNECT_DELAY,
};

const WALLET: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";
const POSITIONS_CHANNEL: &str =
    "/v2/wallet/0xabcdef0123456789abcdef0123456789abcdef01/positions";

#[derive(Clone, Default)]
struct RecordingTransport {
    opened: Arc<Mutex<Vec<ConnectionId>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl Transport for RecordingTransport {
    fn open(&mut self, id: ConnectionId) {
        self.opened.lock().push(id);
    }

    fn send(&mut self, _id: ConnectionId, text: String) -> TrackerResult<()> {
        self.sent.lock().push(text);
        Ok(())
    }

    fn close(&mut self, _id: ConnectionId) {}
}

struct IdleTimer;

impl ReconnectTimer for IdleTimer {
    fn schedule(&mut self, _id: TimerId, _delay: Duration) {}

    fn cancel(&mut self, _id: TimerId) {}
}

struct StaticSource;

#[async_trait]
impl SnapshotSource for StaticSource {
    async fn load_positions(&self, _address: &WalletAddress) -> TrackerResult<Vec<Position>> {
        Ok(vec![Position {
            exchange_id: 1,
            symbol: "BTCRUSDPERP".to_string(),
            account_id: 12,
            qty: dec!(1.5),
            side: Side::Long,
            avg_entry_price: dec!(40000),
            avg_entry_funding_value: dec!(0),
            last_trade_sequence_number: 1,
        }])
    }

    async fn load_prices(&self) -> TrackerResult<Vec<Price>> {
        Ok(vec![Price::new("ETHRUSDPERP", dec!(3000), 0)])
    }
}

struct Session {
    controller: SessionController<StreamHandle>,
    handle: StreamHandle,
    cache: Arc<EntityCache>,
    transport: RecordingTransport,
    events: mpsc::UnboundedSender<TransportEvent>,
}

fn session() -> Session {
    let cache = Arc::new(EntityCache::new(DEFAULT_THRESHOLD_BIPS));
    let wallet = Arc::new(WalletStore::in_memory());
    let transport = RecordingTransport::default();

    let client = StreamClient::new(
        transport.clone(),
        IdleTimer,
        cache.clone(),
        wallet.subscribe(),
        RECONNECT_DELAY,
    );
    let (events, events_rx) = mpsc::unbounded_channel();
    let (_fired, fired_rx) = mpsc::unbounded_channel();
    let (driver, handle) = StreamDriver::new(client, events_rx, fired_rx);
    tokio::spawn(driver.run());

    let loader = SnapshotLoader::new(Arc::new(StaticSource), cache.clone());
    let controller = SessionController::new(wallet, cache.clone(), loader, handle.clone());

    Session {
        controller,
        handle,
        cache,
        transport,
        events,
    }
}

async fn wait_until(handle: &StreamHandle, predicate: impl Fn(&StreamStatus) -> bool) {
    let mut status = handle.watch_status();
    timeout(Duration::from_secs(2), status.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for stream status")
        .expect("stream driver stopped");
}

fn price_push(symbol: &str, price: &str) -> String {
    serde_json::json!({
        "type": "channel_data",
        "channel": "/v2/prices",
        "timestamp": 1,
        "data": [{"symbol": symbol, "oraclePrice": price}]
    })
    .to_string()
}

#[tokio::test]
async fn test_wallet_session_lifecycle() {
    let mut s = session();
    let wallet = WalletAddress::parse(WALLET).unwrap();

    // Select: snapshot first, then the stream opens
    let transition = s.controller.set_address(Some(wallet)).await;
    assert_eq!(
        transition,
        SessionTransition::Activated(SnapshotOutcome::Loaded {
            positions: 1,
            prices: Some(1)
        })
    );
    assert_eq!(*s.transport.opened.lock(), vec![ConnectionId(1)]);

    // No BTC price yet: the entry price stands in
    let row = positions_view(&s.cache).rows[0].clone();
    assert_eq!(row.mark_price, dec!(40000));
    assert_eq!(row.mark_source, MarkSource::EntryPrice);

    s.events.send(TransportEvent::Opened(ConnectionId(1))).unwrap();
    s.events
        .send(TransportEvent::Message(
            ConnectionId(1),
            price_push("BTCRUSDPERP", "41000"),
        ))
        .unwrap();
    wait_until(&s.handle, |st| st.stats.messages_handled == 1).await;

    let sent = s.transport.sent.lock().clone();
    assert!(sent.iter().any(|m| m.contains(POSITIONS_CHANNEL)));

    let row = positions_view(&s.cache).rows[0].clone();
    assert_eq!(row.mark_price, dec!(41000));
    assert_eq!(row.mark_source, MarkSource::Oracle);
    assert_eq!(row.value, dec!(61500));

    // Clear: stream closed, caches empty
    assert_eq!(
        s.controller.set_address(None).await,
        SessionTransition::Cleared
    );
    assert_eq!(s.handle.status().state, ConnectionState::Closed);
    assert!(s.cache.positions().is_empty());
    assert!(s.cache.prices().is_empty());

    // A late push from the closed connection changes nothing
    s.events
        .send(TransportEvent::Message(
            ConnectionId(1),
            price_push("BTCRUSDPERP", "42000"),
        ))
        .unwrap();
    wait_until(&s.handle, |st| st.stats.stale_events == 1).await;

    assert!(s.cache.prices().is_empty());
    assert!(positions_view(&s.cache).rows.is_empty());
}

#[tokio::test]
async fn test_switching_wallets_resubscribes() {
    let mut s = session();
    let first = WalletAddress::parse(WALLET).unwrap();
    let second = WalletAddress::parse("0x1234567890abcdef1234567890abcdef12345678").unwrap();

    s.controller.set_address(Some(first)).await;
    s.events.send(TransportEvent::Opened(ConnectionId(1))).unwrap();
    wait_until(&s.handle, |st| st.state == ConnectionState::Connected).await;

    let transition = s.controller.set_address(Some(second)).await;
    assert!(matches!(transition, SessionTransition::Switched(_)));
    assert_eq!(
        *s.transport.opened.lock(),
        vec![ConnectionId(1), ConnectionId(2)]
    );

    s.events.send(TransportEvent::Opened(ConnectionId(2))).unwrap();
    wait_until(&s.handle, |st| st.state == ConnectionState::Connected).await;

    let sent = s.transport.sent.lock().clone();
    assert_eq!(
        sent.last().map(String::as_str),
        Some(
            r#"{"type":"subscribe","channel":"/v2/wallet/0x1234567890abcdef1234567890abcdef12345678/positions"}"#
        )
    );
}
