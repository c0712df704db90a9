//! Services for the Reya wallet position tracker
//!
//! This crate ties the Reya integration to an in-memory cache: snapshot
//! loading, the live stream, wallet selection and the positions view.

pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod snapshot;
pub mod stream;
pub mod view;
pub mod wallet_store;

pub use cache::{EntityCache, MergeSummary, PositionTable, PriceTable};
pub use config::{ConfigError, TrackerConfig};
pub use lifecycle::{SessionController, SessionTransition};
pub use snapshot::{SnapshotLoader, SnapshotOutcome, SnapshotSource};
pub use stream::{
    spawn_ws_stream, StreamClient, StreamControl, StreamDriver, StreamEvent, StreamHandle,
    StreamStats, StreamStatus, RECONNECT_DELAY,
};
pub use view::{mark_price, positions_view, MarkSource, PositionRow, PositionsView};
pub use wallet_store::WalletStore;
