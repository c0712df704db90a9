//! Wallet session lifecycle
//!
//! Selecting, switching and clearing the tracked wallet. Every transition
//! runs in the same order: stop the old stream, empty the cache, publish
//! the new address, load the snapshot, start the stream. Methods take
//! `&mut self`, so one transition finishes before the next begins.

use std::sync::Arc;
use tracing::{info, warn};

use tracker_core::WalletAddress;

use crate::cache::EntityCache;
use crate::snapshot::{SnapshotLoader, SnapshotOutcome};
use crate::stream::StreamControl;
use crate::wallet_store::WalletStore;

/// What a call to [`SessionController::set_address`] did
#[derive(Debug, Clone, PartialEq)]
pub enum SessionTransition {
    /// A wallet was selected where there was none
    Activated(SnapshotOutcome),
    /// The wallet changed
    Switched(SnapshotOutcome),
    /// The wallet was cleared
    Cleared,
    /// Same wallet as before (case-insensitive), nothing done
    Unchanged,
}

/// Drives snapshot loading and the stream from the selected wallet
pub struct SessionController<S: StreamControl> {
    wallet: Arc<WalletStore>,
    cache: Arc<EntityCache>,
    loader: SnapshotLoader,
    stream: S,
}

impl<S: StreamControl> SessionController<S> {
    pub fn new(
        wallet: Arc<WalletStore>,
        cache: Arc<EntityCache>,
        loader: SnapshotLoader,
        stream: S,
    ) -> Self {
        Self {
            wallet,
            cache,
            loader,
            stream,
        }
    }

    pub fn current(&self) -> Option<WalletAddress> {
        self.wallet.current()
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Bring up the session for the wallet already in the store, if any
    pub async fn resume(&mut self) -> SessionTransition {
        match self.wallet.current() {
            Some(address) => {
                info!("Resuming session for {}", address.short());
                SessionTransition::Activated(self.activate(&address).await)
            }
            None => SessionTransition::Unchanged,
        }
    }

    /// Select a wallet, or clear the selection with `None`
    pub async fn set_address(&mut self, next: Option<WalletAddress>) -> SessionTransition {
        let current = self.wallet.current();

        match (current, next) {
            (None, None) => SessionTransition::Unchanged,
            (Some(current), Some(next)) if current == next => SessionTransition::Unchanged,
            (None, Some(next)) => {
                info!("Tracking wallet {}", next.short());
                self.store(Some(next.clone()));
                SessionTransition::Activated(self.activate(&next).await)
            }
            (Some(current), Some(next)) => {
                info!("Switching wallet {} -> {}", current.short(), next.short());
                self.teardown().await;
                self.store(Some(next.clone()));
                SessionTransition::Switched(self.activate(&next).await)
            }
            (Some(current), None) => {
                info!("Clearing wallet {}", current.short());
                self.teardown().await;
                self.store(None);
                SessionTransition::Cleared
            }
        }
    }

    /// Stop streaming and drop everything cached for the old wallet
    async fn teardown(&mut self) {
        self.stream.stop().await;
        self.cache.clear_all();
    }

    async fn activate(&mut self, address: &WalletAddress) -> SnapshotOutcome {
        let outcome = self.loader.load(address).await;
        self.stream.start().await;
        outcome
    }

    fn store(&self, address: Option<WalletAddress>) {
        if let Err(e) = self.wallet.set(address) {
            warn!("Failed to persist wallet selection: {}", e);
        }
    }
}

impl<S: StreamControl> std::fmt::Debug for SessionController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("wallet", &self.wallet.current())
            .finish_non_exhaustive()
    }
}
