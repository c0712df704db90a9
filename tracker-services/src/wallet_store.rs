//! Selected wallet, persisted across restarts
//!
//! The current address lives in a watch channel; the stream client reads
//! it when connecting. Every change is also written to a small JSON file
//! so the tracker resumes the same wallet after a restart.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, warn};

use tracker_core::{TrackerError, TrackerResult, WalletAddress};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedWallet {
    #[serde(default)]
    wallet_address: Option<WalletAddress>,
}

/// Holder of the selected wallet address
#[derive(Debug)]
pub struct WalletStore {
    path: Option<PathBuf>,
    tx: watch::Sender<Option<WalletAddress>>,
}

impl WalletStore {
    /// A store that never touches disk
    pub fn in_memory() -> Self {
        let (tx, _) = watch::channel(None);
        Self { path: None, tx }
    }

    /// Open a store backed by `path`
    ///
    /// A missing file starts with no wallet. An unreadable or malformed
    /// file is logged and also starts with no wallet.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = match Self::read(&path) {
            Ok(persisted) => persisted.wallet_address,
            Err(e) => {
                warn!("Ignoring wallet state in {}: {}", path.display(), e);
                None
            }
        };

        if let Some(address) = &initial {
            debug!("Restored wallet {} from {}", address.short(), path.display());
        }

        let (tx, _) = watch::channel(initial);
        Self {
            path: Some(path),
            tx,
        }
    }

    fn read(path: &Path) -> TrackerResult<PersistedWallet> {
        if !path.exists() {
            return Ok(PersistedWallet::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| TrackerError::io(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| TrackerError::parse(e.to_string()))
    }

    pub fn current(&self) -> Option<WalletAddress> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<WalletAddress>> {
        self.tx.subscribe()
    }

    /// Replace the selected wallet
    ///
    /// The in-memory value always changes; the returned error only reports
    /// that writing the file failed.
    pub fn set(&self, address: Option<WalletAddress>) -> TrackerResult<()> {
        self.tx.send_replace(address.clone());
        self.persist(address)
    }

    fn persist(&self, address: Option<WalletAddress>) -> TrackerResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TrackerError::io(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(&PersistedWallet {
            wallet_address: address,
        })
        .map_err(|e| TrackerError::parse(e.to_string()))?;

        fs::write(path, json).map_err(|e| TrackerError::io(e.to_string()))
    }
}
