//! Tracker configuration

use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracker_core::{WalletAddress, DEFAULT_THRESHOLD_BIPS};
use tracker_reya::{REYA_API_BASE, REYA_WS_URL};

use crate::stream::RECONNECT_DELAY;

/// Runtime configuration of the tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Reya REST base URL
    pub api_url: String,
    /// Reya WebSocket URL
    pub ws_url: String,
    /// Delay before reconnecting a dropped stream
    pub reconnect_delay: Duration,
    /// Minimum price move (in basis points) for a streamed price to be applied
    pub price_threshold_bips: Decimal,
    /// File the selected wallet is persisted to
    pub state_file: PathBuf,
    /// Wallet to track on startup, overriding the persisted one
    pub initial_wallet: Option<WalletAddress>,
    pub server_port: u16,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: REYA_API_BASE.to_string(),
            ws_url: REYA_WS_URL.to_string(),
            reconnect_delay: RECONNECT_DELAY,
            price_threshold_bips: DEFAULT_THRESHOLD_BIPS,
            state_file: PathBuf::from("data/wallet.json"),
            initial_wallet: None,
            server_port: 3001,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables
    ///
    /// All variables are optional:
    /// - REYA_API_URL: REST base URL
    /// - REYA_WS_URL: WebSocket URL (`ws://` or `wss://`)
    /// - TRACKER_RECONNECT_DELAY_MS: reconnect delay in milliseconds
    /// - TRACKER_PRICE_THRESHOLD_BIPS: price deviation threshold
    /// - TRACKER_STATE_FILE: wallet persistence file
    /// - TRACKER_WALLET: wallet to track on startup
    /// - SERVER_PORT: HTTP port
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = match var("REYA_API_URL") {
            Some(url) => parse_url("REYA_API_URL", &url, &["http", "https"])?,
            None => defaults.api_url,
        };

        let ws_url = match var("REYA_WS_URL") {
            Some(url) => parse_url("REYA_WS_URL", &url, &["ws", "wss"])?,
            None => defaults.ws_url,
        };

        let reconnect_delay = match var("TRACKER_RECONNECT_DELAY_MS") {
            Some(ms) => Duration::from_millis(parse_value::<u64>("TRACKER_RECONNECT_DELAY_MS", &ms)?),
            None => defaults.reconnect_delay,
        };

        let price_threshold_bips = match var("TRACKER_PRICE_THRESHOLD_BIPS") {
            Some(bips) => {
                let bips = parse_value::<Decimal>("TRACKER_PRICE_THRESHOLD_BIPS", &bips)?;
                if bips.is_sign_negative() {
                    return Err(ConfigError::InvalidValue {
                        field: "TRACKER_PRICE_THRESHOLD_BIPS".to_string(),
                        error: "must not be negative".to_string(),
                    });
                }
                bips
            }
            None => defaults.price_threshold_bips,
        };

        let state_file = var("TRACKER_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.state_file);

        let initial_wallet = match var("TRACKER_WALLET") {
            Some(address) => Some(WalletAddress::parse(&address).map_err(|e| {
                ConfigError::InvalidValue {
                    field: "TRACKER_WALLET".to_string(),
                    error: e.to_string(),
                }
            })?),
            None => None,
        };

        let server_port = match var("SERVER_PORT") {
            Some(port) => parse_value::<u16>("SERVER_PORT", &port)?,
            None => defaults.server_port,
        };

        Ok(Self {
            api_url,
            ws_url,
            reconnect_delay,
            price_threshold_bips,
            state_file,
            initial_wallet,
            server_port,
        })
    }
}

fn parse_value<T>(field: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            error: e.to_string(),
        })
}

fn parse_url(field: &str, raw: &str, schemes: &[&str]) -> Result<String, ConfigError> {
    let url = url::Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        error: e.to_string(),
    })?;

    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            error: format!("unsupported scheme {}", url.scheme()),
        });
    }

    Ok(raw.trim().trim_end_matches('/').to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {error}")]
    InvalidValue { field: String, error: String },
}
