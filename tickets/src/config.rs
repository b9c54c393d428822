//! Configuration management for wastetrack.
//!
//! Loads configuration from `WASTETRACK_*` environment variables with
//! sensible defaults. Unparsable values fall back to the default.

use crate::environment::{CodeImageOptions, TicketSettings};
use crate::persistence::DEFAULT_STORAGE_KEY;
use crate::types::Location;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use wastetrack_classifier::DEFAULT_CLASSIFIER_URL;
use wastetrack_runtime::StoreConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Classification service
    pub classifier: ClassifierConfig,
    /// Snapshot storage
    pub storage: StorageConfig,
    /// Ticket creation defaults
    pub tickets: TicketSettings,
    /// Store runtime
    pub runtime: RuntimeConfig,
    /// Prometheus scrape address; metrics stay off when unset
    pub metrics_addr: Option<SocketAddr>,
}

/// Classification service configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Endpoint receiving the multipart upload
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
}

/// Snapshot storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding snapshot files
    pub data_dir: PathBuf,
    /// Key of the ticket snapshot
    pub key: String,
}

/// Store runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How long `create_waste_ticket` waits for the ticket and its credit
    pub creation_timeout: Duration,
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let defaults = TicketSettings::default();
        let code_defaults = CodeImageOptions::default();

        Self {
            classifier: ClassifierConfig {
                url: lookup("WASTETRACK_CLASSIFIER_URL")
                    .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string()),
                timeout: Duration::from_secs(parsed("WASTETRACK_CLASSIFIER_TIMEOUT_SECS").unwrap_or(30)),
            },
            storage: StorageConfig {
                data_dir: lookup("WASTETRACK_DATA_DIR")
                    .map_or_else(|| PathBuf::from(".wastetrack"), PathBuf::from),
                key: lookup("WASTETRACK_STORAGE_KEY")
                    .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            },
            tickets: TicketSettings {
                fallback_location: Location {
                    lat: lookup("WASTETRACK_FALLBACK_LAT")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(defaults.fallback_location.lat),
                    lng: lookup("WASTETRACK_FALLBACK_LNG")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(defaults.fallback_location.lng),
                    address: lookup("WASTETRACK_FALLBACK_ADDRESS")
                        .unwrap_or(defaults.fallback_location.address),
                },
                code_image: CodeImageOptions {
                    width: lookup("WASTETRACK_QR_WIDTH")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(code_defaults.width),
                    margin: lookup("WASTETRACK_QR_MARGIN")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(code_defaults.margin),
                    dark: lookup("WASTETRACK_QR_DARK").unwrap_or(code_defaults.dark),
                    light: lookup("WASTETRACK_QR_LIGHT").unwrap_or(code_defaults.light),
                },
            },
            runtime: RuntimeConfig {
                creation_timeout: Duration::from_millis(
                    parsed("WASTETRACK_CREATION_TIMEOUT_MS").unwrap_or(10_000),
                ),
                broadcast_capacity: lookup("WASTETRACK_BROADCAST_CAPACITY")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(64),
                shutdown_timeout: Duration::from_secs(
                    parsed("WASTETRACK_SHUTDOWN_TIMEOUT_SECS").unwrap_or(30),
                ),
            },
            metrics_addr: lookup("WASTETRACK_METRICS_ADDR").and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Store runtime settings
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_broadcast_capacity(self.runtime.broadcast_capacity)
            .with_shutdown_timeout(self.runtime.shutdown_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
