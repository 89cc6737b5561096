//! Configuration management for the seating service.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::expiry::NotificationExpiry;
use seatwarden_runtime::StoreConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seating behaviour
    pub seating: SeatingConfig,
    /// Channel store runtime
    pub runtime: RuntimeConfig,
    /// Prometheus exporter
    pub metrics: MetricsConfig,
}

/// Seating behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatingConfig {
    /// Lifetime of confirmation prompts, in seconds
    pub prompt_ttl_secs: u64,
    /// Lifetime of granted/denied acknowledgements, in seconds
    pub ack_ttl_secs: u64,
    /// How long a hub call waits for its channel to answer, in milliseconds
    pub reply_timeout_ms: u64,
}

/// Channel store runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Feedback actions buffered per channel for request/response observers
    pub broadcast_capacity: usize,
    /// Grace period for in-flight effects on shutdown, in seconds
    pub shutdown_timeout_secs: u64,
}

/// Prometheus exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Listen address for `/metrics`; the exporter is off when unset
    pub addr: Option<SocketAddr>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    ///
    /// Unparseable values fall back to the defaults.
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
        let parsed = |key: &str| lookup(key).and_then(|value| value.trim().parse().ok());

        Self {
            seating: SeatingConfig {
                prompt_ttl_secs: parsed("SEATING_PROMPT_TTL_SECS").unwrap_or(15),
                ack_ttl_secs: parsed("SEATING_ACK_TTL_SECS").unwrap_or(30),
                reply_timeout_ms: parsed("SEATING_REPLY_TIMEOUT_MS").unwrap_or(5000),
            },
            runtime: RuntimeConfig {
                broadcast_capacity: lookup("SEATING_BROADCAST_CAPACITY")
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(256),
                shutdown_timeout_secs: parsed("SEATING_SHUTDOWN_TIMEOUT_SECS").unwrap_or(5),
            },
            metrics: MetricsConfig {
                addr: lookup("METRICS_ADDR").and_then(|value| value.trim().parse().ok()),
            },
        }
    }

    /// Notice lifetimes
    #[must_use]
    pub const fn expiry(&self) -> NotificationExpiry {
        NotificationExpiry::new(
            Duration::from_secs(self.seating.prompt_ttl_secs),
            Duration::from_secs(self.seating.ack_ttl_secs),
        )
    }

    /// Per-channel store settings
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(
            self.runtime.broadcast_capacity,
            Duration::from_secs(self.runtime.shutdown_timeout_secs),
        )
    }

    /// Hub reply timeout
    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.seating.reply_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
