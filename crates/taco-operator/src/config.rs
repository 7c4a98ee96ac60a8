//! Configuration for taco-operator

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use taco_fulfillment::FulfillmentConfig;

/// Main operator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Controller configuration
    #[serde(default)]
    pub controller: ControllerConfig,

    /// MealMe client configuration
    #[serde(default)]
    pub fulfillment: FulfillmentConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Full resync interval in seconds
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,

    /// Number of reconcile workers
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciles: usize,

    /// Deadline for one reconciliation, in seconds
    #[serde(default = "default_reconcile_timeout")]
    pub reconcile_timeout_secs: u64,

    /// First retry delay in milliseconds; doubles per consecutive failure
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,

    /// Retry delay ceiling in seconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: default_resync_interval(),
            max_concurrent_reconciles: default_max_concurrent(),
            reconcile_timeout_secs: default_reconcile_timeout(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl ControllerConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs.max(1))
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Manifest file or directory applied at startup
    #[serde(default)]
    pub manifests: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_resync_interval() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    4
}

fn default_reconcile_timeout() -> u64 {
    60
}

fn default_base_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl OperatorConfig {
    /// Load configuration from defaults, an optional file, and `TACO__` environment variables
    ///
    /// Nested keys use a double underscore, e.g.
    /// `TACO__CONTROLLER__MAX_CONCURRENT_RECONCILES=8`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&OperatorConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TACO")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
