use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MarionetteError, Result};

/// Top-level configuration for the marionette runtime.
///
/// Loaded from a TOML file. Each section corresponds to one pipeline stage
/// or cross-cutting concern. A missing or malformed file, and a config that
/// fails [`MarionetteConfig::validate`], are startup-fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarionetteConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Per-handler enable flags, priorities, and free-form settings,
    /// keyed by handler name.
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,
}

impl Default for MarionetteConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            store: StoreConfig::default(),
            rate_limit: RateLimitConfig::default(),
            executor: ExecutorConfig::default(),
            locator: LocatorConfig::default(),
            recovery: RecoveryConfig::default(),
            api: ApiConfig::default(),
            notify: NotifyConfig::default(),
            handlers: BTreeMap::new(),
        }
    }
}

impl MarionetteConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parsed values fail validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MarionetteConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject configurations the pipeline cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.store.db_key.is_empty() {
            return Err(MarionetteError::Config(
                "store.db_key is required".to_string(),
            ));
        }
        if self.executor.max_retries == 0 {
            return Err(MarionetteError::Config(
                "executor.max_retries must be at least 1".to_string(),
            ));
        }
        if self.recovery.failure_threshold == 0 {
            return Err(MarionetteError::Config(
                "recovery.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.short_capacity < 1.0 || self.rate_limit.long_capacity < 1.0 {
            return Err(MarionetteError::Config(
                "rate_limit capacities must admit at least one action".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the poll cursor and runtime artifacts.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.marionette/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Message store polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Decryption key for the chat client's message store. Required.
    pub db_key: String,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Size of the recently-seen row-id set used for dedup.
    pub dedup_capacity: usize,
    /// Bound of the message queue between poller and dispatcher.
    pub queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_key: String::new(),
            poll_interval_ms: 750,
            dedup_capacity: 4096,
            queue_capacity: 256,
        }
    }
}

/// Dual token-bucket admission control for the executor.
///
/// The short bucket absorbs bursts, the long bucket bounds sustained
/// throughput against the target's behavioral detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub short_capacity: f64,
    /// Tokens per second.
    pub short_refill_rate: f64,
    pub long_capacity: f64,
    /// Tokens per second.
    pub long_refill_rate: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            short_capacity: 2.0,
            short_refill_rate: 0.2,
            long_capacity: 15.0,
            long_refill_rate: 0.25,
        }
    }
}

/// Retry, timeout, and pacing settings for action execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum attempts per action (at least 1).
    pub max_retries: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Deadline for a single attempt, in milliseconds.
    pub attempt_timeout_ms: u64,
    /// Deadline for the whole action, in milliseconds.
    pub action_timeout_ms: u64,
    /// Fixed pause after each UI interaction, in milliseconds.
    pub action_delay_ms: u64,
    /// Fixed pause after scrolling, in milliseconds.
    pub scroll_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1_000,
            attempt_timeout_ms: 10_000,
            action_timeout_ms: 45_000,
            action_delay_ms: 500,
            scroll_delay_ms: 300,
        }
    }
}

/// On-screen target recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Minimum text-recognition confidence for a match (0.0 to 1.0).
    pub confidence_threshold: f64,
    /// Pixel tolerance when merging adjacent recognized fragments.
    pub merge_tolerance: u32,
    /// Display name of the anchor control probed during recovery.
    pub anchor: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            merge_tolerance: 10,
            anchor: "Chats".to_string(),
        }
    }
}

/// Failure-streak and recovery settings for the health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Consecutive failures before Healthy degrades.
    pub failure_threshold: u32,
    /// Recovery attempts before the episode is declared Failed.
    pub max_attempts: u32,
    /// Pause between recovery attempts, in seconds.
    pub cooldown_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            max_attempts: 3,
            cooldown_secs: 10,
        }
    }
}

/// Remote tool-invocation surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3939,
        }
    }
}

/// Operator escalation channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Chat-ops webhook receiving escalation payloads. Empty disables
    /// delivery (escalations are then only logged).
    pub webhook_url: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
        }
    }
}

/// Per-handler configuration: enablement, chain priority, and free-form
/// handler-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub enabled: bool,
    /// Overrides the handler's default priority when set.
    pub priority: Option<i32>,
    /// Opaque settings table passed to the handler at construction.
    pub settings: toml::Table,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
            settings: toml::Table::new(),
        }
    }
}
