//! Configuration resolution for the Gatekeep server.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`~/.config/gatekeep/server.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`GATEKEEP_*`)
//! 5. CLI arguments (applied by the binary, highest priority)
//!
//! Files are merged key by key, so a file only needs the fields it changes.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub const DEV_DEVICE_TOKEN_SECRET: &str = "dev-device-secret-change-me";
pub const DEV_OPERATOR_TOKEN_SECRET: &str = "dev-operator-secret-change-me";

/// Longest accepted device token lifetime: one year.
pub const MAX_DEVICE_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Complete server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub auth: AuthConfig,
    pub device_defaults: DeviceDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3002)),
            database_path: None,
            auth: AuthConfig::default(),
            device_defaults: DeviceDefaults::default(),
        }
    }
}

/// Secrets and credentials for the two trust domains.
///
/// Device tokens and operator tokens are signed with different secrets so a
/// leaked device secret never grants dashboard access, and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub device_token_secret: String,
    /// Lifetime of device tokens in seconds.
    pub device_token_ttl_secs: i64,
    /// Secret the dashboard uses to sign operator tokens.
    pub operator_token_secret: String,
    pub admin_username: String,
    /// Argon2id PHC string. Basic auth is disabled when unset.
    pub admin_password_hash: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            device_token_secret: DEV_DEVICE_TOKEN_SECRET.to_string(),
            device_token_ttl_secs: 7 * 24 * 60 * 60, // 7 days
            operator_token_secret: DEV_OPERATOR_TOKEN_SECRET.to_string(),
            admin_username: "admin".to_string(),
            admin_password_hash: None,
        }
    }
}

/// Settings handed to terminals when they register.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDefaults {
    pub server_base_url: Option<String>,
    pub ntp_server: Option<String>,
    pub polling_interval_ms: u64,
    /// Log buffer capacity the terminal should allocate.
    pub queue_size: u32,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            server_base_url: None,
            ntp_server: Some("pool.ntp.org".to_string()),
            polling_interval_ms: 3000,
            queue_size: 100,
        }
    }
}

impl ServerConfig {
    /// Reject configurations the server cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        let auth = &self.auth;
        if auth.device_token_secret.is_empty() || auth.operator_token_secret.is_empty() {
            return Err(Error::Config("token secrets must not be empty".into()));
        }
        if auth.device_token_secret == auth.operator_token_secret {
            return Err(Error::Config(
                "device and operator token secrets must differ".into(),
            ));
        }
        if !(1..=MAX_DEVICE_TOKEN_TTL_SECS).contains(&auth.device_token_ttl_secs) {
            return Err(Error::Config(format!(
                "device_token_ttl_secs must be between 1 and {MAX_DEVICE_TOKEN_TTL_SECS}"
            )));
        }
        if self.device_defaults.polling_interval_ms == 0 {
            return Err(Error::Config("polling_interval_ms must be positive".into()));
        }
        if self.device_defaults.queue_size == 0 {
            return Err(Error::Config("queue_size must be positive".into()));
        }
        Ok(())
    }

    /// Whether either token secret is still the built-in development value.
    pub fn uses_dev_secrets(&self) -> bool {
        self.auth.device_token_secret == DEV_DEVICE_TOKEN_SECRET
            || self.auth.operator_token_secret == DEV_OPERATOR_TOKEN_SECRET
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<ServerConfig> {
    let mut merged = serde_json::to_value(ServerConfig::default())?;

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            merge_json(&mut merged, load_config_file(&global_path)?);
        }
    }

    if let Some(path) = explicit {
        merge_json(&mut merged, load_config_file(path)?);
    }

    let mut config: ServerConfig = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .map(|p| p.join("gatekeep").join("server.json"))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Recursively merge `overlay` into `base`; objects merge per key, every
/// other value replaces.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn apply_env_overrides(
    config: &mut ServerConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    fn parsed<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
        raw.parse()
            .map_err(|_| Error::Config(format!("{key}={raw:?} is not a valid value")))
    }

    if let Some(v) = lookup("GATEKEEP_LISTEN_ADDR") {
        config.listen_addr = parsed("GATEKEEP_LISTEN_ADDR", &v)?;
    }
    if let Some(v) = lookup("GATEKEEP_DATABASE_PATH") {
        config.database_path = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup("GATEKEEP_DEVICE_TOKEN_SECRET") {
        config.auth.device_token_secret = v;
    }
    if let Some(v) = lookup("GATEKEEP_DEVICE_TOKEN_TTL_SECS") {
        config.auth.device_token_ttl_secs = parsed("GATEKEEP_DEVICE_TOKEN_TTL_SECS", &v)?;
    }
    if let Some(v) = lookup("GATEKEEP_OPERATOR_TOKEN_SECRET") {
        config.auth.operator_token_secret = v;
    }
    if let Some(v) = lookup("GATEKEEP_ADMIN_USERNAME") {
        config.auth.admin_username = v;
    }
    if let Some(v) = lookup("GATEKEEP_ADMIN_PASSWORD_HASH") {
        config.auth.admin_password_hash = Some(v);
    }
    if let Some(v) = lookup("GATEKEEP_SERVER_BASE_URL") {
        config.device_defaults.server_base_url = Some(v);
    }
    if let Some(v) = lookup("GATEKEEP_NTP_SERVER") {
        config.device_defaults.ntp_server = Some(v);
    }
    if let Some(v) = lookup("GATEKEEP_POLLING_INTERVAL_MS") {
        config.device_defaults.polling_interval_ms = parsed("GATEKEEP_POLLING_INTERVAL_MS", &v)?;
    }
    if let Some(v) = lookup("GATEKEEP_QUEUE_SIZE") {
        config.device_defaults.queue_size = parsed("GATEKEEP_QUEUE_SIZE", &v)?;
    }
    Ok(())
}
