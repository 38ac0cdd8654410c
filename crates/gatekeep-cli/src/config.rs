//! CLI configuration management.
//!
//! Persists the server URL, operator token and admin username to
//! `~/.config/gatekeep/cli.json`. Passwords are never written to disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::Credentials;

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Server base URL (e.g., "<https://gate.example.com>").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// Operator bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Admin username for Basic auth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl CliConfig {
    /// Path to the config file: `~/.config/gatekeep/cli.json`.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gatekeep").join("cli.json"))
    }

    /// Load config from the default path. Missing or unreadable files yield
    /// the default config.
    pub fn load() -> Self {
        Self::config_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path =
            Self::config_path().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Pick credentials from explicit flags first, then stored values.
    ///
    /// A password selects Basic auth; otherwise a bearer token is required.
    pub fn credentials(
        &self,
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> anyhow::Result<Credentials> {
        if let Some(password) = password {
            let username = username
                .or_else(|| self.username.clone())
                .unwrap_or_else(|| "admin".to_string());
            return Ok(Credentials::Basic { username, password });
        }
        token
            .or_else(|| self.token.clone())
            .map(Credentials::Bearer)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No credentials. Pass --token (or GATEKEEP_TOKEN), or --password for Basic auth"
                )
            })
    }
}
