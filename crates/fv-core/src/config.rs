//! Configuration parsing for the adapter workspace.
//!
//! All binaries read their settings from a single JSON config file. The
//! top-level structure holds logging metadata and an `accounts` array where
//! each entry describes one broker account (one authenticated session).
//!
//! # Example config
//!
//! ```json
//! {
//!   "logging": { "module_name": "fv-runner", "log_path": "/tmp/log" },
//!   "accounts": [{
//!     "name": "main",
//!     "exchange": "finvasia",
//!     "user_name": "FA12345",
//!     "password": "...",
//!     "api_key": "...",
//!     "totp_key": "BASE32SEED"
//!   }]
//! }
//! ```
//!
//! Exchange-specific keys are kept in [`AccountConfig::settings`] and parsed
//! by the adapter crate that owns them.

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::logging::LogFormat;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Logging metadata (name, path, level).
    #[serde(default)]
    pub logging: Option<ModuleMeta>,

    /// One entry per broker account.
    pub accounts: Vec<AccountConfig>,
}

impl AppConfig {
    /// Look up an account by name, or the first account when `name` is `None`.
    pub fn account(&self, name: Option<&str>) -> Option<&AccountConfig> {
        match name {
            Some(n) => self.accounts.iter().find(|a| a.name.as_deref() == Some(n)),
            None => self.accounts.first(),
        }
    }
}

/// Logging metadata block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
    pub log_level: Option<String>,
    /// `"text"` (default) or `"json"`.
    pub log_format: Option<LogFormat>,
    pub thread_ids: Option<bool>,
}

/// A single broker account configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Optional label used to select the account from the CLI.
    #[serde(default)]
    pub name: Option<String>,

    /// Exchange / broker identifier, e.g. `"finvasia"`.
    pub exchange: String,

    /// Everything else, handed to the exchange module's own config type.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl AccountConfig {
    /// Returns the label, falling back to the exchange name.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.exchange)
    }

    /// Deserialize the exchange-specific settings into `T`.
    pub fn settings_as<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.settings.clone()))
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("invalid config JSON in {}", path.display()))?;
    debug!("config {}: {} account(s)", path.display(), config.accounts.len());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "logging": { "module_name": "fv-runner", "log_level": "debug" },
        "accounts": [
            { "name": "main", "exchange": "finvasia", "user_name": "FA1", "totp_interval": 30 },
            { "name": "alt", "exchange": "finvasia", "user_name": "FA2" }
        ]
    }"#;

    #[test]
    fn parses_accounts_and_flattened_settings() {
        let config: AppConfig = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(config.accounts.len(), 2);
        let main = config.account(None).unwrap();
        assert_eq!(main.label(), "main");
        assert_eq!(main.settings.get("user_name").unwrap(), "FA1");
        assert!(!main.settings.contains_key("exchange"));
    }

    #[test]
    fn selects_account_by_name() {
        let config: AppConfig = serde_json::from_str(SAMPLE).unwrap();
        let alt = config.account(Some("alt")).unwrap();
        assert_eq!(alt.settings.get("user_name").unwrap(), "FA2");
        assert!(config.account(Some("missing")).is_none());
    }

    #[test]
    fn label_falls_back_to_exchange() {
        let account: AccountConfig =
            serde_json::from_str(r#"{ "exchange": "finvasia" }"#).unwrap();
        assert_eq!(account.label(), "finvasia");
    }
}
