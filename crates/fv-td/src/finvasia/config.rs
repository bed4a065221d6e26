//! Finvasia adapter configuration.
//!
//! Holds login credentials, endpoint URLs, and session tuning. All URL and
//! timing fields have production defaults so only the credential fields
//! need to be specified. Upper-case key aliases (`TOTP_KEY`, `API_KEY`, ...)
//! match the broker's own sample configs.

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for the Finvasia adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct FinvasiaConfig {
    /// API secret issued with the vendor code.
    #[serde(alias = "API_KEY")]
    pub api_key: String,

    /// Login user id (e.g. `FA12345`).
    #[serde(alias = "USER_NAME")]
    pub user_name: String,

    /// Plain-text password; hashed before it leaves the process.
    #[serde(alias = "PASSWORD")]
    pub password: String,

    /// Base32 TOTP seed.
    #[serde(alias = "TOTP_KEY")]
    pub totp_key: String,

    /// TOTP step in seconds.
    #[serde(alias = "TOTP_INTERVAL", default = "default_totp_interval")]
    pub totp_interval: u64,

    /// Vendor code; defaults to `<user_name>_U`.
    #[serde(default)]
    pub vendor_code: Option<String>,

    /// Device identifier sent as `imei`.
    #[serde(default = "default_device_id")]
    pub device_id: String,

    // -- Endpoints --
    /// REST base URL (endpoint names are appended).
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    /// Zipped instrument reference file.
    #[serde(default = "default_symbols_url")]
    pub symbols_url: String,

    /// Directory holding the dated reference cache files.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    // -- Trading defaults --
    /// Exchange segment for orders and data.
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Product code (`C` delivery, `I` intraday, `M` margin).
    #[serde(default = "default_product")]
    pub product: String,

    // -- Session --
    /// Login attempts before giving up.
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,

    /// Pause between login attempts (milliseconds).
    #[serde(default = "default_login_retry_delay_ms")]
    pub login_retry_delay_ms: u64,

    /// Per-request HTTP timeout (seconds).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl FinvasiaConfig {
    /// Effective vendor code.
    pub fn vendor_code(&self) -> String {
        self.vendor_code
            .clone()
            .unwrap_or_else(|| format!("{}_U", self.user_name))
    }

    /// Config with credentials set and every other field at its default.
    pub fn with_credentials(
        user_name: impl Into<String>,
        password: impl Into<String>,
        api_key: impl Into<String>,
        totp_key: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            user_name: user_name.into(),
            password: password.into(),
            totp_key: totp_key.into(),
            totp_interval: default_totp_interval(),
            vendor_code: None,
            device_id: default_device_id(),
            rest_url: default_rest_url(),
            symbols_url: default_symbols_url(),
            cache_dir: default_cache_dir(),
            exchange: default_exchange(),
            product: default_product(),
            login_attempts: default_login_attempts(),
            login_retry_delay_ms: default_login_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default helpers (used by serde)
// ---------------------------------------------------------------------------

fn default_totp_interval() -> u64 {
    30
}

fn default_device_id() -> String {
    "fv-td".into()
}

fn default_rest_url() -> String {
    "https://api.shoonya.com/NorenWClientTP".into()
}

fn default_symbols_url() -> String {
    "https://api.shoonya.com/NSE_symbols.txt.zip".into()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_exchange() -> String {
    "NSE".into()
}

fn default_product() -> String {
    "C".into()
}

fn default_login_attempts() -> u32 {
    10
}

fn default_login_retry_delay_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    15
}
