//! Authenticated session for one broker account.
//!
//! A [`Session`] owns the REST client, the symbol resolver and the current
//! session token. [`Session::ensure_connected`] is the only place a login
//! happens; every other call goes through [`Session::request`], which
//! attaches `uid` and `jKey` and drops the token when the upstream reports
//! it as expired.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fv_core::error::{FvError, Result};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::auth;
use super::client::{self, RestClient};
use super::config::FinvasiaConfig;
use super::responses::{LoginResponse, Stat, is_session_expired, stat_of};
use super::symbol_master::SymbolResolver;

/// Credentials returned by a successful `QuickAuth`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    /// `susertoken`, sent as `jKey`.
    pub user_token: String,
    /// `actid`, required by the account endpoints.
    pub account_id: String,
}

#[derive(Debug, Default)]
struct SessionState {
    auth: Option<AuthToken>,
    last_login_attempt: Option<DateTime<Utc>>,
    /// Set after the first successful login has triggered a reference load.
    reference_loaded: bool,
}

/// Session manager for one account.
pub struct Session {
    config: FinvasiaConfig,
    client: RestClient,
    resolver: SymbolResolver,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(config: FinvasiaConfig) -> Result<Self> {
        if config.user_name.is_empty() {
            return Err(FvError::Config("user_name is required".into()));
        }
        let client = RestClient::new(
            &config.rest_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let resolver = SymbolResolver::new(
            client.http().clone(),
            config.symbols_url.clone(),
            config.cache_dir.clone(),
        );
        Ok(Self {
            config,
            client,
            resolver,
            state: Mutex::new(SessionState::default()),
        })
    }

    pub fn config(&self) -> &FinvasiaConfig {
        &self.config
    }

    /// Symbol → token / tick size lookups.
    pub fn symbols(&self) -> &SymbolResolver {
        &self.resolver
    }

    /// Log in if not already authenticated.
    ///
    /// Makes up to `login_attempts` attempts, sleeping
    /// `login_retry_delay_ms` between them. The state lock is held for the
    /// whole sequence, so concurrent callers wait for the one login instead
    /// of starting their own. Returns `false` once every attempt has failed.
    pub async fn ensure_connected(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.auth.is_some() {
            return true;
        }

        let attempts = self.config.login_attempts.max(1);
        let delay = Duration::from_millis(self.config.login_retry_delay_ms);

        for attempt in 1..=attempts {
            state.last_login_attempt = Some(fv_core::time_util::now_utc());
            match self.login_once().await {
                Ok(token) => {
                    info!(
                        "[finvasia] logged in as {} (attempt {attempt}/{attempts})",
                        self.config.user_name
                    );
                    state.auth = Some(token);
                    if !state.reference_loaded {
                        state.reference_loaded = true;
                        if let Err(e) = self.resolver.refresh().await {
                            warn!("[finvasia] instrument reference refresh failed: {e}");
                        }
                    }
                    return true;
                }
                Err(e) => {
                    error!("[finvasia] login attempt {attempt}/{attempts} failed: {e}");
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        error!(
            "[finvasia] unable to authenticate {} after {attempts} attempts",
            self.config.user_name
        );
        false
    }

    /// Current token, logging in first if needed.
    pub async fn token(&self) -> Result<AuthToken> {
        if !self.ensure_connected().await {
            return Err(FvError::Authentication(format!(
                "unable to authenticate {}",
                self.config.user_name
            )));
        }
        self.state
            .lock()
            .await
            .auth
            .clone()
            .ok_or_else(|| FvError::Authentication("session invalidated".into()))
    }

    /// Forget the current token; the next call logs in again.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if state.auth.take().is_some() {
            warn!("[finvasia] session invalidated");
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.auth.is_some()
    }

    /// Time of the most recent login attempt, if any.
    pub async fn last_login_attempt(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_login_attempt
    }

    /// POST `payload` to `endpoint` with `uid` and the session key attached.
    pub async fn request(&self, endpoint: &str, payload: Map<String, Value>) -> Result<Value> {
        let token = self.token().await?;
        self.send(endpoint, payload, &token).await
    }

    /// Like [`request`](Self::request), additionally attaching `actid`.
    pub async fn account_request(
        &self,
        endpoint: &str,
        mut payload: Map<String, Value>,
    ) -> Result<Value> {
        let token = self.token().await?;
        payload
            .entry("actid")
            .or_insert_with(|| Value::String(token.account_id.clone()));
        self.send(endpoint, payload, &token).await
    }

    async fn send(
        &self,
        endpoint: &str,
        mut payload: Map<String, Value>,
        token: &AuthToken,
    ) -> Result<Value> {
        payload
            .entry("uid")
            .or_insert_with(|| Value::String(self.config.user_name.clone()));
        let resp = self
            .client
            .post(endpoint, &Value::Object(payload), Some(&token.user_token))
            .await?;

        if let Stat::NotOk(msg) = stat_of(&resp) {
            if is_session_expired(&msg) {
                self.invalidate().await;
                return Err(FvError::Authentication(format!("{endpoint}: {msg}")));
            }
        }
        Ok(resp)
    }

    async fn login_once(&self) -> Result<AuthToken> {
        let cfg = &self.config;
        let factor2 = auth::totp_now(&cfg.totp_key, cfg.totp_interval)?;
        let payload = json!({
            "source": "API",
            "apkversion": "1.0.0",
            "uid": cfg.user_name,
            "pwd": auth::sha256_hex(&cfg.password),
            "factor2": factor2,
            "vc": cfg.vendor_code(),
            "appkey": auth::app_key_hash(&cfg.user_name, &cfg.api_key),
            "imei": cfg.device_id,
        });

        let value = self.client.post(client::QUICK_AUTH, &payload, None).await?;
        let resp: LoginResponse = serde_json::from_value(value)
            .map_err(|e| FvError::malformed(client::QUICK_AUTH, e))?;

        match resp.susertoken {
            Some(user_token) if resp.stat == super::responses::STAT_OK => Ok(AuthToken {
                user_token,
                account_id: resp.actid.unwrap_or_else(|| cfg.user_name.clone()),
            }),
            _ => Err(FvError::Authentication(
                resp.emsg.unwrap_or_else(|| "login rejected".into()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_user_is_config_error() {
        let cfg = FinvasiaConfig::with_credentials("", "pw", "key", "GEZDGNBV");
        assert!(matches!(Session::new(cfg), Err(FvError::Config(_))));
    }

    #[tokio::test]
    async fn invalid_seed_never_authenticates() {
        let mut cfg = FinvasiaConfig::with_credentials("FA1", "pw", "key", "not base32!");
        cfg.login_attempts = 2;
        cfg.login_retry_delay_ms = 0;
        // The seed is rejected before any request is sent.
        cfg.rest_url = "http://127.0.0.1:9".into();
        let session = Session::new(cfg).unwrap();

        assert!(!session.ensure_connected().await);
        assert!(session.last_login_attempt().await.is_some());
        assert!(matches!(
            session.token().await,
            Err(FvError::Authentication(_))
        ));
    }
}
