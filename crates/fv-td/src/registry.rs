//! Broker registry: build an adapter from an account entry.

use anyhow::{Context, Result, anyhow};
use fv_core::config::AccountConfig;

use crate::BrokerCapability;
use crate::finvasia::FinvasiaBroker;
use crate::finvasia::config::FinvasiaConfig;

/// Create a [`BrokerCapability`] for the account's `exchange` field.
pub fn create_broker(account: &AccountConfig) -> Result<Box<dyn BrokerCapability>> {
    match account.exchange.to_lowercase().as_str() {
        "finvasia" | "shoonya" => {
            let config: FinvasiaConfig = account
                .settings_as()
                .with_context(|| format!("invalid finvasia settings for account '{}'", account.label()))?;
            Ok(Box::new(FinvasiaBroker::new(config)?))
        }
        other => Err(anyhow!("Unknown broker: {other}")),
    }
}
