//! # fv-runner
//!
//! Command-line front end for the broker adapters.
//!
//! Loads a JSON configuration file, builds the adapter for the selected
//! account, runs one query and prints the result as JSON.
//!
//! # Usage
//!
//! ```bash
//! fv-runner config.json nav
//! fv-runner config.json --account main candles --symbol INFY-EQ --granularity 5min --count 2
//! fv-runner config.json quote --symbol RELIANCE-EQ
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use fv_core::CandleRequest;
use fv_core::config::AppConfig;
use fv_core::logging::{LogFormat, LogSettings};
use fv_td::BrokerCapability;
use fv_td::finvasia::candles::parse_granularity;
use tracing::info;

/// Finvasia broker adapter runner.
#[derive(Parser)]
#[command(name = "fv-runner", about = "Finvasia broker adapter runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    /// Log line format (text or json).
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Account name from the config (defaults to the first account).
    #[arg(short, long)]
    account: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and report whether the session is authenticated.
    Login,
    /// Net asset value of holdings.
    Nav,
    /// Cash balance.
    Balance,
    /// Open positions.
    Positions {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Pending orders.
    Orders {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Today's fills.
    Trades {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Historical candles.
    Candles {
        #[arg(long)]
        symbol: String,
        /// Bar length, e.g. `1min`, `15min`, `1h`.
        #[arg(long, default_value = "5min")]
        granularity: String,
        /// Span in days.
        #[arg(long)]
        count: Option<u32>,
        /// Range start, RFC 3339 or `YYYY-mm-dd HH:MM:SS` (UTC).
        #[arg(long)]
        start: Option<String>,
        /// Range end, same formats as `--start`.
        #[arg(long)]
        end: Option<String>,
    },
    /// Five-level depth snapshot.
    Quote {
        #[arg(long)]
        symbol: String,
    },
    /// Cancel a working order.
    Cancel {
        #[arg(long)]
        order_id: String,
    },
}

fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("invalid time {text:?}"))
}

/// Build the adapter for `account` (the first account when `None`),
/// dispatching on its `exchange` field.
fn build_broker(config: &AppConfig, account: Option<&str>) -> Result<Box<dyn BrokerCapability>> {
    let account = config
        .account(account)
        .ok_or_else(|| anyhow!("no account {account:?} in config"))?;
    let broker = fv_td::registry::create_broker(account)?;
    info!("account '{}' ready ({})", account.label(), broker.name());
    Ok(broker)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = fv_core::config::load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    // 2. Initialize logging (CLI flags override the config block)
    let meta = config.logging.clone().unwrap_or_default();
    let mut log = LogSettings::from_meta(&meta, "fv-runner");
    if let Some(level) = cli.log_level.clone() {
        log.level = level;
    }
    if let Some(dir) = cli.log_dir.clone() {
        log.dir = Some(dir);
    }
    if let Some(format) = cli.log_format {
        log.format = format;
    }
    fv_core::logging::init_logging(&log);

    info!(
        "fv-runner starting, config={}, {} account(s)",
        cli.config.display(),
        config.accounts.len()
    );

    // 3. Build the adapter for the selected account
    let broker = build_broker(&config, cli.account.as_deref())?;

    // 4. Run the command
    match cli.command {
        Command::Login => {
            let ok = broker.ensure_connected().await;
            print_json(&serde_json::json!({ "authenticated": ok }))?;
        }
        Command::Nav => print_json(&broker.get_nav().await?)?,
        Command::Balance => print_json(&broker.get_balance().await?)?,
        Command::Positions { symbol } => {
            print_json(&broker.get_positions(symbol.as_deref()).await?)?;
        }
        Command::Orders { symbol } => print_json(&broker.get_orders(symbol.as_deref()).await?)?,
        Command::Trades { symbol } => print_json(&broker.get_trades(symbol.as_deref()).await?)?,
        Command::Candles {
            symbol,
            granularity,
            count,
            start,
            end,
        } => {
            let mut request = CandleRequest::new(symbol, parse_granularity(&granularity)?);
            request.count = count;
            request.start = start.as_deref().map(parse_time).transpose()?;
            request.end = end.as_deref().map(parse_time).transpose()?;
            print_json(&broker.get_candles(&request).await?)?;
        }
        Command::Quote { symbol } => print_json(&broker.get_orderbook(&symbol).await?)?,
        Command::Cancel { order_id } => {
            broker.cancel_order(&order_id).await?;
            print_json(&serde_json::json!({ "cancelled": order_id }))?;
        }
    }

    Ok(())
}
