//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output is always on; a daily-rotating file is added when a log
//! directory is configured. Both sinks share one [`LogFormat`], so a
//! deployment that ships logs to a collector can switch everything to JSON
//! from the config file:
//!
//! ```json
//! "logging": { "module_name": "fv-runner", "log_path": "/var/log/fv", "log_format": "json" }
//! ```
//!
//! `RUST_LOG` overrides the configured level.

use std::str::FromStr;

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ModuleMeta;

/// Line format for every log sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines (colored on the console).
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?} (expected text or json)")),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Default level when `RUST_LOG` is unset (e.g. `"info"`).
    pub level: String,
    /// Directory for daily-rotating log files.
    pub dir: Option<String>,
    /// Log file prefix.
    pub module_name: String,
    pub format: LogFormat,
    /// Include thread ids in every line.
    pub thread_ids: bool,
}

impl LogSettings {
    /// Settings from a config `logging` block, with `default_module` as the
    /// file prefix when the block names none.
    pub fn from_meta(meta: &ModuleMeta, default_module: &str) -> Self {
        Self {
            level: meta.log_level.clone().unwrap_or_else(|| "info".into()),
            dir: meta.log_path.clone(),
            module_name: meta
                .module_name
                .clone()
                .unwrap_or_else(|| default_module.into()),
            format: meta.log_format.unwrap_or_default(),
            thread_ids: meta.thread_ids.unwrap_or(false),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(settings: &LogSettings) -> BoxedLayer {
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(settings.thread_ids);
    match settings.format {
        LogFormat::Text => layer.with_ansi(true).boxed(),
        LogFormat::Json => layer.json().with_ansi(false).boxed(),
    }
}

fn file_layer(settings: &LogSettings, dir: &str) -> BoxedLayer {
    let appender = tracing_appender::rolling::daily(dir, &settings.module_name);
    let layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(settings.thread_ids);
    match settings.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Initialize the global tracing subscriber.
///
/// Should be called once at program start. After this, all `tracing::info!()`
/// etc. macros will produce output.
pub fn init_logging(settings: &LogSettings) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let mut layers = vec![console_layer(settings)];
    if let Some(dir) = settings.dir.as_deref() {
        layers.push(file_layer(settings, dir));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_from_meta() {
        let meta: ModuleMeta = serde_json::from_str(
            r#"{ "log_path": "/tmp/fv", "log_level": "debug", "log_format": "json", "thread_ids": true }"#,
        )
        .unwrap();
        let settings = LogSettings::from_meta(&meta, "fv-runner");
        assert_eq!(settings.module_name, "fv-runner");
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.dir.as_deref(), Some("/tmp/fv"));
        assert_eq!(settings.format, LogFormat::Json);
        assert!(settings.thread_ids);
    }

    #[test]
    fn defaults_to_text_at_info() {
        let settings = LogSettings::from_meta(&ModuleMeta::default(), "fv-runner");
        assert_eq!(settings.level, "info");
        assert_eq!(settings.format, LogFormat::Text);
        assert!(!settings.thread_ids);
        assert!(serde_json::from_str::<ModuleMeta>(r#"{ "log_format": "xml" }"#).is_err());
    }

    #[test]
    fn format_from_cli_text() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("plain".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
