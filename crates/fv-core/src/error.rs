//! Typed error definitions for the Finvasia adapter.
//!
//! Provides [`FvError`] so callers can tell a contract violation (bad
//! granularity, missing range parameters) apart from an upstream rejection
//! or a broken session. All variants implement `std::error::Error` via
//! `thiserror`, so they integrate with `anyhow::Result` in the binaries.

use thiserror::Error;

/// Domain-specific errors for the Finvasia adapter.
#[derive(Debug, Error)]
pub enum FvError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The session could not be authenticated (login retries exhausted).
    #[error("unable to authenticate: {0}")]
    Authentication(String),

    /// The symbol is absent from the instrument reference table.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// The instrument reference table could not be loaded.
    #[error("reference data unavailable: {0}")]
    ReferenceData(String),

    /// Candle granularity outside the supported set.
    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    /// The combination of count / start / end does not describe a range.
    #[error("insufficient parameters: {0}")]
    InsufficientParameters(String),

    /// Upstream refused to return data for the request.
    #[error("data unavailable for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    /// Upstream answered `Not_Ok` to a request.
    #[error("rejected by upstream: {0}")]
    Rejected(String),

    /// A response was missing expected fields or had the wrong shape.
    #[error("malformed response for {context}: {detail}")]
    MalformedResponse { context: String, detail: String },

    /// HTTP or connection level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Local file system error (reference cache).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FvError {
    /// Shorthand for [`FvError::MalformedResponse`].
    pub fn malformed(context: impl Into<String>, detail: impl ToString) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            detail: detail.to_string(),
        }
    }
}

/// Result alias used by the adapter crates.
pub type Result<T> = std::result::Result<T, FvError>;
