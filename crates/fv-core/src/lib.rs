//! # fv-core
//!
//! Core crate for the Finvasia adapter workspace, providing:
//!
//! - **Types** (`types`): generic orders, trades, positions, candles, enums
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): domain-specific `FvError` via thiserror
//! - **Deduplication** (`dedup`): timestamp-keyed first-seen filter
//! - **Time utilities** (`time_util`): epoch conversions, exchange timezone
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
