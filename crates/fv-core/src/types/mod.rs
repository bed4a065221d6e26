//! Core data types shared between the adapter and its callers.
//!
//! These are the broker-agnostic value objects: the adapter translates the
//! exchange's native records into them and back.

pub mod enums;
pub mod market_data;
pub mod trading;

pub use enums::*;
pub use market_data::*;
pub use trading::*;
