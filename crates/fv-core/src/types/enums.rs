//! Enumerations used throughout the adapter.
//!
//! Serde representations follow the generic order model: direction is a
//! signed unit (`1` / `-1`), order types and statuses are lower-case
//! kebab strings (`"stop-limit"`, `"cancelled"`).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Trade direction, serialized as `1` (long) or `-1` (short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// `+1` for long, `-1` for short.
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn reverse(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl From<Direction> for i8 {
    fn from(d: Direction) -> i8 {
        d.sign()
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Long),
            -1 => Ok(Self::Short),
            other => Err(format!("direction must be 1 or -1, got {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Order type / status
// ---------------------------------------------------------------------------

/// Generic order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    /// Flatten the open position in the instrument.
    Close,
    /// Amend an existing working order.
    Modify,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::Stop => "stop",
            Self::StopLimit => "stop-limit",
            Self::Close => "close",
            Self::Modify => "modify",
        };
        f.write_str(s)
    }
}

/// Generic order status as seen by the strategy layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Open,
    Cancelled,
    Filled,
}

/// Detailed order lifecycle derived from the exchange's status text.
///
/// The generic [`OrderStatus`] collapses this to pending / cancelled; the
/// full state is kept for callers that need to tell fills from rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderLifecycle {
    Submitted,
    Accepted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderLifecycle {
    /// Returns `true` once no further fills can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }
}

// ---------------------------------------------------------------------------
// Instruments
// ---------------------------------------------------------------------------

/// Instrument category from the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstrumentKind {
    /// Cash equity (`EQ`).
    Equity,
    /// Index (`INDEX`).
    Index,
    /// Anything else (`BE`, `SM`, `GS`, ...).
    Other(String),
}

impl InstrumentKind {
    /// Only equities and indices are tradeable through this adapter.
    pub fn is_tradeable(&self) -> bool {
        matches!(self, Self::Equity | Self::Index)
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Equity => "EQ",
            Self::Index => "INDEX",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for InstrumentKind {
    fn from(s: String) -> Self {
        match s.trim() {
            "EQ" => Self::Equity,
            "INDEX" => Self::Index,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<InstrumentKind> for String {
    fn from(k: InstrumentKind) -> String {
        k.code().to_string()
    }
}
