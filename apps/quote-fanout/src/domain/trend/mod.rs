//! Trend Indicator
//!
//! Direction of a price relative to the previous observation of the same
//! instrument. Only used for logs and metrics; never drives persistence.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price direction between two consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// No previous observation in this process lifetime.
    Unknown,
    /// Current price is above the previous one.
    Up,
    /// Current price is below the previous one.
    Down,
    /// Unchanged.
    Flat,
}

impl Direction {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `current` against `previous`.
#[must_use]
pub fn trend(previous: Option<Decimal>, current: Decimal) -> Direction {
    let Some(previous) = previous else {
        return Direction::Unknown;
    };
    match current.cmp(&previous) {
        Ordering::Greater => Direction::Up,
        Ordering::Less => Direction::Down,
        Ordering::Equal => Direction::Flat,
    }
}
