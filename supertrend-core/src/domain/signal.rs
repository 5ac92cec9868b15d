//! Trend direction and discrete trading signals.

use serde::{Deserialize, Serialize};

/// Directional regime of the Supertrend indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }
}

/// Entry/exit signal emitted on a trend flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    None,
}

impl Signal {
    /// Position delta: Buy = +1, Sell = -1, None = 0.
    pub fn value(self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
            Self::None => 0,
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}
