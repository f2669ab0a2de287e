//! Tracked currency pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency pair tracked by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatePair {
    UsdRub,
    UsdKzt,
    /// Derived from the two USD rates.
    RubKzt,
}

impl RatePair {
    /// All pairs in display order.
    pub const ALL: [RatePair; 3] = [RatePair::UsdRub, RatePair::UsdKzt, RatePair::RubKzt];

    /// Human-readable label used in messages.
    pub fn label(self) -> &'static str {
        match self {
            RatePair::UsdRub => "USD→RUB",
            RatePair::UsdKzt => "USD→KZT",
            RatePair::RubKzt => "RUB→KZT",
        }
    }
}

impl fmt::Display for RatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_labels() {
        assert_eq!(RatePair::UsdRub.to_string(), "USD→RUB");
        assert_eq!(RatePair::UsdKzt.to_string(), "USD→KZT");
        assert_eq!(RatePair::RubKzt.to_string(), "RUB→KZT");
    }
}
