//! Exchange rate quotes and stored observations.

use crate::RatePair;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits kept for the derived RUB→KZT rate.
pub const DERIVED_RATE_SCALE: u32 = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("{pair} rate must be positive, got {value}")]
    NonPositive { pair: RatePair, value: Decimal },
    #[error("{pair} rate overflows: {numerator} / {denominator}")]
    Overflow {
        pair: RatePair,
        numerator: Decimal,
        denominator: Decimal,
    },
}

/// A freshly fetched set of rates, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub usd_to_rub: Decimal,
    pub usd_to_kzt: Decimal,
    pub rub_to_kzt: Decimal,
}

impl RateQuote {
    /// Build a quote from the two USD rates, deriving RUB→KZT.
    ///
    /// The cross rate is `usd_to_kzt / usd_to_rub`, divided exactly and then
    /// rounded half-even to [`DERIVED_RATE_SCALE`] digits. A quotient outside
    /// the `Decimal` range is rejected as [`RateError::Overflow`].
    pub fn from_usd(usd_to_rub: Decimal, usd_to_kzt: Decimal) -> Result<Self, RateError> {
        ensure_positive(RatePair::UsdRub, usd_to_rub)?;
        ensure_positive(RatePair::UsdKzt, usd_to_kzt)?;

        let rub_to_kzt = usd_to_kzt
            .checked_div(usd_to_rub)
            .ok_or(RateError::Overflow {
                pair: RatePair::RubKzt,
                numerator: usd_to_kzt,
                denominator: usd_to_rub,
            })?
            .round_dp(DERIVED_RATE_SCALE);

        Ok(Self {
            usd_to_rub,
            usd_to_kzt,
            rub_to_kzt,
        })
    }

    /// Rate for a single pair.
    pub fn rate(&self, pair: RatePair) -> Decimal {
        match pair {
            RatePair::UsdRub => self.usd_to_rub,
            RatePair::UsdKzt => self.usd_to_kzt,
            RatePair::RubKzt => self.rub_to_kzt,
        }
    }
}

fn ensure_positive(pair: RatePair, value: Decimal) -> Result<(), RateError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(RateError::NonPositive { pair, value })
    }
}

/// A persisted, immutable rate snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateObservation {
    /// Database row ID
    pub id: i64,
    pub usd_to_rub: Decimal,
    pub usd_to_kzt: Decimal,
    pub rub_to_kzt: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl RateObservation {
    /// Rate for a single pair.
    pub fn rate(&self, pair: RatePair) -> Decimal {
        self.quote().rate(pair)
    }

    /// The three rates without row metadata.
    pub fn quote(&self) -> RateQuote {
        RateQuote {
            usd_to_rub: self.usd_to_rub,
            usd_to_kzt: self.usd_to_kzt,
            rub_to_kzt: self.rub_to_kzt,
        }
    }
}
