//! Rate source abstraction.

use crate::error::SourceError;
use async_trait::async_trait;
use rates_core::{RateError, RateQuote};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The two USD rates returned by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdRates {
    pub usd_to_rub: Decimal,
    pub usd_to_kzt: Decimal,
}

impl UsdRates {
    pub fn new(usd_to_rub: Decimal, usd_to_kzt: Decimal) -> Self {
        Self {
            usd_to_rub,
            usd_to_kzt,
        }
    }

    /// Derive the full quote, including the RUB→KZT cross rate.
    pub fn to_quote(self) -> Result<RateQuote, RateError> {
        RateQuote::from_usd(self.usd_to_rub, self.usd_to_kzt)
    }
}

/// A remote source of USD exchange rates.
///
/// Implementations perform exactly one request per call and never retry;
/// the rates worker's cadence is the retry policy.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch the current USD→RUB and USD→KZT rates.
    async fn fetch_rates(&self) -> Result<UsdRates, SourceError>;
}

#[async_trait]
impl<T: RateSource + ?Sized> RateSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_rates(&self) -> Result<UsdRates, SourceError> {
        (**self).fetch_rates().await
    }
}
