//! Open Exchange Rates client.
//!
//! Fetches `latest.json` (USD base) and extracts the RUB and KZT rates.
//! Rates are parsed straight from the JSON number text into `Decimal`, so no
//! binary floating point is involved.

use crate::error::SourceError;
use crate::source::{RateSource, UsdRates};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Public endpoint of the latest-rates API.
pub const DEFAULT_ENDPOINT: &str = "https://openexchangerates.org/api/latest.json";

/// Request timeout for a single fetch.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Max number of body characters kept in an HTTP status error.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: LatestRates,
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(rename = "RUB", with = "rust_decimal::serde::arbitrary_precision")]
    rub: Decimal,
    #[serde(rename = "KZT", with = "rust_decimal::serde::arbitrary_precision")]
    kzt: Decimal,
}

/// Parse a `latest.json` body into USD rates.
pub fn parse_latest(body: &str) -> Result<UsdRates, SourceError> {
    let response: LatestResponse = serde_json::from_str(body)?;
    Ok(UsdRates::new(response.rates.rub, response.rates.kzt))
}

/// HTTP client for the Open Exchange Rates API.
pub struct OpenExchangeRatesClient {
    http: reqwest::Client,
    endpoint: Url,
    app_id: String,
}

impl std::fmt::Debug for OpenExchangeRatesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenExchangeRatesClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("app_id", &"<redacted>")
            .finish()
    }
}

impl OpenExchangeRatesClient {
    /// Create a client with the default 30 second timeout.
    pub fn new(endpoint: &str, app_id: impl Into<String>) -> Result<Self, SourceError> {
        Self::with_timeout(endpoint, app_id, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(
        endpoint: &str,
        app_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let endpoint = Url::parse(endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SourceError::InvalidEndpoint(format!(
                "unsupported scheme: {}",
                endpoint.scheme()
            )));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint,
            app_id: app_id.into(),
        })
    }

    /// Endpoint with the `app_id` query parameter applied.
    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("app_id", &self.app_id);
        url
    }
}

#[async_trait]
impl RateSource for OpenExchangeRatesClient {
    fn name(&self) -> &str {
        "openexchangerates"
    }

    async fn fetch_rates(&self) -> Result<UsdRates, SourceError> {
        debug!(endpoint = %self.endpoint, "Fetching latest rates");

        let response = self.http.get(self.request_url()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        parse_latest(&body)
    }
}
