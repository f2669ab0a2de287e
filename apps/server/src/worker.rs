//! Hourly exchange rate worker.
//!
//! Runs one fetch → detect → alert → record cycle immediately, then one at
//! the top of every hour until cancelled. The previous observation is read
//! from the database each cycle, so nothing carries over in memory and a
//! restart picks up where the last run left off.

use chrono::{DateTime, Timelike, Utc};
use rates_alerts::{broadcast, BroadcastReport, Database, DbError, MessageSender};
use rates_core::{compose_alert, detect_changes, RateChange, RateError, RateObservation};
use rates_feeds::{RateSource, SourceError};
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WorkerSettings;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Rate source unavailable: {0}")]
    Source(#[from] SourceError),
    #[error("Invalid rates: {0}")]
    Rates(#[from] RateError),
    #[error("Storage fault: {0}")]
    Storage(#[from] DbError),
}

impl WorkerError {
    /// True when retrying next hour cannot help, e.g. a rejected app id.
    pub fn needs_operator(&self) -> bool {
        matches!(self, WorkerError::Source(e) if e.is_permanent())
    }
}

/// Configuration for the rates worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Minimum relative change that triggers an alert.
    pub alert_threshold: Decimal,
}

impl From<&WorkerSettings> for WorkerConfig {
    fn from(settings: &WorkerSettings) -> Self {
        Self {
            alert_threshold: settings.alert_threshold,
        }
    }
}

/// Result of one successful cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// The observation recorded by this cycle
    pub observation: RateObservation,
    /// Changes relative to the previous observation
    pub changes: Vec<RateChange>,
    /// Present only when an alert was broadcast
    pub alert: Option<BroadcastReport>,
}

/// Seconds from `now` until the next top of the hour.
pub fn seconds_until_next_hour(now: DateTime<Utc>) -> u64 {
    3600 - (u64::from(now.minute()) * 60 + u64::from(now.second()))
}

/// Background worker driving the fetch-store-alert pipeline.
pub struct RatesWorker<S, M> {
    source: S,
    db: Database,
    sender: M,
    config: WorkerConfig,
}

impl<S: RateSource, M: MessageSender> RatesWorker<S, M> {
    pub fn new(source: S, db: Database, sender: M, config: WorkerConfig) -> Self {
        Self {
            source,
            db,
            sender,
            config,
        }
    }

    /// Run a single cycle.
    ///
    /// Alerting uses the last observation as it was before this cycle; the
    /// new observation is written afterwards whether or not an alert fired.
    pub async fn run_cycle(&self) -> Result<CycleReport, WorkerError> {
        let quote = self.source.fetch_rates().await?.to_quote()?;

        let previous = self.db.last_observation().await?;
        let changes = match &previous {
            Some(previous) => detect_changes(previous, &quote, self.config.alert_threshold),
            None => {
                debug!("No previous observation, skipping change detection");
                Vec::new()
            }
        };

        let alert = match compose_alert(&changes) {
            Some(message) => {
                let chat_ids = self.db.all_subscriber_ids().await?;
                info!(
                    changes = changes.len(),
                    subscribers = chat_ids.len(),
                    "Significant rate change, alerting subscribers"
                );
                Some(broadcast(&self.sender, &chat_ids, &message).await)
            }
            None => None,
        };

        let observation = self.db.record_observation(&quote).await?;

        Ok(CycleReport {
            observation,
            changes,
            alert,
        })
    }

    /// Run until `ctx` is cancelled.
    ///
    /// Consumes the worker: once stopped it cannot be restarted, and the
    /// source's HTTP client is dropped on return.
    pub async fn run(self, ctx: CancellationToken) {
        info!(
            source = self.source.name(),
            threshold = %self.config.alert_threshold,
            "Starting rates worker"
        );

        loop {
            match self.run_cycle().await {
                Ok(report) => {
                    let saved = &report.observation;
                    info!(
                        usd_to_rub = %saved.usd_to_rub,
                        usd_to_kzt = %saved.usd_to_kzt,
                        rub_to_kzt = %saved.rub_to_kzt,
                        alerted = report.alert.is_some(),
                        "Saved rates"
                    );
                }
                Err(e) if e.needs_operator() => {
                    error!(error = %e, "Rate source rejected the request, check configuration");
                }
                Err(WorkerError::Source(e)) => {
                    warn!(error = %e, "Skipping cycle: rate source unavailable");
                }
                Err(e) => {
                    error!(error = %e, "Rates cycle failed");
                }
            }

            let wait = Duration::from_secs(seconds_until_next_hour(Utc::now()));
            debug!(wait_secs = wait.as_secs(), "Waiting for next hour");

            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("Rates worker stopped");
    }
}
