//! Fan-out delivery to subscribers.
//!
//! A single failed recipient never aborts the broadcast: every id is tried
//! and the outcome of each attempt is folded into a [`BroadcastReport`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("Delivery failed: {0}")]
    Other(String),
}

/// Capability to send a plain text message to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        (**self).send_text(chat_id, text).await
    }
}

/// Outcome of delivering one message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub chat_id: i64,
    pub outcome: Result<(), String>,
}

/// Aggregated result of a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of recipients attempted
    pub attempted: usize,
    /// Number of successful deliveries
    pub delivered: usize,
    /// Failed deliveries with the reason
    pub failures: Vec<Delivery>,
}

impl BroadcastReport {
    fn record(&mut self, delivery: Delivery) {
        self.attempted += 1;
        match delivery.outcome {
            Ok(()) => self.delivered += 1,
            Err(_) => self.failures.push(delivery),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Send `text` to every chat in `chat_ids`.
///
/// Delivery failures are logged and counted, never returned as errors.
pub async fn broadcast<M>(sender: &M, chat_ids: &[i64], text: &str) -> BroadcastReport
where
    M: MessageSender + ?Sized,
{
    let mut report = BroadcastReport::default();

    for &chat_id in chat_ids {
        let outcome = match sender.send_text(chat_id, text).await {
            Ok(()) => {
                debug!(chat_id = chat_id, "Message delivered");
                Ok(())
            }
            Err(e) => {
                warn!(chat_id = chat_id, error = %e, "Failed to deliver message");
                Err(e.to_string())
            }
        };
        report.record(Delivery { chat_id, outcome });
    }

    info!(
        attempted = report.attempted,
        delivered = report.delivered,
        failed = report.failed(),
        "Broadcast finished"
    );

    report
}
