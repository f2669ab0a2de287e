//! Bot command handling, independent of the Telegram transport.

use crate::db::Database;
use crate::notifier::{broadcast, MessageSender};
use rates_core::RateObservation;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Text of the reply keyboard button that triggers a refresh.
pub const REFRESH_BUTTON: &str = "Refresh";

const STORAGE_FAILURE_REPLY: &str = "Something went wrong, try again later.";

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Subscribe to exchange rate alerts")]
    Start,
    #[command(description = "Show the latest stored rates")]
    Refresh,
    #[command(description = "Send a message to all subscribers (owner only). Usage: /send <text>")]
    Send(String),
    #[command(description = "Show help")]
    Help,
}

/// A reply to send back to the chat that issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Attach the reply keyboard with the refresh button
    pub with_keyboard: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            with_keyboard: false,
        }
    }

    fn with_keyboard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            with_keyboard: true,
        }
    }
}

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub chat_id: i64,
    /// Telegram user id, absent for channel posts
    pub user_id: Option<u64>,
}

/// Command logic over the store and a message sender.
pub struct CommandHandler<M> {
    db: Database,
    sender: M,
    owner_id: Option<u64>,
}

impl<M: MessageSender> CommandHandler<M> {
    pub fn new(db: Database, sender: M, owner_id: Option<u64>) -> Self {
        Self {
            db,
            sender,
            owner_id,
        }
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    #[cfg(test)]
    pub(crate) fn sender(&self) -> &M {
        &self.sender
    }

    fn is_owner(&self, caller: Caller) -> bool {
        matches!((self.owner_id, caller.user_id), (Some(owner), Some(user)) if owner == user)
    }

    /// Execute a command and build the reply.
    ///
    /// Storage failures are logged and turned into a generic reply.
    pub async fn handle(&self, caller: Caller, cmd: Command) -> Reply {
        let result = match cmd {
            Command::Start => self.start(caller).await,
            Command::Refresh => self.refresh().await,
            Command::Send(text) => self.send(caller, &text).await,
            Command::Help => Ok(Reply::text(Command::descriptions().to_string())),
        };

        result.unwrap_or_else(|e| {
            error!(chat_id = caller.chat_id, error = %e, "Command failed");
            Reply::text(STORAGE_FAILURE_REPLY)
        })
    }

    async fn start(&self, caller: Caller) -> Result<Reply, crate::db::DbError> {
        let added = self.db.register_subscriber(caller.chat_id).await?;
        if added {
            info!(chat_id = caller.chat_id, "Subscriber registered");
            Ok(Reply::with_keyboard(
                "You are subscribed and will receive exchange rate alerts.",
            ))
        } else {
            Ok(Reply::with_keyboard("You are already subscribed."))
        }
    }

    async fn refresh(&self) -> Result<Reply, crate::db::DbError> {
        let text = match self.db.last_observation().await? {
            Some(observation) => format_observation(&observation),
            None => "No data yet.".to_string(),
        };
        Ok(Reply::text(text))
    }

    async fn send(&self, caller: Caller, text: &str) -> Result<Reply, crate::db::DbError> {
        if !self.is_owner(caller) {
            warn!(chat_id = caller.chat_id, user_id = ?caller.user_id, "Rejected /send from non-owner");
            return Ok(Reply::text("Not allowed."));
        }

        let text = text.trim();
        if text.is_empty() {
            return Ok(Reply::text("Usage: /send <text>\nExample: /send Hello everyone"));
        }

        let ids = self.db.all_subscriber_ids().await?;
        let report = broadcast(&self.sender, &ids, text).await;
        Ok(Reply::text(format!(
            "Sent {} of {}",
            report.delivered, report.attempted
        )))
    }
}

/// Format an observation for the refresh reply.
pub fn format_observation(observation: &RateObservation) -> String {
    format!(
        "USD→RUB: {}\nUSD→KZT: {}\nRUB→KZT: {}\nTime (UTC): {}",
        observation.usd_to_rub,
        observation.usd_to_kzt,
        observation.rub_to_kzt,
        observation.observed_at.format("%Y-%m-%d %H:%M:%S")
    )
}
