//! Subscriber alerts for exchange rate movements.
//!
//! This crate provides:
//! - SQLite-based observation and subscriber storage
//! - Fan-out delivery to all subscribers, tolerating per-recipient failures
//! - Telegram bot command handlers

pub mod commands;
pub mod db;
pub mod notifier;
pub mod telegram;

pub use commands::{Caller, Command, CommandHandler, Reply, REFRESH_BUTTON};
pub use db::{Database, DbError};
pub use notifier::{broadcast, BroadcastReport, DeliveryError, MessageSender};
pub use telegram::{TelegramBot, TelegramError};
