//! Telegram bot transport.

use crate::commands::{Caller, Command, CommandHandler, REFRESH_BUTTON};
use crate::db::Database;
use crate::notifier::{DeliveryError, MessageSender};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

#[async_trait]
impl MessageSender for Bot {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}

/// Reply keyboard with the single refresh button.
fn refresh_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(REFRESH_BUTTON)]]).resize_keyboard()
}

fn caller_of(msg: &Message) -> Caller {
    Caller {
        chat_id: msg.chat.id.0,
        user_id: msg.from.as_ref().map(|user| user.id.0),
    }
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    handler: CommandHandler<Bot>,
}

impl TelegramBot {
    /// Create a new bot with the given token.
    pub fn new(token: &str, db: Database, owner_id: Option<u64>) -> Self {
        let bot = Bot::new(token);
        let handler = CommandHandler::new(db, bot.clone(), owner_id);
        Self { bot, handler }
    }

    /// Get the underlying bot for sending messages.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Run the command dispatcher until Ctrl+C.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();

        let commands = {
            let this = Arc::clone(&self);
            Update::filter_message().filter_command::<Command>().endpoint(
                move |bot: Bot, msg: Message, cmd: Command| {
                    let this = Arc::clone(&this);
                    async move { this.respond(bot, msg, cmd).await }
                },
            )
        };

        let refresh_button = {
            let this = Arc::clone(&self);
            Update::filter_message()
                .filter(|msg: Message| msg.text() == Some(REFRESH_BUTTON))
                .endpoint(move |bot: Bot, msg: Message| {
                    let this = Arc::clone(&this);
                    async move { this.respond(bot, msg, Command::Refresh).await }
                })
        };

        let handler = dptree::entry().branch(commands).branch(refresh_button);

        info!("Telegram dispatcher started");
        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
        info!("Telegram dispatcher stopped");
    }

    async fn respond(&self, bot: Bot, msg: Message, cmd: Command) -> Result<(), TelegramError> {
        let reply = self.handler.handle(caller_of(&msg), cmd).await;

        let request = bot.send_message(msg.chat.id, reply.text);
        if reply.with_keyboard {
            request.reply_markup(refresh_keyboard()).await?;
        } else {
            request.await?;
        }
        Ok(())
    }
}
