//! Rates Bot - Headless Server
//!
//! Polls USD→RUB and USD→KZT every hour, stores each observation, and alerts
//! Telegram subscribers when a rate moves past the configured threshold.

mod config;
mod worker;

use clap::Parser;
use config::{AppConfig, BotSettings, SourceSettings, WorkerSettings};
use rates_alerts::{Database, TelegramBot};
use rates_feeds::{OpenExchangeRatesClient, DEFAULT_ENDPOINT};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use worker::{RatesWorker, WorkerConfig};

/// Rates Bot CLI
#[derive(Parser, Debug)]
#[command(name = "rates-bot")]
#[command(about = "Hourly exchange rate alerts over Telegram", long_about = None)]
struct Args {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://rates.sqlite3")]
    database_url: String,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// Telegram user id allowed to broadcast with /send
    #[arg(long, env = "OWNER_ID")]
    owner_id: Option<u64>,

    /// Open Exchange Rates application id
    #[arg(long, env = "OXR_APP_ID", hide_env_values = true)]
    app_id: String,

    /// Latest-rates endpoint
    #[arg(long, env = "OXR_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    rates_endpoint: String,

    /// Relative change that triggers an alert (0.05 = 5%)
    #[arg(short = 't', long, env = "ALERT_THRESHOLD", default_value = "0.05")]
    alert_threshold: Decimal,

    /// Seconds to wait for the rates worker on shutdown
    #[arg(long, default_value_t = 5)]
    shutdown_grace_secs: u64,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn build_config(args: Args) -> AppConfig {
    AppConfig {
        database_url: args.database_url,
        worker: WorkerSettings {
            alert_threshold: args.alert_threshold,
        },
        source: SourceSettings {
            endpoint: args.rates_endpoint,
            app_id: args.app_id,
            ..Default::default()
        },
        bot: BotSettings {
            token: args.bot_token,
            owner_id: args.owner_id,
        },
        shutdown_grace_secs: args.shutdown_grace_secs,
        log_level: args.log_level,
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    let config = build_config(args);
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("🚀 Rates Bot starting...");
    info!("  Database: {}", config.database_url);
    info!("  Rates endpoint: {}", config.source.endpoint);
    info!("  Alert threshold: {}", config.worker.alert_threshold);
    match config.bot.owner_id {
        Some(owner) => info!("  Owner: {}", owner),
        None => warn!("  Owner: not set, /send is disabled"),
    }

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    match db.subscriber_count().await {
        Ok(count) => info!("  Subscribers: {}", count),
        Err(e) => warn!("Failed to count subscribers: {}", e),
    }
    match db.observation_count().await {
        Ok(count) => info!("  Stored observations: {}", count),
        Err(e) => warn!("Failed to count observations: {}", e),
    }

    let source = match OpenExchangeRatesClient::with_timeout(
        &config.source.endpoint,
        config.source.app_id.clone(),
        Duration::from_secs(config.source.timeout_secs),
    ) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to create rates client: {}", e);
            std::process::exit(1);
        }
    };

    let bot = Arc::new(TelegramBot::new(
        &config.bot.token,
        db.clone(),
        config.bot.owner_id,
    ));

    // Spawn the rates worker; it shares the bot's HTTP client for alerts
    let ctx = CancellationToken::new();
    let rates_worker = RatesWorker::new(
        source,
        db.clone(),
        bot.bot().clone(),
        WorkerConfig::from(&config.worker),
    );
    let worker_handle = tokio::spawn(rates_worker.run(ctx.clone()));

    // The dispatcher returns on Ctrl+C
    info!("Press Ctrl+C to stop...");
    Arc::clone(&bot).run().await;

    warn!("Shutdown signal received");
    ctx.cancel();

    // Wait for the worker with timeout, then abort
    let abort_handle = worker_handle.abort_handle();
    let grace = Duration::from_secs(config.shutdown_grace_secs);
    match tokio::time::timeout(grace, worker_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Rates worker ended abnormally: {}", e),
        Err(_) => {
            warn!(
                "Rates worker did not stop within {}s, aborting",
                grace.as_secs()
            );
            abort_handle.abort();
        }
    }

    db.close().await;
    drop(bot);

    info!("👋 Rates Bot stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "rates-bot",
            "--bot-token",
            "123:abc",
            "--app-id",
            "app",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_build_config_from_args() {
        let config = build_config(parse(&[
            "--owner-id",
            "42",
            "--alert-threshold",
            "0.1",
            "--database-url",
            "sqlite::memory:",
        ]));

        assert_eq!(config.worker.alert_threshold, dec!(0.1));
        assert_eq!(config.bot.owner_id, Some(42));
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.source.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold_is_rejected_by_parser() {
        let argv = [
            "rates-bot",
            "--bot-token",
            "t",
            "--app-id",
            "a",
            "--alert-threshold",
            "five",
        ];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_defaults_build_rates_client() {
        let config = build_config(parse(&[]));
        assert_eq!(config.source.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.shutdown_grace_secs, 5);
        assert!(OpenExchangeRatesClient::new(
            &config.source.endpoint,
            config.source.app_id.clone()
        )
        .is_ok());
    }
}
