//! SQLite database for subscribers and rate observations.

use chrono::{DateTime, SubsecRound, Utc};
use rates_core::{RateObservation, RateQuote};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

/// Fixed-width UTC timestamp format, so text ordering matches time ordering.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Corrupt {column} in observation {id}: {reason}")]
    CorruptRow {
        id: i64,
        column: &'static str,
        reason: String,
    },
}

type ObservationRow = (i64, String, String, String, String);

/// Database connection pool.
///
/// Cloning is cheap and every clone shares the pool, so the rates worker and
/// the command handlers can use it concurrently without extra locking.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite database at the given URL and run migrations.
    ///
    /// In-memory databases are pinned to a single connection so every caller
    /// sees the same data.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Rates are stored as decimal text to avoid float rounding
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS observations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                usd_to_rub TEXT NOT NULL,
                usd_to_kzt TEXT NOT NULL,
                rub_to_kzt TEXT NOT NULL,
                observed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_observations_observed_at
            ON observations(observed_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Register a subscriber.
    /// Returns true if newly inserted, false if the id was already registered.
    pub async fn register_subscriber(&self, chat_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query(
            "INSERT INTO subscribers (chat_id) VALUES (?) ON CONFLICT(chat_id) DO NOTHING",
        )
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get every registered subscriber id, in no particular order.
    pub async fn all_subscriber_ids(&self) -> Result<Vec<i64>, DbError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT chat_id FROM subscribers")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn subscriber_count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Append an observation stamped with the current time.
    pub async fn record_observation(&self, quote: &RateQuote) -> Result<RateObservation, DbError> {
        self.record_observation_at(quote, Utc::now()).await
    }

    /// Append an observation with an explicit timestamp.
    pub async fn record_observation_at(
        &self,
        quote: &RateQuote,
        observed_at: DateTime<Utc>,
    ) -> Result<RateObservation, DbError> {
        // Stored with microsecond precision
        let observed_at = observed_at.trunc_subsecs(6);

        let result = sqlx::query(
            r#"
            INSERT INTO observations (usd_to_rub, usd_to_kzt, rub_to_kzt, observed_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(quote.usd_to_rub.to_string())
        .bind(quote.usd_to_kzt.to_string())
        .bind(quote.rub_to_kzt.to_string())
        .bind(observed_at.format(TIMESTAMP_FORMAT).to_string())
        .execute(&self.pool)
        .await?;

        Ok(RateObservation {
            id: result.last_insert_rowid(),
            usd_to_rub: quote.usd_to_rub,
            usd_to_kzt: quote.usd_to_kzt,
            rub_to_kzt: quote.rub_to_kzt,
            observed_at,
        })
    }

    /// Get the most recent observation, or None if nothing was recorded yet.
    pub async fn last_observation(&self) -> Result<Option<RateObservation>, DbError> {
        let row = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, usd_to_rub, usd_to_kzt, rub_to_kzt, observed_at
            FROM observations
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(observation_from_row).transpose()
    }

    pub async fn observation_count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM observations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn observation_from_row(row: ObservationRow) -> Result<RateObservation, DbError> {
    let (id, usd_to_rub, usd_to_kzt, rub_to_kzt, observed_at) = row;

    let decimal = |column: &'static str, text: &str| {
        Decimal::from_str(text).map_err(|e| DbError::CorruptRow {
            id,
            column,
            reason: e.to_string(),
        })
    };

    let observed_at = DateTime::parse_from_rfc3339(&observed_at)
        .map_err(|e| DbError::CorruptRow {
            id,
            column: "observed_at",
            reason: e.to_string(),
        })?
        .with_timezone(&Utc);

    Ok(RateObservation {
        id,
        usd_to_rub: decimal("usd_to_rub", &usd_to_rub)?,
        usd_to_kzt: decimal("usd_to_kzt", &usd_to_kzt)?,
        rub_to_kzt: decimal("rub_to_kzt", &rub_to_kzt)?,
        observed_at,
    })
}
