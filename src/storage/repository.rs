use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{MIGRATION_001_INITIAL, MIGRATION_002_DEBTS, MIGRATION_003_MAINTENANCE};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for persisting and querying payments, summaries, rates, debts and
/// maintenance records.
///
/// Functions that take a `&mut SqliteConnection` are meant to run inside a transaction opened
/// with [`Repository::begin`]; the `&self` variants run on a pooled connection.
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Every migration is idempotent and they all apply in one
    /// transaction.
    pub async fn migrate(&self) -> Result<()> {
        let mut tx = self.begin().await?;
        for (name, sql) in [
            ("001", MIGRATION_001_INITIAL),
            ("002", MIGRATION_002_DEBTS),
            ("003", MIGRATION_003_MAINTENANCE),
        ] {
            debug!("Running migration {name}");
            (&mut *tx)
                .execute(sql)
                .await
                .with_context(|| format!("Failed to run migration {name}"))?;
        }
        tx.commit()
            .await
            .context("Failed to commit migrations")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Start a transaction. Dropping it without `commit` rolls everything back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }

    pub(super) async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .context("Failed to acquire database connection")
    }
}

pub(super) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(super) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{}'", value))
}

pub(super) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp '{}'", value))?
        .with_timezone(&Utc))
}

pub(super) fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid ID '{}'", value))
}

/// First day of `year` and first day of the next year, as stored date strings.
pub(super) fn year_bounds(year: i32) -> Result<(String, String)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .with_context(|| format!("Year out of range: {}", year))?;
    let end = year
        .checked_add(1)
        .and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1))
        .with_context(|| format!("Year out of range: {}", year))?;
    Ok((format_date(start), format_date(end)))
}
