use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use rust_decimal::Decimal;
use sqlx::Row;

use super::repository::{format_date, parse_date, parse_id, parse_timestamp};
use super::Repository;
use crate::domain::{Currency, ExchangeRate};

impl Repository {
    /// Store a batch of fetched rates in one transaction.
    pub async fn insert_exchange_rates(&self, rates: &[ExchangeRate]) -> Result<()> {
        let mut tx = self.begin().await?;
        for rate in rates {
            sqlx::query(
                r#"
                INSERT INTO exchange_rates (id, currency, rate, date, fetched_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(rate.id.to_string())
            .bind(rate.currency.as_str())
            .bind(rate.rate.to_string())
            .bind(format_date(rate.date))
            .bind(rate.fetched_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert exchange rate for {}", rate.currency))?;
        }
        tx.commit()
            .await
            .context("Failed to commit exchange rates")?;
        Ok(())
    }

    /// Stored rates, newest first, optionally for one currency.
    pub async fn list_exchange_rates(
        &self,
        currency: Option<Currency>,
        limit: u32,
    ) -> Result<Vec<ExchangeRate>> {
        let mut query =
            String::from("SELECT id, currency, rate, date, fetched_at FROM exchange_rates");
        if currency.is_some() {
            query.push_str(" WHERE currency = ?");
        }
        query.push_str(" ORDER BY date DESC, fetched_at DESC LIMIT ?");

        let mut sql_query = sqlx::query(&query);
        if let Some(currency) = currency {
            sql_query = sql_query.bind(currency.as_str());
        }

        let rows = sql_query
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list exchange rates")?;

        rows.iter().map(Self::row_to_exchange_rate).collect()
    }

    fn row_to_exchange_rate(row: &sqlx::sqlite::SqliteRow) -> Result<ExchangeRate> {
        let id_str: String = row.get("id");
        let currency_str: String = row.get("currency");
        let rate_str: String = row.get("rate");
        let date_str: String = row.get("date");
        let fetched_str: String = row.get("fetched_at");

        Ok(ExchangeRate {
            id: parse_id(&id_str).context("Invalid exchange rate ID")?,
            currency: Currency::from_str(&currency_str)
                .ok_or_else(|| anyhow!("Invalid currency: {}", currency_str))?,
            rate: Decimal::from_str(&rate_str)
                .with_context(|| format!("Invalid rate '{}'", rate_str))?,
            date: parse_date(&date_str)?,
            fetched_at: parse_timestamp(&fetched_str)?,
        })
    }
}
