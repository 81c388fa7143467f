use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection};

use super::repository::{format_date, parse_date, parse_id, parse_timestamp, year_bounds};
use super::Repository;
use crate::domain::{Currency, Payment, PaymentFilter, PaymentId};

const PAYMENT_COLUMNS: &str =
    "id, company, amount_cents, currency, date, exchange_rate, converted_cents, created_at";

impl Repository {
    /// Insert a new payment.
    pub async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, company, amount_cents, currency, date, exchange_rate, converted_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(&payment.company)
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(format_date(payment.date))
        .bind(payment.exchange_rate.to_string())
        .bind(payment.converted_amount)
        .bind(payment.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to insert payment")?;
        Ok(())
    }

    /// Overwrite every mutable field of a stored payment. Returns false if it does not exist.
    pub async fn update_payment(conn: &mut SqliteConnection, payment: &Payment) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET company = ?, amount_cents = ?, currency = ?, date = ?, exchange_rate = ?, converted_cents = ?
            WHERE id = ?
            "#,
        )
        .bind(&payment.company)
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(format_date(payment.date))
        .bind(payment.exchange_rate.to_string())
        .bind(payment.converted_amount)
        .bind(payment.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update payment")?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a payment. Returns false if it did not exist.
    pub async fn delete_payment(conn: &mut SqliteConnection, id: PaymentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .context("Failed to delete payment")?;
        Ok(result.rows_affected() > 0)
    }

    /// Get a payment by ID.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let mut conn = self.acquire().await?;
        Self::fetch_payment(&mut conn, id).await
    }

    pub async fn fetch_payment(
        conn: &mut SqliteConnection,
        id: PaymentId,
    ) -> Result<Option<Payment>> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to fetch payment")?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }

    /// All payments, oldest first.
    pub async fn list_payments(&self) -> Result<Vec<Payment>> {
        let mut conn = self.acquire().await?;
        Self::all_payments(&mut conn).await
    }

    /// All payments on a connection, oldest first.
    pub async fn all_payments(conn: &mut SqliteConnection) -> Result<Vec<Payment>> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY date, created_at");
        let rows = sqlx::query(&query)
            .fetch_all(&mut *conn)
            .await
            .context("Failed to list payments")?;

        rows.iter().map(Self::row_to_payment).collect()
    }

    /// Payments matching a filter, newest first. Year and month narrow the query in SQL; the
    /// company search is applied by the filter itself.
    pub async fn list_payments_filtered(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let mut query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE 1=1");

        let bounds = filter.year.map(year_bounds).transpose()?;
        let month_str = filter.month.map(|m| format!("{:02}", m));

        if bounds.is_some() {
            query.push_str(" AND date >= ? AND date < ?");
        }
        if month_str.is_some() {
            query.push_str(" AND strftime('%m', date) = ?");
        }
        query.push_str(" ORDER BY date DESC, created_at DESC");

        let mut sql_query = sqlx::query(&query);
        if let Some((start, end)) = &bounds {
            sql_query = sql_query.bind(start).bind(end);
        }
        if let Some(month) = &month_str {
            sql_query = sql_query.bind(month);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list filtered payments")?;

        let payments = rows
            .iter()
            .map(Self::row_to_payment)
            .collect::<Result<Vec<_>>>()?;
        Ok(payments.into_iter().filter(|p| filter.matches(p)).collect())
    }

    /// Distinct years that have payments, newest first.
    pub async fn list_payment_years(&self) -> Result<Vec<i32>> {
        let rows = sqlx::query(
            "SELECT DISTINCT CAST(strftime('%Y', date) AS INTEGER) AS year FROM payments ORDER BY year DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list payment years")?;

        Ok(rows.iter().map(|row| row.get::<i32, _>("year")).collect())
    }

    fn row_to_payment(row: &sqlx::sqlite::SqliteRow) -> Result<Payment> {
        let id_str: String = row.get("id");
        let currency_str: String = row.get("currency");
        let date_str: String = row.get("date");
        let rate_str: String = row.get("exchange_rate");
        let created_at_str: String = row.get("created_at");

        Ok(Payment {
            id: parse_id(&id_str).context("Invalid payment ID")?,
            company: row.get("company"),
            amount: row.get("amount_cents"),
            currency: Currency::from_str(&currency_str)
                .ok_or_else(|| anyhow!("Invalid currency: {}", currency_str))?,
            date: parse_date(&date_str)?,
            exchange_rate: Decimal::from_str(&rate_str)
                .with_context(|| format!("Invalid exchange rate '{}'", rate_str))?,
            converted_amount: row.get("converted_cents"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}
