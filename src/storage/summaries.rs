use anyhow::{Context, Result};
use sqlx::{Row, SqliteConnection};

use super::repository::{parse_id, parse_timestamp};
use super::Repository;
use crate::domain::{MonthlySummary, Period};

const SUMMARY_COLUMNS: &str =
    "id, year, month, total_income_cents, cumulative_income_cents, payment_count, last_updated";

impl Repository {
    /// Summary for a single month, if any payment has been recorded in it.
    pub async fn get_summary(
        conn: &mut SqliteConnection,
        period: Period,
    ) -> Result<Option<MonthlySummary>> {
        let query =
            format!("SELECT {SUMMARY_COLUMNS} FROM monthly_summaries WHERE year = ? AND month = ?");
        let row = sqlx::query(&query)
            .bind(period.year)
            .bind(period.month)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to fetch monthly summary")?;

        row.as_ref().map(Self::row_to_summary).transpose()
    }

    pub async fn insert_summary(
        conn: &mut SqliteConnection,
        summary: &MonthlySummary,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO monthly_summaries (id, year, month, total_income_cents, cumulative_income_cents, payment_count, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(summary.id.to_string())
        .bind(summary.year)
        .bind(summary.month)
        .bind(summary.total_income)
        .bind(summary.cumulative_income)
        .bind(summary.payment_count)
        .bind(summary.last_updated.to_rfc3339())
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to insert summary for {}", summary.period()))?;
        Ok(())
    }

    pub async fn update_summary(
        conn: &mut SqliteConnection,
        summary: &MonthlySummary,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE monthly_summaries
            SET total_income_cents = ?, cumulative_income_cents = ?, payment_count = ?, last_updated = ?
            WHERE id = ?
            "#,
        )
        .bind(summary.total_income)
        .bind(summary.cumulative_income)
        .bind(summary.payment_count)
        .bind(summary.last_updated.to_rfc3339())
        .bind(summary.id.to_string())
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to update summary for {}", summary.period()))?;
        Ok(())
    }

    pub async fn delete_summary(
        conn: &mut SqliteConnection,
        summary: &MonthlySummary,
    ) -> Result<()> {
        sqlx::query("DELETE FROM monthly_summaries WHERE id = ?")
            .bind(summary.id.to_string())
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to delete summary for {}", summary.period()))?;
        Ok(())
    }

    /// Remove every summary. Used before rebuilding them from payments.
    pub async fn delete_all_summaries(conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM monthly_summaries")
            .execute(&mut *conn)
            .await
            .context("Failed to clear monthly summaries")?;
        Ok(result.rows_affected())
    }

    /// Summaries of one year, January first.
    pub async fn summaries_for_year(
        conn: &mut SqliteConnection,
        year: i32,
    ) -> Result<Vec<MonthlySummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM monthly_summaries WHERE year = ? ORDER BY month"
        );
        let rows = sqlx::query(&query)
            .bind(year)
            .fetch_all(&mut *conn)
            .await
            .with_context(|| format!("Failed to list summaries for {}", year))?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    /// Every stored summary on a connection, oldest first.
    pub async fn all_summaries(conn: &mut SqliteConnection) -> Result<Vec<MonthlySummary>> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM monthly_summaries ORDER BY year, month");
        let rows = sqlx::query(&query)
            .fetch_all(&mut *conn)
            .await
            .context("Failed to list monthly summaries")?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    /// Every stored summary, oldest first.
    pub async fn list_summaries(&self) -> Result<Vec<MonthlySummary>> {
        let mut conn = self.acquire().await?;
        Self::all_summaries(&mut conn).await
    }

    pub async fn list_summaries_for_year(&self, year: i32) -> Result<Vec<MonthlySummary>> {
        let mut conn = self.acquire().await?;
        Self::summaries_for_year(&mut conn, year).await
    }

    fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<MonthlySummary> {
        let id_str: String = row.get("id");
        let updated_str: String = row.get("last_updated");

        Ok(MonthlySummary {
            id: parse_id(&id_str).context("Invalid summary ID")?,
            year: row.get("year"),
            month: row.get("month"),
            total_income: row.get("total_income_cents"),
            cumulative_income: row.get("cumulative_income_cents"),
            payment_count: row.get("payment_count"),
            last_updated: parse_timestamp(&updated_str)?,
        })
    }
}
