use anyhow::{Context, Result, anyhow};
use sqlx::{Row, SqliteConnection};

use super::repository::{format_date, parse_date, parse_id, parse_timestamp};
use super::Repository;
use crate::domain::{Currency, Debt, DebtId, DebtPayment, DebtStatus, DebtType};

const DEBT_COLUMNS: &str =
    "id, person_name, original_cents, remaining_cents, currency, debt_type, status, created_at, due_date, notes, last_updated";

impl Repository {
    pub async fn insert_debt(&self, debt: &Debt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO debts (id, person_name, original_cents, remaining_cents, currency, debt_type, status, created_at, due_date, notes, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(debt.id.to_string())
        .bind(&debt.person_name)
        .bind(debt.original_amount)
        .bind(debt.remaining_amount)
        .bind(debt.currency.as_str())
        .bind(debt.debt_type.as_str())
        .bind(debt.status.as_str())
        .bind(debt.created_at.to_rfc3339())
        .bind(debt.due_date.map(format_date))
        .bind(&debt.notes)
        .bind(debt.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert debt")?;
        Ok(())
    }

    /// Persist the balance and status of a debt after a repayment.
    pub async fn update_debt_balance(conn: &mut SqliteConnection, debt: &Debt) -> Result<()> {
        sqlx::query(
            "UPDATE debts SET remaining_cents = ?, status = ?, last_updated = ? WHERE id = ?",
        )
        .bind(debt.remaining_amount)
        .bind(debt.status.as_str())
        .bind(debt.last_updated.to_rfc3339())
        .bind(debt.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update debt")?;
        Ok(())
    }

    pub async fn get_debt(&self, id: DebtId) -> Result<Option<Debt>> {
        let mut conn = self.acquire().await?;
        Self::fetch_debt(&mut conn, id).await
    }

    pub async fn fetch_debt(conn: &mut SqliteConnection, id: DebtId) -> Result<Option<Debt>> {
        let query = format!("SELECT {DEBT_COLUMNS} FROM debts WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to fetch debt")?;

        row.as_ref().map(Self::row_to_debt).transpose()
    }

    /// All debts, newest first.
    pub async fn list_debts(&self) -> Result<Vec<Debt>> {
        let query = format!("SELECT {DEBT_COLUMNS} FROM debts ORDER BY created_at DESC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list debts")?;

        rows.iter().map(Self::row_to_debt).collect()
    }

    /// Delete a debt together with its repayments. Returns false if it did not exist.
    pub async fn delete_debt(&self, id: DebtId) -> Result<bool> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM debt_payments WHERE debt_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete debt payments")?;

        let result = sqlx::query("DELETE FROM debts WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete debt")?;

        tx.commit().await.context("Failed to commit debt deletion")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_debt_payment(
        conn: &mut SqliteConnection,
        payment: &DebtPayment,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO debt_payments (id, debt_id, amount_cents, date, notes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(payment.id.to_string())
        .bind(payment.debt_id.to_string())
        .bind(payment.amount)
        .bind(format_date(payment.date))
        .bind(&payment.notes)
        .execute(&mut *conn)
        .await
        .context("Failed to insert debt payment")?;
        Ok(())
    }

    /// Repayments of one debt, oldest first.
    pub async fn list_debt_payments(&self, debt_id: DebtId) -> Result<Vec<DebtPayment>> {
        let rows = sqlx::query(
            "SELECT id, debt_id, amount_cents, date, notes FROM debt_payments WHERE debt_id = ? ORDER BY date, rowid",
        )
        .bind(debt_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list debt payments")?;

        rows.iter()
            .map(|row| {
                let id_str: String = row.get("id");
                let debt_id_str: String = row.get("debt_id");
                let date_str: String = row.get("date");
                Ok(DebtPayment {
                    id: parse_id(&id_str)?,
                    debt_id: parse_id(&debt_id_str)?,
                    amount: row.get("amount_cents"),
                    date: parse_date(&date_str)?,
                    notes: row.get("notes"),
                })
            })
            .collect()
    }

    fn row_to_debt(row: &sqlx::sqlite::SqliteRow) -> Result<Debt> {
        let id_str: String = row.get("id");
        let currency_str: String = row.get("currency");
        let type_str: String = row.get("debt_type");
        let status_str: String = row.get("status");
        let created_str: String = row.get("created_at");
        let due_str: Option<String> = row.get("due_date");
        let updated_str: String = row.get("last_updated");

        Ok(Debt {
            id: parse_id(&id_str).context("Invalid debt ID")?,
            person_name: row.get("person_name"),
            original_amount: row.get("original_cents"),
            remaining_amount: row.get("remaining_cents"),
            currency: Currency::from_str(&currency_str)
                .ok_or_else(|| anyhow!("Invalid currency: {}", currency_str))?,
            debt_type: DebtType::from_str(&type_str)
                .ok_or_else(|| anyhow!("Invalid debt type: {}", type_str))?,
            status: DebtStatus::from_str(&status_str)
                .ok_or_else(|| anyhow!("Invalid debt status: {}", status_str))?,
            created_at: parse_timestamp(&created_str)?,
            due_date: due_str.as_deref().map(parse_date).transpose()?,
            notes: row.get("notes"),
            last_updated: parse_timestamp(&updated_str)?,
        })
    }
}
