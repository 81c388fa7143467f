use anyhow::{Context, Result, anyhow};
use sqlx::Row;

use super::repository::{format_date, parse_date, parse_id, parse_timestamp};
use super::Repository;
use crate::domain::{Currency, MaintenanceId, MaintenanceRecord, MaintenanceType};

const MAINTENANCE_COLUMNS: &str =
    "id, date, mileage, maintenance_type, cost_cents, currency, notes, next_service_mileage, next_service_date, created_at";

impl Repository {
    pub async fn insert_maintenance(&self, record: &MaintenanceRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO maintenance_records (id, date, mileage, maintenance_type, cost_cents, currency, notes, next_service_mileage, next_service_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(format_date(record.date))
        .bind(record.mileage)
        .bind(record.maintenance_type.as_str())
        .bind(record.cost)
        .bind(record.currency.as_str())
        .bind(&record.notes)
        .bind(record.next_service_mileage)
        .bind(record.next_service_date.map(format_date))
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert maintenance record")?;
        Ok(())
    }

    pub async fn get_maintenance(&self, id: MaintenanceId) -> Result<Option<MaintenanceRecord>> {
        let query = format!("SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch maintenance record")?;

        row.as_ref().map(Self::row_to_maintenance).transpose()
    }

    /// All maintenance records, most recent first.
    pub async fn list_maintenance(&self) -> Result<Vec<MaintenanceRecord>> {
        let query = format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records ORDER BY date DESC, mileage DESC"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list maintenance records")?;

        rows.iter().map(Self::row_to_maintenance).collect()
    }

    pub async fn delete_maintenance(&self, id: MaintenanceId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM maintenance_records WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete maintenance record")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_maintenance(row: &sqlx::sqlite::SqliteRow) -> Result<MaintenanceRecord> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("date");
        let type_str: String = row.get("maintenance_type");
        let currency_str: String = row.get("currency");
        let next_date_str: Option<String> = row.get("next_service_date");
        let created_str: String = row.get("created_at");

        Ok(MaintenanceRecord {
            id: parse_id(&id_str).context("Invalid maintenance ID")?,
            date: parse_date(&date_str)?,
            mileage: row.get("mileage"),
            maintenance_type: MaintenanceType::from_str(&type_str)
                .ok_or_else(|| anyhow!("Invalid maintenance type: {}", type_str))?,
            cost: row.get("cost_cents"),
            currency: Currency::from_str(&currency_str)
                .ok_or_else(|| anyhow!("Invalid currency: {}", currency_str))?,
            notes: row.get("notes"),
            next_service_mileage: row.get("next_service_mileage"),
            next_service_date: next_date_str.as_deref().map(parse_date).transpose()?,
            created_at: parse_timestamp(&created_str)?,
        })
    }
}
