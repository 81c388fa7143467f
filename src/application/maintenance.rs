use chrono::{Datelike, Local, NaiveDate};
use tracing::info;

use crate::domain::{
    Cents, Currency, MaintenanceId, MaintenanceRecord, MaintenanceStats, MaintenanceType,
    ServiceStatus, upcoming_services,
};

use super::{AppError, LedgerService};

/// Input for a new maintenance record.
#[derive(Debug, Clone)]
pub struct NewMaintenance {
    pub date: NaiveDate,
    pub mileage: i64,
    pub maintenance_type: MaintenanceType,
    pub cost: Cents,
    pub currency: Currency,
    pub notes: Option<String>,
    pub next_service_mileage: Option<i64>,
    pub next_service_date: Option<NaiveDate>,
}

/// An upcoming service and how urgent it is
pub struct UpcomingService {
    pub record: MaintenanceRecord,
    pub status: ServiceStatus,
}

impl LedgerService {
    // ========================
    // Maintenance operations
    // ========================

    /// Log a maintenance record.
    pub async fn add_maintenance(
        &self,
        new: NewMaintenance,
    ) -> Result<MaintenanceRecord, AppError> {
        if new.mileage < 0 {
            return Err(AppError::InvalidMileage(format!(
                "mileage must not be negative, got {}",
                new.mileage
            )));
        }
        if let Some(next) = new.next_service_mileage {
            if next < new.mileage {
                return Err(AppError::InvalidMileage(format!(
                    "next service at {} km is before the current {} km",
                    next, new.mileage
                )));
            }
        }
        if new.cost < 0 {
            return Err(AppError::InvalidAmount(format!(
                "cost must not be negative, got {} cents",
                new.cost
            )));
        }

        let mut record = MaintenanceRecord::new(
            new.date,
            new.mileage,
            new.maintenance_type,
            new.cost,
            new.currency,
        );
        if let Some(notes) = new.notes.filter(|n| !n.trim().is_empty()) {
            record = record.with_notes(notes);
        }
        if let Some(mileage) = new.next_service_mileage {
            record = record.with_next_service_mileage(mileage);
        }
        if let Some(date) = new.next_service_date {
            record = record.with_next_service_date(date);
        }

        self.repo.insert_maintenance(&record).await?;
        info!(
            "Logged {} at {} km on {}",
            record.maintenance_type, record.mileage, record.date
        );
        Ok(record)
    }

    /// All maintenance records, most recent first.
    pub async fn list_maintenance(&self) -> Result<Vec<MaintenanceRecord>, AppError> {
        Ok(self.repo.list_maintenance().await?)
    }

    /// Delete a maintenance record.
    pub async fn delete_maintenance(&self, id: MaintenanceId) -> Result<(), AppError> {
        let record = self
            .repo
            .get_maintenance(id)
            .await?
            .ok_or_else(|| AppError::MaintenanceRecordNotFound(id.to_string()))?;
        self.repo.delete_maintenance(id).await?;
        info!(
            "Deleted {} record from {} ({})",
            record.maintenance_type, record.date, id
        );
        Ok(())
    }

    /// Planned services with their status. Without a current reading, the last recorded
    /// mileage is used.
    pub async fn upcoming_services(
        &self,
        current_mileage: Option<i64>,
        today: NaiveDate,
    ) -> Result<Vec<UpcomingService>, AppError> {
        let records = self.repo.list_maintenance().await?;
        let current = current_mileage.or_else(|| records.iter().map(|r| r.mileage).max());
        let thresholds = self.config.service_thresholds();

        Ok(upcoming_services(&records)
            .into_iter()
            .map(|record| UpcomingService {
                status: record.service_status(current, today, &thresholds),
                record: record.clone(),
            })
            .collect())
    }

    /// Spending statistics for a year, the current year by default.
    pub async fn maintenance_stats(&self, year: Option<i32>) -> Result<MaintenanceStats, AppError> {
        let records = self.repo.list_maintenance().await?;
        let year = year.unwrap_or_else(|| Local::now().year());
        Ok(MaintenanceStats::compute(
            &records,
            year,
            &self.config.cost_estimator(),
        ))
    }
}
