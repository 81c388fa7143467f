mod common;

use anyhow::Result;
use rust_decimal::Decimal;
use taxbook::application::{AppError, NewMaintenance};
use taxbook::domain::{Currency, MaintenanceType, ServiceStatus};

use common::{parse_date, test_service};

fn record(
    date: &str,
    mileage: i64,
    kind: MaintenanceType,
    cost: i64,
    currency: Currency,
) -> NewMaintenance {
    NewMaintenance {
        date: parse_date(date),
        mileage,
        maintenance_type: kind,
        cost,
        currency,
        notes: None,
        next_service_mileage: None,
        next_service_date: None,
    }
}

#[tokio::test]
async fn test_add_list_delete() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let first = service
        .add_maintenance(NewMaintenance {
            notes: Some("5W-30".into()),
            next_service_mileage: Some(60000),
            ..record("2025-01-10", 50000, MaintenanceType::OilChange, 15000, Currency::Gel)
        })
        .await?;
    service
        .add_maintenance(record("2025-03-01", 52000, MaintenanceType::Tires, 40000, Currency::Gel))
        .await?;

    let records = service.list_maintenance().await?;
    assert_eq!(records.len(), 2);
    // Most recent first
    assert_eq!(records[0].maintenance_type, MaintenanceType::Tires);
    assert_eq!(records[1].notes.as_deref(), Some("5W-30"));
    assert_eq!(records[1].next_service_mileage, Some(60000));

    service.delete_maintenance(first.id).await?;
    assert_eq!(service.list_maintenance().await?.len(), 1);
    assert!(matches!(
        service.delete_maintenance(first.id).await,
        Err(AppError::MaintenanceRecordNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_invalid_mileage() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let negative = service
        .add_maintenance(record("2025-01-10", -1, MaintenanceType::Other, 0, Currency::Gel))
        .await;
    assert!(matches!(negative, Err(AppError::InvalidMileage(_))));

    let backwards = service
        .add_maintenance(NewMaintenance {
            next_service_mileage: Some(40000),
            ..record("2025-01-10", 50000, MaintenanceType::OilChange, 100, Currency::Gel)
        })
        .await;
    assert!(matches!(backwards, Err(AppError::InvalidMileage(_))));
    Ok(())
}

#[tokio::test]
async fn test_upcoming_services() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .add_maintenance(NewMaintenance {
            next_service_mileage: Some(60000),
            ..record("2025-01-10", 50000, MaintenanceType::OilChange, 15000, Currency::Gel)
        })
        .await?;
    service
        .add_maintenance(NewMaintenance {
            next_service_date: Some(parse_date("2025-06-10")),
            ..record("2024-06-10", 45000, MaintenanceType::Inspection, 5000, Currency::Gel)
        })
        .await?;
    service
        .add_maintenance(record("2025-02-01", 51000, MaintenanceType::Brakes, 30000, Currency::Gel))
        .await?;

    let upcoming = service
        .upcoming_services(Some(59500), parse_date("2025-06-20"))
        .await?;
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[0].record.maintenance_type, MaintenanceType::OilChange);
    assert_eq!(upcoming[0].status, ServiceStatus::DueSoon);
    assert_eq!(upcoming[1].status, ServiceStatus::Overdue);

    // Falls back to the last recorded mileage (51000)
    let upcoming = service
        .upcoming_services(None, parse_date("2025-01-01"))
        .await?;
    assert_eq!(upcoming[0].status, ServiceStatus::Ok);
    Ok(())
}

#[tokio::test]
async fn test_stats_use_estimate_rates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .add_maintenance(record(
            "2025-01-10",
            50000,
            MaintenanceType::OilChange,
            10000,
            Currency::Gel,
        ))
        .await?;
    service
        .add_maintenance(record("2025-01-20", 50500, MaintenanceType::Tires, 10000, Currency::Eur))
        .await?;
    service
        .add_maintenance(record("2024-05-01", 40000, MaintenanceType::Brakes, 10000, Currency::Usd))
        .await?;

    let stats = service.maintenance_stats(Some(2025)).await?;
    assert_eq!(stats.record_count, 3);
    // 100 + 100 * 3.0 + 100 * 2.8
    assert_eq!(stats.total_cost, Decimal::from(680));
    assert_eq!(stats.year_cost, Decimal::from(400));
    assert_eq!(stats.cost_by_type.get(&MaintenanceType::Tires), Some(&Decimal::from(300)));
    assert_eq!(stats.cost_by_month.get(&1), Some(&Decimal::from(400)));
    assert_eq!(stats.available_years, vec![2025, 2024]);
    assert_eq!(stats.last_mileage, Some(50500));
    Ok(())
}
