use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Currency, cents_to_decimal};

pub type MaintenanceId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    OilChange,
    Inspection,
    Tires,
    Brakes,
    Filters,
    Other,
}

impl MaintenanceType {
    pub const ALL: [MaintenanceType; 6] = [
        MaintenanceType::OilChange,
        MaintenanceType::Inspection,
        MaintenanceType::Tires,
        MaintenanceType::Brakes,
        MaintenanceType::Filters,
        MaintenanceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceType::OilChange => "oil_change",
            MaintenanceType::Inspection => "inspection",
            MaintenanceType::Tires => "tires",
            MaintenanceType::Brakes => "brakes",
            MaintenanceType::Filters => "filters",
            MaintenanceType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "oil_change" | "oil" => Some(MaintenanceType::OilChange),
            "inspection" => Some(MaintenanceType::Inspection),
            "tires" | "tyres" => Some(MaintenanceType::Tires),
            "brakes" => Some(MaintenanceType::Brakes),
            "filters" => Some(MaintenanceType::Filters),
            "other" => Some(MaintenanceType::Other),
            _ => None,
        }
    }
}

impl fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MaintenanceType::OilChange => "Oil Change",
            MaintenanceType::Inspection => "Inspection",
            MaintenanceType::Tires => "Tires",
            MaintenanceType::Brakes => "Brakes",
            MaintenanceType::Filters => "Filters",
            MaintenanceType::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// A service performed on the vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: MaintenanceId,
    pub date: NaiveDate,
    /// Odometer reading in km
    pub mileage: i64,
    pub maintenance_type: MaintenanceType,
    pub cost: Cents,
    pub currency: Currency,
    pub notes: Option<String>,
    pub next_service_mileage: Option<i64>,
    pub next_service_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceRecord {
    pub fn new(
        date: NaiveDate,
        mileage: i64,
        maintenance_type: MaintenanceType,
        cost: Cents,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            mileage,
            maintenance_type,
            cost,
            currency,
            notes: None,
            next_service_mileage: None,
            next_service_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_next_service_mileage(mut self, mileage: i64) -> Self {
        self.next_service_mileage = Some(mileage);
        self
    }

    pub fn with_next_service_date(mut self, date: NaiveDate) -> Self {
        self.next_service_date = Some(date);
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_service_mileage.is_some() || self.next_service_date.is_some()
    }

    /// How urgent the next service is. Mileage is only considered when the current reading
    /// is known; a mileage verdict of overdue or due soon wins over the date.
    pub fn service_status(
        &self,
        current_mileage: Option<i64>,
        today: NaiveDate,
        thresholds: &ServiceThresholds,
    ) -> ServiceStatus {
        if !self.is_scheduled() {
            return ServiceStatus::Unscheduled;
        }

        if let (Some(next), Some(current)) = (self.next_service_mileage, current_mileage) {
            let remaining = next - current;
            if remaining < 0 {
                return ServiceStatus::Overdue;
            } else if remaining < thresholds.due_soon_km {
                return ServiceStatus::DueSoon;
            }
        }

        if let Some(next_date) = self.next_service_date {
            let days_until = (next_date - today).num_days();
            if days_until < 0 {
                return ServiceStatus::Overdue;
            } else if days_until < thresholds.due_soon_days {
                return ServiceStatus::DueSoon;
            }
        }

        ServiceStatus::Ok
    }
}

/// Distances at which an upcoming service is flagged as due soon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceThresholds {
    pub due_soon_km: i64,
    pub due_soon_days: i64,
}

impl Default for ServiceThresholds {
    fn default() -> Self {
        Self {
            due_soon_km: 1000,
            due_soon_days: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Overdue,
    DueSoon,
    Ok,
    /// No next mileage or date recorded
    Unscheduled,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceStatus::Overdue => "OVERDUE",
            ServiceStatus::DueSoon => "due soon",
            ServiceStatus::Ok => "ok",
            ServiceStatus::Unscheduled => "-",
        };
        write!(f, "{}", label)
    }
}

/// Records with a next service planned, nearest mileage first. Records without a next
/// mileage go after those with one.
pub fn upcoming_services(records: &[MaintenanceRecord]) -> Vec<&MaintenanceRecord> {
    let mut upcoming: Vec<&MaintenanceRecord> =
        records.iter().filter(|r| r.is_scheduled()).collect();
    upcoming.sort_by_key(|r| {
        (
            r.next_service_mileage.is_none(),
            r.next_service_mileage,
            r.next_service_date,
        )
    });
    upcoming
}

/// Converts maintenance costs into the home currency with fixed estimate rates. Costs are
/// statistics only, so no live rates are fetched.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    pub home_currency: Currency,
    pub rates: BTreeMap<Currency, Decimal>,
}

impl CostEstimator {
    /// Home-currency estimate of a record's cost, in units. Currencies without an estimate
    /// count at face value.
    pub fn cost_in_home(&self, record: &MaintenanceRecord) -> Decimal {
        let cost = cents_to_decimal(record.cost);
        if record.currency == self.home_currency {
            return cost;
        }
        match self.rates.get(&record.currency) {
            Some(rate) => cost * *rate,
            None => cost,
        }
    }
}

/// Maintenance spending figures in home-currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceStats {
    pub total_cost: Decimal,
    pub record_count: usize,
    pub year: i32,
    pub year_cost: Decimal,
    pub cost_by_type: BTreeMap<MaintenanceType, Decimal>,
    /// Month number (1-12) to cost
    pub cost_by_month: BTreeMap<u32, Decimal>,
    pub available_years: Vec<i32>,
    pub last_mileage: Option<i64>,
}

impl MaintenanceStats {
    pub fn compute(records: &[MaintenanceRecord], year: i32, estimator: &CostEstimator) -> Self {
        let mut stats = MaintenanceStats {
            total_cost: Decimal::ZERO,
            record_count: records.len(),
            year,
            year_cost: Decimal::ZERO,
            cost_by_type: BTreeMap::new(),
            cost_by_month: BTreeMap::new(),
            available_years: Vec::new(),
            last_mileage: None,
        };

        let mut years = BTreeSet::new();
        for record in records {
            let cost = estimator.cost_in_home(record);
            stats.total_cost += cost;
            years.insert(record.date.year());

            if record.date.year() == year {
                stats.year_cost += cost;
                *stats
                    .cost_by_type
                    .entry(record.maintenance_type)
                    .or_insert(Decimal::ZERO) += cost;
                *stats
                    .cost_by_month
                    .entry(record.date.month())
                    .or_insert(Decimal::ZERO) += cost;
            }
        }

        stats.available_years = years.into_iter().rev().collect();
        stats.last_mileage = records
            .iter()
            .max_by_key(|r| (r.date, r.mileage))
            .map(|r| r.mileage);
        stats
    }
}
