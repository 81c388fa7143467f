use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Currency;

pub type ExchangeRateId = Uuid;

/// A rate fetched from the rate provider, kept as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: ExchangeRateId,
    pub currency: Currency,
    /// Home-currency units per one unit of `currency`
    pub rate: Decimal,
    /// The day the rate is valid for
    pub date: NaiveDate,
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(currency: Currency, rate: Decimal, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            currency,
            rate,
            date,
            fetched_at: Utc::now(),
        }
    }
}
