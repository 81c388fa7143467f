// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use taxbook::application::{LedgerService, NewPayment};
use taxbook::config::Config;
use taxbook::domain::{Cents, Currency, MonthlySummary, Payment, Period};
use taxbook::rates::FixedRateProvider;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database and fixed rates
/// (EUR 3.0, USD 2.8, home GEL)
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap(), Config::default())
        .await?
        .with_rate_provider(Arc::new(fixed_rates()));
    Ok((service, temp_dir))
}

pub fn fixed_rates() -> FixedRateProvider {
    FixedRateProvider::new(Currency::Gel)
        .with_rate(Currency::Eur, Decimal::from(3))
        .with_rate(Currency::Usd, Decimal::new(28, 1))
}

/// Helper to parse a date string (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Record a payment at an explicit rate
pub async fn add(
    service: &LedgerService,
    company: &str,
    amount: Cents,
    currency: Currency,
    date: &str,
    rate: Decimal,
) -> Result<Payment> {
    Ok(service
        .add_payment(NewPayment {
            company: company.to_string(),
            amount,
            currency,
            date: parse_date(date),
            exchange_rate: Some(rate),
        })
        .await?)
}

/// The stored summary of a month, if any
pub async fn summary(
    service: &LedgerService,
    year: i32,
    month: u32,
) -> Result<Option<MonthlySummary>> {
    Ok(service
        .summaries(Some(year))
        .await?
        .into_iter()
        .find(|s| s.period() == Period::new(year, month)))
}
