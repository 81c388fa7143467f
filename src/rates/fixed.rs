use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{RateError, RateProvider};
use crate::domain::Currency;

/// Serves rates from an in-memory table. Rates can be pinned to a date or apply to any date.
#[derive(Debug, Clone)]
pub struct FixedRateProvider {
    home_currency: Currency,
    default_rates: BTreeMap<Currency, Decimal>,
    dated_rates: BTreeMap<(Currency, NaiveDate), Decimal>,
}

impl FixedRateProvider {
    pub fn new(home_currency: Currency) -> Self {
        Self {
            home_currency,
            default_rates: BTreeMap::new(),
            dated_rates: BTreeMap::new(),
        }
    }

    /// Rate used for any date without a dated entry.
    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.default_rates.insert(currency, rate);
        self
    }

    pub fn with_rate_on(mut self, currency: Currency, date: NaiveDate, rate: Decimal) -> Self {
        self.dated_rates.insert((currency, date), rate);
        self
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    fn home_currency(&self) -> Currency {
        self.home_currency
    }

    async fn fetch_rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError> {
        if currency == self.home_currency {
            return Ok(Decimal::ONE);
        }
        self.dated_rates
            .get(&(currency, date))
            .or_else(|| self.default_rates.get(&currency))
            .copied()
            .ok_or(RateError::CurrencyNotFound(currency))
    }

    async fn fetch_latest_rates(&self) -> Result<BTreeMap<Currency, Decimal>, RateError> {
        let mut rates = self.default_rates.clone();
        rates.insert(self.home_currency, Decimal::ONE);
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_dated_rate_wins_over_default() {
        let provider = FixedRateProvider::new(Currency::Gel)
            .with_rate(Currency::Eur, Decimal::from(3))
            .with_rate_on(Currency::Eur, date("2025-01-15"), Decimal::new(29, 1));

        let dated = provider.fetch_rate(Currency::Eur, date("2025-01-15")).await;
        let other = provider.fetch_rate(Currency::Eur, date("2025-01-16")).await;
        assert_eq!(dated, Ok(Decimal::new(29, 1)));
        assert_eq!(other, Ok(Decimal::from(3)));
    }

    #[tokio::test]
    async fn test_home_currency_and_missing_rates() {
        let provider = FixedRateProvider::new(Currency::Gel);
        let d = date("2025-01-01");

        assert_eq!(provider.fetch_rate(Currency::Gel, d).await, Ok(Decimal::ONE));
        assert_eq!(
            provider.fetch_rate(Currency::Usd, d).await,
            Err(RateError::CurrencyNotFound(Currency::Usd))
        );
        let latest = provider.fetch_latest_rates().await.unwrap();
        assert_eq!(latest.get(&Currency::Gel), Some(&Decimal::ONE));
    }
}
