use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

use crate::domain::{Cents, Currency, ExchangeRate, format_cents};
use crate::rates::RateError;

use super::{AppError, LedgerService};

/// An amount converted at the latest rate, for a quick look. Nothing is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickConversion {
    pub amount: Cents,
    pub currency: Currency,
    pub rate: Decimal,
    /// Plain product rounded to 2 decimals, unlike the whole-unit ceiling used for payments.
    pub converted: Decimal,
    pub home_currency: Currency,
}

impl LedgerService {
    // ========================
    // Exchange rate operations
    // ========================

    /// Rate of one currency on a date, straight from the provider. Nothing is stored.
    pub async fn fetch_rate(
        &self,
        currency: Currency,
        date: NaiveDate,
    ) -> Result<Decimal, AppError> {
        if currency == self.config.home_currency {
            return Ok(Decimal::ONE);
        }
        Ok(self.rates.fetch_rate(currency, date).await?)
    }

    /// Latest rates for every supported foreign currency. Fetched rates are kept as history.
    pub async fn fetch_latest_rates(&self) -> Result<BTreeMap<Currency, Decimal>, AppError> {
        let rates = self.rates.fetch_latest_rates().await?;
        let today = Local::now().date_naive();
        self.store_rates(&rates, today).await?;
        Ok(rates)
    }

    /// Rates of every supported foreign currency on a given day. Fetched rates are kept as
    /// history; currencies the provider does not quote are skipped.
    pub async fn fetch_rates_on(
        &self,
        date: NaiveDate,
    ) -> Result<BTreeMap<Currency, Decimal>, AppError> {
        let mut rates = BTreeMap::new();
        for currency in Currency::INCOME {
            if currency == self.config.home_currency {
                continue;
            }
            match self.rates.fetch_rate(currency, date).await {
                Ok(rate) => {
                    rates.insert(currency, rate);
                }
                Err(RateError::CurrencyNotFound(_)) => {
                    debug!("No {} rate quoted for {}", currency, date);
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.store_rates(&rates, date).await?;
        Ok(rates)
    }

    /// Convert an amount to the home currency at the latest rate.
    pub async fn convert_at_latest(
        &self,
        amount: Cents,
        currency: Currency,
    ) -> Result<QuickConversion, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "amount must be positive, got {}",
                format_cents(amount)
            )));
        }
        if !currency.is_income_currency() {
            return Err(AppError::UnsupportedCurrency(currency));
        }

        let home = self.config.home_currency;
        let rate = if currency == home {
            Decimal::ONE
        } else {
            self.fetch_latest_rates()
                .await?
                .get(&currency)
                .copied()
                .ok_or(RateError::CurrencyNotFound(currency))?
        };

        let converted = (Decimal::new(amount, 2) * rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Ok(QuickConversion {
            amount,
            currency,
            rate,
            converted,
            home_currency: home,
        })
    }

    /// Stored rate history, newest first.
    pub async fn rate_history(
        &self,
        currency: Option<Currency>,
        limit: u32,
    ) -> Result<Vec<ExchangeRate>, AppError> {
        Ok(self.repo.list_exchange_rates(currency, limit).await?)
    }

    async fn store_rates(
        &self,
        rates: &BTreeMap<Currency, Decimal>,
        date: NaiveDate,
    ) -> Result<(), AppError> {
        let history: Vec<ExchangeRate> = rates
            .iter()
            .filter(|(currency, _)| **currency != self.config.home_currency)
            .map(|(currency, rate)| ExchangeRate::new(*currency, *rate, date))
            .collect();
        if history.is_empty() {
            return Ok(());
        }
        self.repo.insert_exchange_rates(&history).await?;
        info!("Stored {} exchange rate(s) for {}", history.len(), date);
        Ok(())
    }
}
