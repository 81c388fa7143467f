//! Exchange rate sources.
//!
//! A [`RateProvider`] answers "how many home-currency units is one unit of this currency worth
//! on this day". Conversion happens before a payment reaches the ledger aggregator, so rate
//! lookups never touch stored summaries.

mod fixed;
mod nbg;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::Currency;

pub use fixed::FixedRateProvider;
pub use nbg::{NBG_BASE_URL, NbgRateProvider, parse_day_rates};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("Network error while fetching exchange rates: {0}")]
    Network(String),

    #[error("Invalid exchange rate response: {0}")]
    InvalidResponse(String),

    #[error("Currency not found in exchange rate response: {0}")]
    CurrencyNotFound(Currency),
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// The currency every rate is quoted in.
    fn home_currency(&self) -> Currency;

    /// Rate of `currency` on `date`. The home currency is always 1.
    async fn fetch_rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError>;

    /// Latest known rate for every supported currency, home currency included at 1.
    async fn fetch_latest_rates(&self) -> Result<BTreeMap<Currency, Decimal>, RateError>;
}
