use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{RateError, RateProvider};
use crate::domain::Currency;

/// Official rates of the National Bank of Georgia, quoted in GEL.
pub const NBG_BASE_URL: &str = "https://nbg.gov.ge/gw/api/ct/monetarypolicy/currencies";

const USER_AGENT: &str = concat!("taxbook/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NbgDay {
    currencies: Vec<NbgCurrency>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NbgCurrency {
    code: String,
    rate: f64,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Parse an NBG response body into per-unit rates for the currencies this crate knows.
///
/// The body is an array of days; only the first one is used. Rates are quoted per `quantity`
/// units and are divided down to a single unit.
pub fn parse_day_rates(body: &str) -> Result<BTreeMap<Currency, Decimal>, RateError> {
    let days: Vec<NbgDay> =
        serde_json::from_str(body).map_err(|e| RateError::InvalidResponse(e.to_string()))?;

    let mut rates = BTreeMap::new();
    let Some(day) = days.into_iter().next() else {
        return Ok(rates);
    };

    for entry in day.currencies {
        let Some(currency) = Currency::from_str(&entry.code) else {
            continue;
        };
        // f64 Display is the shortest string that round-trips, so "2.9732" stays exact.
        let rate = Decimal::from_str(&entry.rate.to_string())
            .map_err(|e| RateError::InvalidResponse(format!("rate for {}: {}", entry.code, e)))?;
        if rate <= Decimal::ZERO || entry.quantity == 0 {
            return Err(RateError::InvalidResponse(format!(
                "non-positive rate for {}",
                entry.code
            )));
        }
        rates.insert(currency, rate / Decimal::from(entry.quantity));
    }
    Ok(rates)
}

/// HTTP client for the NBG currencies endpoint.
#[derive(Debug, Clone)]
pub struct NbgRateProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NbgRateProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RateError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, url: &str) -> Result<String, RateError> {
        debug!("Fetching exchange rates from {url}");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RateError::Network(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(RateError::Network(format!("unexpected status {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| RateError::Network(e.to_string()))
    }
}

#[async_trait]
impl RateProvider for NbgRateProvider {
    fn home_currency(&self) -> Currency {
        Currency::Gel
    }

    async fn fetch_rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError> {
        if currency == Currency::Gel {
            return Ok(Decimal::ONE);
        }

        let url = format!("{}/ka/json/?date={}", self.base_url, date.format("%Y-%m-%d"));
        let body = self.get(&url).await?;
        parse_day_rates(&body)?
            .remove(&currency)
            .ok_or(RateError::CurrencyNotFound(currency))
    }

    async fn fetch_latest_rates(&self) -> Result<BTreeMap<Currency, Decimal>, RateError> {
        let url = format!("{}/ka/json", self.base_url);
        let body = self.get(&url).await?;
        let mut rates = parse_day_rates(&body)?;
        rates.insert(Currency::Gel, Decimal::ONE);
        Ok(rates)
    }
}
