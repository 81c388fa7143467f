use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Currency, Period, convert_to_home};

pub type PaymentId = Uuid;

/// An income payment. The home-currency value is fixed when the payment is created and is
/// never recomputed from a later rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// Who paid
    pub company: String,
    /// Amount in cents of `currency` (always positive)
    pub amount: Cents,
    pub currency: Currency,
    /// The day the money was received
    pub date: NaiveDate,
    /// Rate to the home currency valid at `date`; 1 for the home currency itself
    pub exchange_rate: Decimal,
    /// Amount in home-currency cents
    pub converted_amount: Cents,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Create a payment and derive its converted amount.
    pub fn new(
        company: impl Into<String>,
        amount: Cents,
        currency: Currency,
        date: NaiveDate,
        exchange_rate: Decimal,
        home_currency: Currency,
    ) -> Result<Self, PaymentError> {
        let company = company.into().trim().to_string();
        if company.is_empty() {
            return Err(PaymentError::EmptyCompany);
        }
        if amount <= 0 {
            return Err(PaymentError::NonPositiveAmount(amount));
        }
        if !currency.is_income_currency() {
            return Err(PaymentError::UnsupportedCurrency(currency));
        }

        let exchange_rate = if currency == home_currency {
            Decimal::ONE
        } else if exchange_rate > Decimal::ZERO {
            exchange_rate
        } else {
            return Err(PaymentError::NonPositiveRate(exchange_rate));
        };

        let converted_amount = convert_to_home(amount, currency, home_currency, exchange_rate)
            .ok_or(PaymentError::ConversionOverflow)?;

        Ok(Self {
            id: Uuid::new_v4(),
            company,
            amount,
            currency,
            date,
            exchange_rate,
            converted_amount,
            created_at: Utc::now(),
        })
    }

    /// Keep the identity of an existing payment (used when a payment is edited).
    pub fn with_identity(mut self, id: PaymentId, created_at: DateTime<Utc>) -> Self {
        self.id = id;
        self.created_at = created_at;
        self
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn period(&self) -> Period {
        Period::from_date(self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    EmptyCompany,
    NonPositiveAmount(Cents),
    NonPositiveRate(Decimal),
    UnsupportedCurrency(Currency),
    ConversionOverflow,
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentError::EmptyCompany => write!(f, "company name must not be empty"),
            PaymentError::NonPositiveAmount(amount) => {
                write!(f, "amount must be positive, got {} cents", amount)
            }
            PaymentError::NonPositiveRate(rate) => {
                write!(f, "exchange rate must be positive, got {}", rate)
            }
            PaymentError::UnsupportedCurrency(currency) => {
                write!(f, "payments cannot be recorded in {}", currency)
            }
            PaymentError::ConversionOverflow => write!(f, "converted amount is out of range"),
        }
    }
}

impl std::error::Error for PaymentError {}
