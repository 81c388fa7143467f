use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::Currency;

/// Money is stored as integer cents of its own currency, so ₾50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a human-readable amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Format a decimal amount with two fraction digits, e.g. a derived tax amount.
pub fn format_decimal(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Parse a decimal string into cents. Digits past the second decimal place are dropped.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let value = Decimal::from_str(input.trim()).map_err(|_| ParseCentsError::InvalidFormat)?;
    decimal_to_cents(value.round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .ok_or(ParseCentsError::OutOfRange)
}

/// Parse an exchange rate such as "2.9732". Rates must be strictly positive.
pub fn parse_rate(input: &str) -> Result<Decimal, ParseCentsError> {
    let rate = Decimal::from_str(input.trim()).map_err(|_| ParseCentsError::InvalidFormat)?;
    if rate <= Decimal::ZERO {
        return Err(ParseCentsError::OutOfRange);
    }
    Ok(rate.normalize())
}

/// View cents as a decimal amount of whole units.
pub fn cents_to_decimal(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

/// Convert a decimal amount of units into cents, if it has at most two fraction digits
/// worth of precision and fits.
pub fn decimal_to_cents(value: Decimal) -> Option<Cents> {
    value.checked_mul(Decimal::from(100))?.trunc().to_i64()
}

/// Convert an amount into the home currency.
///
/// Home-currency amounts pass through untouched. Foreign amounts are multiplied by the rate
/// and rounded *up* to a whole home-currency unit. The ceiling is taken per payment, so a sum
/// of converted amounts can exceed the ceiling of the summed raw products.
///
/// Returns `None` on overflow.
pub fn convert_to_home(
    amount: Cents,
    currency: Currency,
    home_currency: Currency,
    rate: Decimal,
) -> Option<Cents> {
    if currency == home_currency {
        return Some(amount);
    }
    let units = cents_to_decimal(amount).checked_mul(rate)?;
    decimal_to_cents(units.ceil())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}
