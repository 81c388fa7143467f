use thiserror::Error;

use crate::domain::{Cents, Currency, DebtError, PaymentError};
use crate::rates::RateError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),

    #[error("Invalid company: {0}")]
    InvalidCompany(String),

    #[error("Unsupported currency for this operation: {0}")]
    UnsupportedCurrency(Currency),

    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(#[from] RateError),

    #[error("Debt not found: {0}")]
    DebtNotFound(String),

    #[error("Payment of {requested} exceeds the remaining amount {remaining}")]
    DebtPaymentExceedsRemaining { remaining: Cents, requested: Cents },

    #[error("Debt is already paid off")]
    DebtAlreadyPaid,

    #[error("Maintenance record not found: {0}")]
    MaintenanceRecordNotFound(String),

    #[error("Invalid mileage: {0}")]
    InvalidMileage(String),

    #[error("Database error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::EmptyCompany => AppError::InvalidCompany(err.to_string()),
            PaymentError::NonPositiveAmount(_) | PaymentError::ConversionOverflow => {
                AppError::InvalidAmount(err.to_string())
            }
            PaymentError::NonPositiveRate(_) => AppError::InvalidRate(err.to_string()),
            PaymentError::UnsupportedCurrency(currency) => AppError::UnsupportedCurrency(currency),
        }
    }
}

impl From<DebtError> for AppError {
    fn from(err: DebtError) -> Self {
        match err {
            DebtError::EmptyName => AppError::InvalidCompany(err.to_string()),
            DebtError::NonPositiveAmount(_) => AppError::InvalidAmount(err.to_string()),
            DebtError::ExceedsRemaining {
                remaining,
                requested,
            } => AppError::DebtPaymentExceedsRemaining {
                remaining,
                requested,
            },
            DebtError::AlreadyPaid => AppError::DebtAlreadyPaid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_payment_errors_map_to_variants() {
        assert!(matches!(
            AppError::from(PaymentError::EmptyCompany),
            AppError::InvalidCompany(_)
        ));
        assert!(matches!(
            AppError::from(PaymentError::NonPositiveRate(Decimal::ZERO)),
            AppError::InvalidRate(_)
        ));
        assert!(matches!(
            AppError::from(PaymentError::UnsupportedCurrency(Currency::Byn)),
            AppError::UnsupportedCurrency(Currency::Byn)
        ));
    }

    #[test]
    fn test_debt_errors_map_to_variants() {
        assert!(matches!(
            AppError::from(DebtError::ExceedsRemaining {
                remaining: 100,
                requested: 200
            }),
            AppError::DebtPaymentExceedsRemaining {
                remaining: 100,
                requested: 200
            }
        ));
        assert!(matches!(
            AppError::from(DebtError::AlreadyPaid),
            AppError::DebtAlreadyPaid
        ));
    }
}
