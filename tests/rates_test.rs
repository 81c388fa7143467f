mod common;

use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;
use taxbook::application::{AppError, NewPayment};
use taxbook::domain::{Currency, PaymentFilter};
use taxbook::rates::{FixedRateProvider, RateError};

use common::{parse_date, test_service};

#[tokio::test]
async fn test_fetch_rate_and_home_currency() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let date = parse_date("2025-01-15");

    assert_eq!(service.fetch_rate(Currency::Eur, date).await?, Decimal::from(3));
    assert_eq!(service.fetch_rate(Currency::Gel, date).await?, Decimal::ONE);
    Ok(())
}

#[tokio::test]
async fn test_latest_rates_are_stored_as_history() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let rates = service.fetch_latest_rates().await?;
    assert_eq!(rates.get(&Currency::Eur), Some(&Decimal::from(3)));
    assert_eq!(rates.get(&Currency::Gel), Some(&Decimal::ONE));

    let history = service.rate_history(None, 10).await?;
    // The home currency is not stored
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.currency != Currency::Gel));

    let eur = service.rate_history(Some(Currency::Eur), 10).await?;
    assert_eq!(eur.len(), 1);
    assert_eq!(eur[0].rate, Decimal::from(3));
    Ok(())
}

#[tokio::test]
async fn test_rates_on_a_date() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let date = parse_date("2025-02-03");
    let provider = FixedRateProvider::new(Currency::Gel).with_rate_on(
        Currency::Eur,
        date,
        Decimal::new(2975, 3),
    );
    let service = service.with_rate_provider(Arc::new(provider));

    let rates = service.fetch_rates_on(date).await?;
    // USD is not quoted and is skipped
    assert_eq!(rates.len(), 1);
    assert_eq!(rates.get(&Currency::Eur), Some(&Decimal::new(2975, 3)));

    let history = service.rate_history(Some(Currency::Eur), 5).await?;
    assert_eq!(history[0].date, date);
    Ok(())
}

#[tokio::test]
async fn test_missing_rate_blocks_payment() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = service.with_rate_provider(Arc::new(FixedRateProvider::new(Currency::Gel)));

    let result = service
        .add_payment(NewPayment {
            company: "Acme".into(),
            amount: 10000,
            currency: Currency::Usd,
            date: parse_date("2025-01-15"),
            exchange_rate: None,
        })
        .await;

    assert!(matches!(
        result,
        Err(AppError::RateUnavailable(RateError::CurrencyNotFound(Currency::Usd)))
    ));
    assert!(service.list_payments(&PaymentFilter::default()).await?.is_empty());
    assert!(service.summaries(None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_convert_at_latest_rate() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // 100.33 USD * 2.8 = 280.924, shown to cents rather than ceiled to a whole lari
    let usd = service.convert_at_latest(10033, Currency::Usd).await?;
    assert_eq!(usd.rate, Decimal::new(28, 1));
    assert_eq!(usd.converted, Decimal::new(28092, 2));
    assert_eq!(usd.home_currency, Currency::Gel);

    let eur = service.convert_at_latest(2550, Currency::Eur).await?;
    assert_eq!(eur.converted, Decimal::new(7650, 2));

    let gel = service.convert_at_latest(1000, Currency::Gel).await?;
    assert_eq!(gel.rate, Decimal::ONE);
    assert_eq!(gel.converted, Decimal::new(1000, 2));

    // Nothing is recorded as income
    assert!(service.list_payments(&PaymentFilter::default()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_convert_at_latest_rejects_bad_input() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(matches!(
        service.convert_at_latest(0, Currency::Eur).await,
        Err(AppError::InvalidAmount(_))
    ));
    assert!(matches!(
        service.convert_at_latest(1000, Currency::Byn).await,
        Err(AppError::UnsupportedCurrency(Currency::Byn))
    ));

    let service = service.with_rate_provider(Arc::new(
        FixedRateProvider::new(Currency::Gel).with_rate(Currency::Eur, Decimal::from(3)),
    ));
    assert!(matches!(
        service.convert_at_latest(1000, Currency::Usd).await,
        Err(AppError::RateUnavailable(RateError::CurrencyNotFound(Currency::Usd)))
    ));
    Ok(())
}
