mod common;

use anyhow::Result;
use rust_decimal::Decimal;
use taxbook::application::{AppError, NewPayment, PaymentUpdate};
use taxbook::domain::{Currency, MonthlySummary, PaymentFilter, Period};

use common::{add, parse_date, summary, test_service};

#[tokio::test]
async fn test_recording_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let three = Decimal::from(3);

    let a = add(&service, "Acme", 10000, Currency::Eur, "2025-01-15", three).await?;
    assert_eq!(a.converted_amount, 30000);

    let b = add(&service, "Beta", 5033, Currency::Eur, "2025-01-20", three).await?;
    // 150.99 rounds up to 151
    assert_eq!(b.converted_amount, 15100);

    let jan = summary(&service, 2025, 1).await?.unwrap();
    assert_eq!(jan.total_income, 45100);
    assert_eq!(jan.payment_count, 2);
    assert_eq!(jan.cumulative_income, 45100);

    let c = add(&service, "Local", 20000, Currency::Gel, "2025-02-01", Decimal::ONE).await?;
    assert_eq!(c.converted_amount, 20000);
    assert_eq!(c.exchange_rate, Decimal::ONE);

    let feb = summary(&service, 2025, 2).await?.unwrap();
    assert_eq!(feb.total_income, 20000);
    assert_eq!(feb.payment_count, 1);
    assert_eq!(feb.cumulative_income, 65100);

    service.delete_payment(a.id).await?;

    let jan = summary(&service, 2025, 1).await?.unwrap();
    assert_eq!(jan.total_income, 15100);
    assert_eq!(jan.payment_count, 1);
    assert_eq!(jan.cumulative_income, 15100);
    let feb = summary(&service, 2025, 2).await?.unwrap();
    assert_eq!(feb.cumulative_income, 35100);

    Ok(())
}

#[tokio::test]
async fn test_rate_is_looked_up_when_not_given() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let payment = service
        .add_payment(NewPayment {
            company: "Globex".into(),
            amount: 10050,
            currency: Currency::Usd,
            date: parse_date("2025-03-10"),
            exchange_rate: None,
        })
        .await?;

    assert_eq!(payment.exchange_rate, Decimal::new(28, 1));
    // 100.50 * 2.8 = 281.40, rounded up
    assert_eq!(payment.converted_amount, 28200);
    Ok(())
}

#[tokio::test]
async fn test_home_currency_ignores_given_rate() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let payment =
        add(&service, "Local", 12345, Currency::Gel, "2025-01-05", Decimal::from(7)).await?;
    assert_eq!(payment.exchange_rate, Decimal::ONE);
    assert_eq!(payment.converted_amount, 12345);
    Ok(())
}

#[tokio::test]
async fn test_invalid_payments_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let empty = add(&service, "   ", 1000, Currency::Eur, "2025-01-01", Decimal::from(3)).await;
    assert!(matches!(
        empty.unwrap_err().downcast::<AppError>()?,
        AppError::InvalidCompany(_)
    ));

    let zero = add(&service, "Acme", 0, Currency::Eur, "2025-01-01", Decimal::from(3)).await;
    assert!(matches!(
        zero.unwrap_err().downcast::<AppError>()?,
        AppError::InvalidAmount(_)
    ));

    let rate = add(&service, "Acme", 1000, Currency::Eur, "2025-01-01", Decimal::ZERO).await;
    assert!(matches!(
        rate.unwrap_err().downcast::<AppError>()?,
        AppError::InvalidRate(_)
    ));

    let byn = add(&service, "Acme", 1000, Currency::Byn, "2025-01-01", Decimal::ONE).await;
    assert!(matches!(
        byn.unwrap_err().downcast::<AppError>()?,
        AppError::UnsupportedCurrency(Currency::Byn)
    ));

    // Nothing reached the store
    assert!(service.summaries(None).await?.is_empty());
    assert!(service.list_payments(&PaymentFilter::default()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_record_then_delete_restores_summaries() -> Result<()> {
    let (service, _temp) = test_service().await?;
    add(&service, "Acme", 10000, Currency::Eur, "2025-01-15", Decimal::from(3)).await?;
    add(&service, "Local", 5000, Currency::Gel, "2025-03-01", Decimal::ONE).await?;

    let before = service.summaries(None).await?;

    // Into an existing month
    let p = add(&service, "Beta", 777, Currency::Usd, "2025-01-31", Decimal::new(28, 1)).await?;
    service.delete_payment(p.id).await?;
    let after = service.summaries(None).await?;
    let shape = |summaries: &[MonthlySummary]| {
        summaries
            .iter()
            .map(|s| (s.period(), s.total_income, s.cumulative_income, s.payment_count))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&before), shape(&after));

    // Into a new month: the summary goes away again
    let q = add(&service, "Gamma", 1000, Currency::Gel, "2025-02-10", Decimal::ONE).await?;
    assert!(summary(&service, 2025, 2).await?.is_some());
    assert_eq!(summary(&service, 2025, 3).await?.unwrap().cumulative_income, 36000);
    service.delete_payment(q.id).await?;
    assert!(summary(&service, 2025, 2).await?.is_none());
    assert_eq!(summary(&service, 2025, 3).await?.unwrap().cumulative_income, 35000);

    Ok(())
}

#[tokio::test]
async fn test_delete_unknown_payment() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let err = service.delete_payment(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::PaymentNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_edit_moves_payment_across_years() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let p = add(&service, "Acme", 10000, Currency::Eur, "2024-12-20", Decimal::from(3)).await?;
    add(&service, "Local", 5000, Currency::Gel, "2025-01-10", Decimal::ONE).await?;

    let edited = service
        .update_payment(
            p.id,
            PaymentUpdate {
                date: Some(parse_date("2025-01-05")),
                exchange_rate: Some(Decimal::new(29, 1)),
                ..PaymentUpdate::default()
            },
        )
        .await?;

    assert_eq!(edited.id, p.id);
    assert_eq!(edited.created_at, p.created_at);
    assert_eq!(edited.converted_amount, 29000);

    assert!(summary(&service, 2024, 12).await?.is_none());
    let jan = summary(&service, 2025, 1).await?.unwrap();
    assert_eq!(jan.payment_count, 2);
    assert_eq!(jan.total_income, 34000);
    assert_eq!(jan.cumulative_income, 34000);

    let stored = service.get_payment(p.id).await?;
    assert_eq!(stored.date, parse_date("2025-01-05"));
    assert!(service.check_summaries().await?.is_healthy());
    Ok(())
}

#[tokio::test]
async fn test_edit_keeps_rate_when_currency_and_date_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let p = add(&service, "Acme", 10000, Currency::Eur, "2025-04-01", Decimal::new(295, 2)).await?;

    let edited = service
        .update_payment(
            p.id,
            PaymentUpdate {
                amount: Some(20000),
                company: Some("Acme Corp".into()),
                ..PaymentUpdate::default()
            },
        )
        .await?;

    assert_eq!(edited.exchange_rate, Decimal::new(295, 2));
    assert_eq!(edited.converted_amount, 59000);
    assert_eq!(edited.company, "Acme Corp");
    assert_eq!(summary(&service, 2025, 4).await?.unwrap().total_income, 59000);
    Ok(())
}

#[tokio::test]
async fn test_filters_groups_and_years() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let three = Decimal::from(3);
    add(&service, "Acme GmbH", 10000, Currency::Eur, "2024-11-03", three).await?;
    add(&service, "acme ltd", 20000, Currency::Eur, "2025-01-15", three).await?;
    add(&service, "Globex", 30000, Currency::Gel, "2025-01-20", Decimal::ONE).await?;
    add(&service, "Initech", 40000, Currency::Gel, "2025-02-02", Decimal::ONE).await?;

    assert_eq!(service.available_years().await?, vec![2025, 2024]);

    let acme = service
        .list_payments(&PaymentFilter {
            search: Some("ACME".into()),
            ..PaymentFilter::default()
        })
        .await?;
    assert_eq!(acme.len(), 2);
    // Newest first
    assert_eq!(acme[0].company, "acme ltd");

    let jan = service
        .list_payments(&PaymentFilter {
            year: Some(2025),
            month: Some(1),
            search: None,
        })
        .await?;
    assert_eq!(jan.len(), 2);

    let groups = service.payment_groups(&PaymentFilter::for_year(2025)).await?;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].period, Period::new(2025, 2));
    assert_eq!(groups[1].total_converted, 90000);

    let stats = service.quick_stats(Some(2025)).await?;
    assert_eq!(stats.payment_count, 3);
    assert_eq!(stats.company_count, 3);
    assert_eq!(stats.total_converted, 130000);
    assert_eq!(stats.totals_by_currency.get(&Currency::Eur), Some(&20000));
    assert_eq!(stats.totals_by_currency.get(&Currency::Gel), Some(&70000));

    let all = service.quick_stats(None).await?;
    assert_eq!(all.payment_count, 4);
    Ok(())
}
