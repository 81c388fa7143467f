mod common;

use anyhow::Result;
use taxbook::application::{AppError, NewDebt};
use taxbook::domain::{Currency, DebtFilter, DebtStatus, DebtType};

use common::{parse_date, test_service};

fn new_debt(person: &str, amount: i64, currency: Currency, debt_type: DebtType) -> NewDebt {
    NewDebt {
        person_name: person.to_string(),
        amount,
        currency,
        debt_type,
        due_date: None,
        notes: None,
    }
}

#[tokio::test]
async fn test_debt_lifecycle() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let debt = service
        .create_debt(NewDebt {
            due_date: Some(parse_date("2025-06-30")),
            notes: Some("car repair".into()),
            ..new_debt("Nino", 50000, Currency::Gel, DebtType::OwesMe)
        })
        .await?;
    assert_eq!(debt.status, DebtStatus::Pending);
    assert_eq!(debt.remaining_amount, 50000);

    let debt = service
        .record_debt_payment(debt.id, 20000, parse_date("2025-05-01"), Some("first".into()))
        .await?;
    assert_eq!(debt.status, DebtStatus::PartiallyPaid);
    assert_eq!(debt.remaining_amount, 30000);

    let debt = service
        .record_debt_payment(debt.id, 30000, parse_date("2025-05-15"), None)
        .await?;
    assert_eq!(debt.status, DebtStatus::Paid);
    assert_eq!(debt.remaining_amount, 0);
    assert!(!debt.is_past_due(parse_date("2025-07-01")));

    let details = service.debt_details(debt.id).await?;
    assert_eq!(details.debt.status, DebtStatus::Paid);
    assert_eq!(details.debt.notes.as_deref(), Some("car repair"));
    assert_eq!(details.payments.len(), 2);
    assert_eq!(details.payments[0].amount, 20000);
    assert_eq!(details.payments[0].notes.as_deref(), Some("first"));

    let again = service
        .record_debt_payment(debt.id, 100, parse_date("2025-05-20"), None)
        .await;
    assert!(matches!(again, Err(AppError::DebtAlreadyPaid)));
    Ok(())
}

#[tokio::test]
async fn test_overpayment_is_rejected_atomically() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let debt = service
        .create_debt(new_debt("Giorgi", 10000, Currency::Usd, DebtType::IOwe))
        .await?;

    let result = service
        .record_debt_payment(debt.id, 10001, parse_date("2025-05-01"), None)
        .await;
    assert!(matches!(
        result,
        Err(AppError::DebtPaymentExceedsRemaining {
            remaining: 10000,
            requested: 10001
        })
    ));

    let details = service.debt_details(debt.id).await?;
    assert_eq!(details.debt.remaining_amount, 10000);
    assert!(details.payments.is_empty());

    let result = service
        .record_debt_payment(debt.id, 0, parse_date("2025-05-01"), None)
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    Ok(())
}

#[tokio::test]
async fn test_list_filter_search_and_totals() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let paid = service
        .create_debt(new_debt("Anna", 1000, Currency::Eur, DebtType::IOwe))
        .await?;
    service
        .record_debt_payment(paid.id, 1000, parse_date("2025-01-01"), None)
        .await?;
    service
        .create_debt(new_debt("Anna Maria", 2000, Currency::Eur, DebtType::IOwe))
        .await?;
    service
        .create_debt(new_debt("Boris", 3000, Currency::Byn, DebtType::OwesMe))
        .await?;
    service
        .create_debt(new_debt("Boris", 4000, Currency::Byn, DebtType::OwesMe))
        .await?;

    assert_eq!(service.list_debts(DebtFilter::All, None).await?.len(), 4);
    assert_eq!(service.list_debts(DebtFilter::IOwe, None).await?.len(), 2);
    assert_eq!(service.list_debts(DebtFilter::Active, None).await?.len(), 3);
    assert_eq!(service.list_debts(DebtFilter::Paid, None).await?.len(), 1);
    assert_eq!(service.list_debts(DebtFilter::All, Some("anna")).await?.len(), 2);
    assert_eq!(
        service.list_debts(DebtFilter::Active, Some("ANNA")).await?.len(),
        1
    );

    let totals = service.debt_totals().await?;
    assert_eq!(totals.i_owe.get(&Currency::Eur), Some(&2000));
    assert_eq!(totals.owes_me.get(&Currency::Byn), Some(&7000));
    assert!(totals.owes_me.get(&Currency::Eur).is_none());
    Ok(())
}

#[tokio::test]
async fn test_delete_debt_removes_payments() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let debt = service
        .create_debt(new_debt("Levan", 5000, Currency::Gel, DebtType::IOwe))
        .await?;
    service
        .record_debt_payment(debt.id, 1000, parse_date("2025-02-01"), None)
        .await?;

    service.delete_debt(debt.id).await?;

    assert!(matches!(
        service.get_debt(debt.id).await,
        Err(AppError::DebtNotFound(_))
    ));
    assert!(service.repository().list_debt_payments(debt.id).await?.is_empty());
    assert!(matches!(
        service.delete_debt(debt.id).await,
        Err(AppError::DebtNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_empty_name_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let result = service
        .create_debt(new_debt("  ", 5000, Currency::Gel, DebtType::IOwe))
        .await;
    assert!(result.is_err());
    assert!(service.list_debts(DebtFilter::All, None).await?.is_empty());
    Ok(())
}
