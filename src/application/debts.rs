use std::collections::BTreeMap;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::info;

use crate::domain::{
    Cents, Currency, Debt, DebtFilter, DebtId, DebtPayment, DebtType, outstanding_totals,
};
use crate::storage::Repository;

use super::{AppError, LedgerService};

/// Input for a new debt.
#[derive(Debug, Clone)]
pub struct NewDebt {
    pub person_name: String,
    pub amount: Cents,
    pub currency: Currency,
    pub debt_type: DebtType,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A debt with its repayment history
pub struct DebtDetails {
    pub debt: Debt,
    pub payments: Vec<DebtPayment>,
}

/// What is still open, per currency, in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebtTotals {
    pub i_owe: BTreeMap<Currency, Cents>,
    pub owes_me: BTreeMap<Currency, Cents>,
}

impl LedgerService {
    // ========================
    // Debt operations
    // ========================

    /// Create a new debt.
    pub async fn create_debt(&self, new: NewDebt) -> Result<Debt, AppError> {
        let mut debt = Debt::new(new.person_name, new.amount, new.currency, new.debt_type)?;
        if let Some(due_date) = new.due_date {
            debt = debt.with_due_date(due_date);
        }
        if let Some(notes) = new.notes.filter(|n| !n.trim().is_empty()) {
            debt = debt.with_notes(notes);
        }

        self.repo.insert_debt(&debt).await?;
        info!("Created debt '{}' ({})", debt.person_name, debt.debt_type);
        Ok(debt)
    }

    /// Get a debt by ID.
    pub async fn get_debt(&self, id: DebtId) -> Result<Debt, AppError> {
        self.repo
            .get_debt(id)
            .await?
            .ok_or_else(|| AppError::DebtNotFound(id.to_string()))
    }

    /// Debts matching a filter and an optional case-insensitive name search, newest first.
    pub async fn list_debts(
        &self,
        filter: DebtFilter,
        search: Option<&str>,
    ) -> Result<Vec<Debt>, AppError> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Ok(self
            .repo
            .list_debts()
            .await?
            .into_iter()
            .filter(|debt| filter.matches(debt))
            .filter(|debt| match &needle {
                Some(needle) => debt.person_name.to_lowercase().contains(needle),
                None => true,
            })
            .collect())
    }

    /// A debt and its repayments.
    pub async fn debt_details(&self, id: DebtId) -> Result<DebtDetails, AppError> {
        let debt = self.get_debt(id).await?;
        let payments = self.repo.list_debt_payments(id).await?;
        Ok(DebtDetails { debt, payments })
    }

    /// Record a repayment. The repayment row and the new balance are written together.
    pub async fn record_debt_payment(
        &self,
        id: DebtId,
        amount: Cents,
        date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Debt, AppError> {
        let mut tx = self.repo.begin().await?;

        let mut debt = Repository::fetch_debt(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::DebtNotFound(id.to_string()))?;
        debt.apply_payment(amount)?;

        let mut payment = DebtPayment::new(debt.id, amount, date);
        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            payment = payment.with_notes(notes);
        }

        Repository::insert_debt_payment(&mut tx, &payment).await?;
        Repository::update_debt_balance(&mut tx, &debt).await?;
        tx.commit().await.context("Failed to commit debt payment")?;

        info!(
            "Recorded payment on debt '{}', status {}",
            debt.person_name, debt.status
        );
        Ok(debt)
    }

    /// Delete a debt and its repayments.
    pub async fn delete_debt(&self, id: DebtId) -> Result<(), AppError> {
        if !self.repo.delete_debt(id).await? {
            return Err(AppError::DebtNotFound(id.to_string()));
        }
        info!("Deleted debt {}", id);
        Ok(())
    }

    /// Outstanding amounts of open debts, per currency and direction.
    pub async fn debt_totals(&self) -> Result<DebtTotals, AppError> {
        let debts = self.repo.list_debts().await?;
        Ok(DebtTotals {
            i_owe: outstanding_totals(&debts, DebtType::IOwe),
            owes_me: outstanding_totals(&debts, DebtType::OwesMe),
        })
    }
}
