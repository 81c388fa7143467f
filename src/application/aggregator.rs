//! Keeps monthly summaries in step with the payment set.
//!
//! Every mutation runs in a single transaction: the payment row, the summary row of its month
//! and the cumulative totals of the affected year are written together or not at all.

use std::collections::HashMap;

use anyhow::Context;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::domain::{
    MonthlySummary, Payment, PaymentId, SummaryCheck, check_summaries, cumulative_seed,
    derive_summaries, recompute_cumulative,
};
use crate::storage::Repository;

use super::AppError;

pub struct LedgerAggregator<'a> {
    repo: &'a Repository,
}

impl<'a> LedgerAggregator<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Persist a payment and fold it into the summary of its month.
    pub async fn record_payment(&self, payment: &Payment) -> Result<(), AppError> {
        let mut tx = self.repo.begin().await?;

        Repository::insert_payment(&mut tx, payment).await?;
        add_contribution(&mut tx, payment).await?;
        recompute_year(&mut tx, payment.year()).await?;

        tx.commit().await.context("Failed to commit payment")?;
        debug!(
            payment_id = %payment.id,
            period = %payment.period(),
            converted = payment.converted_amount,
            "Recorded payment"
        );
        Ok(())
    }

    /// Remove a payment and take it out of its month's summary. Returns the removed payment.
    pub async fn delete_payment(&self, id: PaymentId) -> Result<Payment, AppError> {
        let mut tx = self.repo.begin().await?;

        let payment = Repository::fetch_payment(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::PaymentNotFound(id.to_string()))?;

        Repository::delete_payment(&mut tx, id).await?;
        remove_contribution(&mut tx, &payment).await?;
        recompute_year(&mut tx, payment.year()).await?;

        tx.commit().await.context("Failed to commit payment deletion")?;
        debug!(payment_id = %payment.id, period = %payment.period(), "Deleted payment");
        Ok(payment)
    }

    /// Swap a stored payment for an edited version with the same ID. The stored row is read
    /// inside the transaction and returned.
    pub async fn replace_payment(&self, new: &Payment) -> Result<Payment, AppError> {
        let mut tx = self.repo.begin().await?;

        let old = Repository::fetch_payment(&mut tx, new.id)
            .await?
            .ok_or_else(|| AppError::PaymentNotFound(new.id.to_string()))?;

        remove_contribution(&mut tx, &old).await?;
        if !Repository::update_payment(&mut tx, new).await? {
            return Err(AppError::PaymentNotFound(new.id.to_string()));
        }
        add_contribution(&mut tx, new).await?;

        recompute_year(&mut tx, old.year()).await?;
        if new.year() != old.year() {
            recompute_year(&mut tx, new.year()).await?;
        }

        tx.commit().await.context("Failed to commit payment update")?;
        debug!(
            payment_id = %new.id,
            from = %old.period(),
            to = %new.period(),
            "Replaced payment"
        );
        Ok(old)
    }

    /// Rewrite the cumulative totals of one year as running sums of its monthly totals.
    pub async fn recompute_cumulative_totals(&self, year: i32) -> Result<(), AppError> {
        let mut tx = self.repo.begin().await?;
        recompute_year(&mut tx, year).await?;
        tx.commit()
            .await
            .context("Failed to commit cumulative totals")?;
        Ok(())
    }

    /// Throw away every summary and derive them again from the payments. Returns the number
    /// of summaries written.
    pub async fn rebuild_summaries(&self) -> Result<usize, AppError> {
        let mut tx = self.repo.begin().await?;

        let payments = Repository::all_payments(&mut tx).await?;
        let removed = Repository::delete_all_summaries(&mut tx).await?;
        let summaries = derive_summaries(&payments);
        for summary in &summaries {
            Repository::insert_summary(&mut tx, summary).await?;
        }

        tx.commit().await.context("Failed to commit rebuilt summaries")?;
        info!(
            removed,
            created = summaries.len(),
            payments = payments.len(),
            "Rebuilt monthly summaries"
        );
        Ok(summaries.len())
    }

    /// Compare stored summaries with what the payments say they should be.
    pub async fn check_summaries(&self) -> Result<SummaryCheck, AppError> {
        let payments = self.repo.list_payments().await?;
        let summaries = self.repo.list_summaries().await?;
        Ok(check_summaries(&summaries, &payments))
    }
}

async fn add_contribution(conn: &mut SqliteConnection, payment: &Payment) -> anyhow::Result<()> {
    let period = payment.period();
    match Repository::get_summary(conn, period).await? {
        Some(mut summary) => {
            summary.add_payment(payment.converted_amount);
            Repository::update_summary(conn, &summary).await?;
        }
        None => {
            let year_summaries = Repository::summaries_for_year(conn, period.year).await?;
            let seed = cumulative_seed(&year_summaries, period);
            let summary = MonthlySummary::new(period, payment.converted_amount, seed);
            Repository::insert_summary(conn, &summary).await?;
            debug!(%period, "Created monthly summary");
        }
    }
    Ok(())
}

async fn remove_contribution(conn: &mut SqliteConnection, payment: &Payment) -> anyhow::Result<()> {
    let period = payment.period();
    let Some(mut summary) = Repository::get_summary(conn, period).await? else {
        warn!(
            %period,
            payment_id = %payment.id,
            "Inconsistent summary: no summary for the month of a removed payment"
        );
        return Ok(());
    };

    if summary.remove_payment(payment.converted_amount) {
        Repository::delete_summary(conn, &summary).await?;
        debug!(%period, "Removed empty monthly summary");
    } else {
        Repository::update_summary(conn, &summary).await?;
    }
    Ok(())
}

/// Per-year prefix sums, written back only where they changed.
async fn recompute_year(conn: &mut SqliteConnection, year: i32) -> anyhow::Result<()> {
    let mut summaries = Repository::summaries_for_year(conn, year).await?;
    let before: HashMap<_, _> = summaries
        .iter()
        .map(|s| (s.id, s.cumulative_income))
        .collect();

    recompute_cumulative(&mut summaries);

    let mut updated = 0;
    for summary in &summaries {
        if before.get(&summary.id) != Some(&summary.cumulative_income) {
            Repository::update_summary(conn, summary).await?;
            updated += 1;
        }
    }
    debug!(year, months = summaries.len(), updated, "Recomputed cumulative totals");
    Ok(())
}
