use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{
    Debt, DebtPayment, ExchangeRate, MaintenanceRecord, MonthlySummary, Payment, PaymentFilter,
    format_cents,
};

/// Upper bound on rate history rows in a snapshot
const SNAPSHOT_RATE_LIMIT: u32 = 10_000;

/// A debt together with its repayments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtRecord {
    #[serde(flatten)]
    pub debt: Debt,
    pub payments: Vec<DebtPayment>,
}

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub payments: Vec<Payment>,
    pub summaries: Vec<MonthlySummary>,
    pub exchange_rates: Vec<ExchangeRate>,
    pub debts: Vec<DebtRecord>,
    pub maintenance: Vec<MaintenanceRecord>,
}

/// Exporter for converting tax book data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export payments matching `filter` to CSV, oldest first
    pub async fn export_payments_csv<W: Write>(
        &self,
        writer: W,
        filter: &PaymentFilter,
    ) -> Result<usize> {
        let mut payments = self.service.list_payments(filter).await?;
        payments.reverse();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "company",
            "amount",
            "currency",
            "exchange_rate",
            "converted_amount",
            "home_currency",
        ])?;

        let home = self.service.home_currency();
        for payment in &payments {
            csv_writer.write_record([
                payment.id.to_string(),
                payment.date.to_string(),
                payment.company.clone(),
                format_cents(payment.amount),
                payment.currency.to_string(),
                payment.exchange_rate.to_string(),
                format_cents(payment.converted_amount),
                home.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(payments.len())
    }

    /// Export monthly summaries, with tax, to CSV
    pub async fn export_summaries_csv<W: Write>(
        &self,
        writer: W,
        year: Option<i32>,
    ) -> Result<usize> {
        let summaries = self.service.summaries(year).await?;
        let tax_rate = self.service.config().tax_rate;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "year",
            "month",
            "payment_count",
            "total_income",
            "cumulative_income",
            "tax",
            "cumulative_tax",
        ])?;

        for summary in &summaries {
            csv_writer.write_record([
                summary.year.to_string(),
                summary.month.to_string(),
                summary.payment_count.to_string(),
                format_cents(summary.total_income),
                format_cents(summary.cumulative_income),
                format!("{:.2}", summary.tax_amount(tax_rate)),
                format!("{:.2}", summary.cumulative_tax_amount(tax_rate)),
            ])?;
        }

        csv_writer.flush()?;
        Ok(summaries.len())
    }

    /// Export payments as a JSON array
    pub async fn export_payments_json<W: Write>(
        &self,
        mut writer: W,
        filter: &PaymentFilter,
    ) -> Result<usize> {
        let payments = self.service.list_payments(filter).await?;
        serde_json::to_writer_pretty(&mut writer, &payments)?;
        writer.flush()?;
        Ok(payments.len())
    }

    /// Export monthly summaries as a JSON array
    pub async fn export_summaries_json<W: Write>(
        &self,
        mut writer: W,
        year: Option<i32>,
    ) -> Result<usize> {
        let summaries = self.service.summaries(year).await?;
        serde_json::to_writer_pretty(&mut writer, &summaries)?;
        writer.flush()?;
        Ok(summaries.len())
    }

    /// Export full database as JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let payments = self.service.list_payments(&PaymentFilter::default()).await?;
        let summaries = self.service.summaries(None).await?;
        let exchange_rates = self.service.rate_history(None, SNAPSHOT_RATE_LIMIT).await?;
        let maintenance = self.service.list_maintenance().await?;

        let mut debts = Vec::new();
        for debt in self.service.list_debts(Default::default(), None).await? {
            let details = self.service.debt_details(debt.id).await?;
            debts.push(DebtRecord {
                debt: details.debt,
                payments: details.payments,
            });
        }

        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            payments,
            summaries,
            exchange_rates,
            debts,
            maintenance,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
