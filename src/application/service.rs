use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{
    Cents, Currency, MonthGroup, MonthlySummary, Payment, PaymentFilter, PaymentId, QuickStats,
    SummaryCheck, format_cents, group_by_month,
};
use crate::rates::{NbgRateProvider, RateProvider};
use crate::storage::Repository;

use super::{AppError, LedgerAggregator, TaxReport};

/// Application service providing high-level operations for the tax book.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LedgerService {
    pub(super) repo: Repository,
    pub(super) config: Config,
    pub(super) rates: Arc<dyn RateProvider>,
}

/// Input for recording a payment. Without an explicit rate, foreign payments ask the rate
/// provider for the rate on the payment date.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub company: String,
    pub amount: Cents,
    pub currency: Currency,
    pub date: NaiveDate,
    pub exchange_rate: Option<Decimal>,
}

/// Fields to change on an existing payment; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub company: Option<String>,
    pub amount: Option<Cents>,
    pub currency: Option<Currency>,
    pub date: Option<NaiveDate>,
    pub exchange_rate: Option<Decimal>,
}

impl LedgerService {
    /// Create a new service from its parts.
    pub fn new(repo: Repository, config: Config, rates: Arc<dyn RateProvider>) -> Self {
        if rates.home_currency() != config.home_currency {
            warn!(
                configured = %config.home_currency,
                provider = %rates.home_currency(),
                "Rate provider quotes in a different currency than the configured home currency"
            );
        }
        Self {
            repo,
            config,
            rates,
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, config: Config) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        info!("Initialized database at {}", database_path);
        Self::with_default_rates(repo, config)
    }

    /// Connect to an existing database. Pending migrations are applied.
    pub async fn connect(database_path: &str, config: Config) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        repo.migrate().await?;
        Self::with_default_rates(repo, config)
    }

    fn with_default_rates(repo: Repository, config: Config) -> Result<Self, AppError> {
        let provider = NbgRateProvider::new(config.rates.base_url.clone(), config.rate_timeout())?;
        Ok(Self::new(repo, config, Arc::new(provider)))
    }

    /// Replace the rate provider, e.g. with a fixed table for offline use.
    pub fn with_rate_provider(self, rates: Arc<dyn RateProvider>) -> Self {
        Self::new(self.repo, self.config, rates)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn home_currency(&self) -> Currency {
        self.config.home_currency
    }

    fn aggregator(&self) -> LedgerAggregator<'_> {
        LedgerAggregator::new(&self.repo)
    }

    // ========================
    // Payment operations
    // ========================

    /// Record a new payment, resolving its exchange rate first.
    pub async fn add_payment(&self, new: NewPayment) -> Result<Payment, AppError> {
        let rate = self
            .resolve_rate(new.currency, new.date, new.exchange_rate)
            .await?;
        let payment = Payment::new(
            new.company,
            new.amount,
            new.currency,
            new.date,
            rate,
            self.config.home_currency,
        )?;

        self.aggregator().record_payment(&payment).await?;
        info!(
            "Recorded payment from {} on {}: {} {} -> {} {}",
            payment.company,
            payment.date,
            format_cents(payment.amount),
            payment.currency,
            format_cents(payment.converted_amount),
            self.config.home_currency
        );
        Ok(payment)
    }

    /// Record an already-built payment as is.
    pub async fn record_payment(&self, payment: &Payment) -> Result<(), AppError> {
        self.aggregator().record_payment(payment).await
    }

    /// Get a payment by ID.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, AppError> {
        self.repo
            .get_payment(id)
            .await?
            .ok_or_else(|| AppError::PaymentNotFound(id.to_string()))
    }

    /// Edit a payment. The converted amount is derived again from the edited fields; the rate
    /// is kept when neither currency nor date changes, otherwise it is looked up again unless
    /// one is given.
    pub async fn update_payment(
        &self,
        id: PaymentId,
        update: PaymentUpdate,
    ) -> Result<Payment, AppError> {
        let old = self.get_payment(id).await?;

        let currency = update.currency.unwrap_or(old.currency);
        let date = update.date.unwrap_or(old.date);
        let manual_rate = match update.exchange_rate {
            Some(rate) => Some(rate),
            None if currency == old.currency && date == old.date => Some(old.exchange_rate),
            None => None,
        };
        let rate = self.resolve_rate(currency, date, manual_rate).await?;

        let new = Payment::new(
            update.company.unwrap_or_else(|| old.company.clone()),
            update.amount.unwrap_or(old.amount),
            currency,
            date,
            rate,
            self.config.home_currency,
        )?
        .with_identity(old.id, old.created_at);

        self.aggregator().replace_payment(&new).await?;
        info!("Updated payment {}", new.id);
        Ok(new)
    }

    /// Delete a payment and return it.
    pub async fn delete_payment(&self, id: PaymentId) -> Result<Payment, AppError> {
        let payment = self.aggregator().delete_payment(id).await?;
        info!("Deleted payment {} from {}", payment.id, payment.company);
        Ok(payment)
    }

    /// Payments matching a filter, newest first.
    pub async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError> {
        Ok(self.repo.list_payments_filtered(filter).await?)
    }

    /// Payments matching a filter grouped by month, newest month first.
    pub async fn payment_groups(
        &self,
        filter: &PaymentFilter,
    ) -> Result<Vec<MonthGroup>, AppError> {
        let payments = self.list_payments(filter).await?;
        Ok(group_by_month(&payments))
    }

    /// Years that have at least one payment, newest first.
    pub async fn available_years(&self) -> Result<Vec<i32>, AppError> {
        Ok(self.repo.list_payment_years().await?)
    }

    /// The rate to record a payment with: 1 for the home currency, the given rate when there is
    /// one, otherwise the provider's rate for the payment date.
    async fn resolve_rate(
        &self,
        currency: Currency,
        date: NaiveDate,
        manual: Option<Decimal>,
    ) -> Result<Decimal, AppError> {
        if !currency.is_income_currency() {
            return Err(AppError::UnsupportedCurrency(currency));
        }
        if currency == self.config.home_currency {
            return Ok(Decimal::ONE);
        }
        match manual {
            Some(rate) if rate > Decimal::ZERO => Ok(rate),
            Some(rate) => Err(AppError::InvalidRate(format!(
                "rate must be positive, got {}",
                rate
            ))),
            None => {
                debug!("Looking up {} rate for {}", currency, date);
                Ok(self.rates.fetch_rate(currency, date).await?)
            }
        }
    }

    // ========================
    // Summary operations
    // ========================

    /// Monthly summaries, oldest first, optionally for one year.
    pub async fn summaries(&self, year: Option<i32>) -> Result<Vec<MonthlySummary>, AppError> {
        let summaries = match year {
            Some(year) => self.repo.list_summaries_for_year(year).await?,
            None => self.repo.list_summaries().await?,
        };
        Ok(summaries)
    }

    /// Monthly income and tax for a year.
    pub async fn tax_report(&self, year: i32) -> Result<TaxReport, AppError> {
        let summaries = self.repo.list_summaries_for_year(year).await?;
        Ok(TaxReport::from_summaries(
            year,
            &summaries,
            self.config.tax_rate,
        ))
    }

    /// Counts and totals over the payments of a year, or of all years.
    pub async fn quick_stats(&self, year: Option<i32>) -> Result<QuickStats, AppError> {
        let filter = PaymentFilter {
            year,
            ..PaymentFilter::default()
        };
        let payments = self.list_payments(&filter).await?;
        Ok(QuickStats::from_payments(&payments))
    }

    /// Rewrite the cumulative totals of a year.
    pub async fn recompute_cumulative_totals(&self, year: i32) -> Result<(), AppError> {
        self.aggregator().recompute_cumulative_totals(year).await
    }

    /// Compare stored summaries with the payments.
    pub async fn check_summaries(&self) -> Result<SummaryCheck, AppError> {
        let check = self.aggregator().check_summaries().await?;
        if !check.is_healthy() {
            warn!("Summary check found {} issue(s)", check.issues.len());
        }
        Ok(check)
    }

    /// Derive every summary again from the payments.
    pub async fn rebuild_summaries(&self) -> Result<usize, AppError> {
        self.aggregator().rebuild_summaries().await
    }
}
