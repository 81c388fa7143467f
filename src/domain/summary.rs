use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Month, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Payment, cents_to_decimal};

pub type SummaryId = Uuid;

/// A calendar month. Orders by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("?")
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Income totals for one month. The cumulative value is a year-to-date running total and is
/// a derived cache: it is rewritten for the whole year after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub id: SummaryId,
    pub year: i32,
    pub month: u32,
    /// Sum of converted amounts in this month (home-currency cents)
    pub total_income: Cents,
    /// Sum of `total_income` for every month of the same year up to and including this one
    pub cumulative_income: Cents,
    pub payment_count: i64,
    pub last_updated: DateTime<Utc>,
}

impl MonthlySummary {
    /// Open a summary for the first payment of a month. `cumulative_seed` is the year-to-date
    /// total before this month.
    pub fn new(period: Period, converted_amount: Cents, cumulative_seed: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            year: period.year,
            month: period.month,
            total_income: converted_amount,
            cumulative_income: cumulative_seed + converted_amount,
            payment_count: 1,
            last_updated: Utc::now(),
        }
    }

    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }

    pub fn add_payment(&mut self, converted_amount: Cents) {
        self.total_income += converted_amount;
        self.payment_count += 1;
        self.last_updated = Utc::now();
    }

    /// Take a payment out of the month. Returns true when no payments are left and the summary
    /// must be deleted.
    pub fn remove_payment(&mut self, converted_amount: Cents) -> bool {
        self.total_income -= converted_amount;
        self.payment_count -= 1;
        self.last_updated = Utc::now();
        self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.payment_count <= 0
    }

    /// Tax owed for this month, in home-currency units.
    pub fn tax_amount(&self, tax_rate: Decimal) -> Decimal {
        cents_to_decimal(self.total_income) * tax_rate
    }

    /// Tax owed for the year up to and including this month, in home-currency units.
    pub fn cumulative_tax_amount(&self, tax_rate: Decimal) -> Decimal {
        cents_to_decimal(self.cumulative_income) * tax_rate
    }
}

/// Year-to-date total of the nearest earlier month in the same year, or 0 when the month
/// is the first one of its year with income. Gaps contribute nothing.
pub fn cumulative_seed(year_summaries: &[MonthlySummary], period: Period) -> Cents {
    year_summaries
        .iter()
        .filter(|s| s.year == period.year && s.month < period.month)
        .max_by_key(|s| s.month)
        .map(|s| s.cumulative_income)
        .unwrap_or(0)
}

/// Rewrite cumulative totals as per-year prefix sums of monthly totals.
///
/// Summaries are sorted by (year, month) in place and the running total restarts at zero for
/// every new year.
pub fn recompute_cumulative(summaries: &mut [MonthlySummary]) {
    summaries.sort_by_key(|s| s.period());

    let mut current_year = None;
    let mut running_total: Cents = 0;
    for summary in summaries.iter_mut() {
        if current_year != Some(summary.year) {
            current_year = Some(summary.year);
            running_total = 0;
        }
        running_total += summary.total_income;
        summary.cumulative_income = running_total;
    }
}

/// Build the summaries a payment set should produce, straight from the payments.
pub fn derive_summaries(payments: &[Payment]) -> Vec<MonthlySummary> {
    let mut by_period: BTreeMap<Period, (Cents, i64)> = BTreeMap::new();
    for payment in payments {
        let entry = by_period.entry(payment.period()).or_insert((0, 0));
        entry.0 += payment.converted_amount;
        entry.1 += 1;
    }

    let now = Utc::now();
    let mut summaries: Vec<MonthlySummary> = by_period
        .into_iter()
        .map(|(period, (total_income, payment_count))| MonthlySummary {
            id: Uuid::new_v4(),
            year: period.year,
            month: period.month,
            total_income,
            cumulative_income: 0,
            payment_count,
            last_updated: now,
        })
        .collect();

    recompute_cumulative(&mut summaries);
    summaries
}

/// A difference between stored summaries and the payments they are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryIssue {
    /// Payments exist for the month but no summary does
    Missing(Period),
    /// A summary exists for a month with no payments
    Orphaned(Period),
    TotalMismatch {
        period: Period,
        stored: Cents,
        expected: Cents,
    },
    CountMismatch {
        period: Period,
        stored: i64,
        expected: i64,
    },
    CumulativeMismatch {
        period: Period,
        stored: Cents,
        expected: Cents,
    },
}

impl fmt::Display for SummaryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryIssue::Missing(period) => {
                write!(f, "{}: payments recorded but summary is missing", period)
            }
            SummaryIssue::Orphaned(period) => {
                write!(f, "{}: summary exists without any payments", period)
            }
            SummaryIssue::TotalMismatch {
                period,
                stored,
                expected,
            } => write!(
                f,
                "{}: total income is {} cents, payments add up to {} cents",
                period, stored, expected
            ),
            SummaryIssue::CountMismatch {
                period,
                stored,
                expected,
            } => write!(
                f,
                "{}: payment count is {}, expected {}",
                period, stored, expected
            ),
            SummaryIssue::CumulativeMismatch {
                period,
                stored,
                expected,
            } => write!(
                f,
                "{}: cumulative income is {} cents, expected {} cents",
                period, stored, expected
            ),
        }
    }
}

/// Outcome of comparing stored summaries with a fresh derivation.
#[derive(Debug, Clone)]
pub struct SummaryCheck {
    pub payment_count: usize,
    pub summary_count: usize,
    pub issues: Vec<SummaryIssue>,
}

impl SummaryCheck {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Compare stored summaries against the payments and list every discrepancy.
pub fn check_summaries(stored: &[MonthlySummary], payments: &[Payment]) -> SummaryCheck {
    let expected: BTreeMap<Period, MonthlySummary> = derive_summaries(payments)
        .into_iter()
        .map(|s| (s.period(), s))
        .collect();
    let actual: BTreeMap<Period, &MonthlySummary> =
        stored.iter().map(|s| (s.period(), s)).collect();

    let mut issues = Vec::new();
    for (period, want) in &expected {
        let Some(have) = actual.get(period) else {
            issues.push(SummaryIssue::Missing(*period));
            continue;
        };
        if have.total_income != want.total_income {
            issues.push(SummaryIssue::TotalMismatch {
                period: *period,
                stored: have.total_income,
                expected: want.total_income,
            });
        }
        if have.payment_count != want.payment_count {
            issues.push(SummaryIssue::CountMismatch {
                period: *period,
                stored: have.payment_count,
                expected: want.payment_count,
            });
        }
        if have.cumulative_income != want.cumulative_income {
            issues.push(SummaryIssue::CumulativeMismatch {
                period: *period,
                stored: have.cumulative_income,
                expected: want.cumulative_income,
            });
        }
    }
    for period in actual.keys() {
        if !expected.contains_key(period) {
            issues.push(SummaryIssue::Orphaned(*period));
        }
    }

    SummaryCheck {
        payment_count: payments.len(),
        summary_count: stored.len(),
        issues,
    }
}
