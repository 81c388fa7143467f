use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::{Cents, Currency, Payment, Period};

/// Which payments to show. Every field is optional; an empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// Case-insensitive substring of the company name
    pub search: Option<String>,
}

impl PaymentFilter {
    pub fn for_year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        if self.year.is_some_and(|y| payment.date.year() != y) {
            return false;
        }
        if self.month.is_some_and(|m| payment.date.month() != m) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => payment
                .company
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, payments: &'a [Payment]) -> Vec<&'a Payment> {
        payments.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Payments of one month with their converted total.
#[derive(Debug, Clone)]
pub struct MonthGroup {
    pub period: Period,
    pub payments: Vec<Payment>,
    pub total_converted: Cents,
}

/// Group payments by month, newest month first. Payments inside a group keep their order.
pub fn group_by_month(payments: &[Payment]) -> Vec<MonthGroup> {
    let mut groups: BTreeMap<Period, Vec<Payment>> = BTreeMap::new();
    for payment in payments {
        groups
            .entry(payment.period())
            .or_default()
            .push(payment.clone());
    }

    groups
        .into_iter()
        .rev()
        .map(|(period, payments)| MonthGroup {
            period,
            total_converted: payments.iter().map(|p| p.converted_amount).sum(),
            payments,
        })
        .collect()
}

/// Distinct payment years, newest first.
pub fn available_years(payments: &[Payment]) -> Vec<i32> {
    let years: BTreeSet<i32> = payments.iter().map(|p| p.date.year()).collect();
    years.into_iter().rev().collect()
}

/// Aggregates over a set of payments. Nothing here is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickStats {
    pub payment_count: usize,
    pub company_count: usize,
    /// Sum of converted amounts, home-currency cents
    pub total_converted: Cents,
    /// Sum of original amounts per payment currency
    pub totals_by_currency: BTreeMap<Currency, Cents>,
}

impl QuickStats {
    pub fn from_payments<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Self {
        let mut companies = HashSet::new();
        let mut stats = QuickStats {
            payment_count: 0,
            company_count: 0,
            total_converted: 0,
            totals_by_currency: BTreeMap::new(),
        };

        for payment in payments {
            stats.payment_count += 1;
            stats.total_converted += payment.converted_amount;
            *stats
                .totals_by_currency
                .entry(payment.currency)
                .or_insert(0) += payment.amount;
            companies.insert(payment.company.as_str());
        }
        stats.company_count = companies.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn payment(company: &str, date: &str, amount: Cents, currency: Currency) -> Payment {
        Payment::new(
            company,
            amount,
            currency,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            Decimal::from(3),
            Currency::Gel,
        )
        .unwrap()
    }

    fn sample() -> Vec<Payment> {
        vec![
            payment("Acme Corp", "2024-12-30", 10000, Currency::Usd),
            payment("Acme Corp", "2025-01-15", 10000, Currency::Eur),
            payment("Globex", "2025-01-20", 5033, Currency::Eur),
            payment("Initech", "2025-02-01", 20000, Currency::Gel),
        ]
    }

    #[test]
    fn test_filter_by_year_month_and_search() {
        let payments = sample();

        assert_eq!(PaymentFilter::for_year(2025).apply(&payments).len(), 3);

        let january = PaymentFilter {
            year: Some(2025),
            month: Some(1),
            search: None,
        };
        assert_eq!(january.apply(&payments).len(), 2);

        let search = PaymentFilter {
            search: Some("acme".into()),
            ..PaymentFilter::default()
        };
        assert_eq!(search.apply(&payments).len(), 2);

        let blank = PaymentFilter {
            search: Some("   ".into()),
            ..PaymentFilter::default()
        };
        assert_eq!(blank.apply(&payments).len(), 4);
    }

    #[test]
    fn test_group_by_month_newest_first() {
        let groups = group_by_month(&sample());
        let periods: Vec<_> = groups.iter().map(|g| g.period.to_string()).collect();
        assert_eq!(periods, vec!["2025-02", "2025-01", "2024-12"]);
        assert_eq!(groups[1].payments.len(), 2);
        assert_eq!(groups[1].total_converted, 30000 + 15100);
    }

    #[test]
    fn test_available_years() {
        assert_eq!(available_years(&sample()), vec![2025, 2024]);
        assert!(available_years(&[]).is_empty());
    }

    #[test]
    fn test_quick_stats_for_year() {
        let payments = sample();
        let stats = QuickStats::from_payments(PaymentFilter::for_year(2025).apply(&payments));

        assert_eq!(stats.payment_count, 3);
        assert_eq!(stats.company_count, 3);
        assert_eq!(stats.total_converted, 30000 + 15100 + 20000);
        assert_eq!(stats.totals_by_currency.get(&Currency::Eur), Some(&15033));
        assert_eq!(stats.totals_by_currency.get(&Currency::Gel), Some(&20000));
        assert_eq!(stats.totals_by_currency.get(&Currency::Usd), None);
    }
}
