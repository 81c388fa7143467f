use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Cents, MonthlySummary, Period, cents_to_decimal};

/// Income and tax for every month of a year that had income.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxReport {
    pub year: i32,
    pub tax_rate: Decimal,
    pub months: Vec<MonthTax>,
    pub total_income: Cents,
    /// Tax on the year's total income, in home-currency units
    pub total_tax: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthTax {
    pub period: Period,
    pub payment_count: i64,
    pub income: Cents,
    pub tax: Decimal,
    pub cumulative_income: Cents,
    pub cumulative_tax: Decimal,
}

impl TaxReport {
    /// Build the report from one year's summaries. Summaries of other years are ignored.
    pub fn from_summaries(year: i32, summaries: &[MonthlySummary], tax_rate: Decimal) -> Self {
        let mut months: Vec<MonthTax> = summaries
            .iter()
            .filter(|s| s.year == year)
            .map(|s| MonthTax {
                period: s.period(),
                payment_count: s.payment_count,
                income: s.total_income,
                tax: s.tax_amount(tax_rate),
                cumulative_income: s.cumulative_income,
                cumulative_tax: s.cumulative_tax_amount(tax_rate),
            })
            .collect();
        months.sort_by_key(|m| m.period);

        let total_income: Cents = months.iter().map(|m| m.income).sum();
        Self {
            year,
            tax_rate,
            months,
            total_income,
            total_tax: cents_to_decimal(total_income) * tax_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(year: i32, month: u32, total: Cents, cumulative: Cents) -> MonthlySummary {
        let mut s = MonthlySummary::new(Period::new(year, month), total, 0);
        s.cumulative_income = cumulative;
        s
    }

    #[test]
    fn test_tax_report_for_year() {
        let summaries = vec![
            summary(2025, 2, 20000, 65100),
            summary(2025, 1, 45100, 45100),
            summary(2024, 12, 99900, 99900),
        ];
        let report = TaxReport::from_summaries(2025, &summaries, Decimal::new(1, 2));

        assert_eq!(report.months.len(), 2);
        assert_eq!(report.months[0].period, Period::new(2025, 1));
        assert_eq!(report.months[0].tax, Decimal::new(451, 2));
        assert_eq!(report.months[1].cumulative_tax, Decimal::new(651, 2));
        assert_eq!(report.total_income, 65100);
        assert_eq!(report.total_tax, Decimal::new(651, 2));
    }

    #[test]
    fn test_empty_year() {
        let report = TaxReport::from_summaries(2030, &[], Decimal::new(1, 2));
        assert!(report.is_empty());
        assert_eq!(report.total_income, 0);
        assert_eq!(report.total_tax, Decimal::ZERO);
    }
}
