use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Currency};

pub type DebtId = Uuid;
pub type DebtPaymentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtType {
    /// Money I have to pay back
    IOwe,
    /// Money somebody has to pay me back
    OwesMe,
}

impl DebtType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtType::IOwe => "i_owe",
            DebtType::OwesMe => "owes_me",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "i_owe" | "iowe" => Some(DebtType::IOwe),
            "owes_me" | "owesme" => Some(DebtType::OwesMe),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DebtType::IOwe => "I Owe",
            DebtType::OwesMe => "Owes Me",
        }
    }
}

impl fmt::Display for DebtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    PartiallyPaid,
    Paid,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtStatus::Pending => "pending",
            DebtStatus::PartiallyPaid => "partially_paid",
            DebtStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DebtStatus::Pending),
            "partially_paid" => Some(DebtStatus::PartiallyPaid),
            "paid" => Some(DebtStatus::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DebtStatus::Pending => "Pending",
            DebtStatus::PartiallyPaid => "Partially Paid",
            DebtStatus::Paid => "Paid",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub person_name: String,
    pub original_amount: Cents,
    pub remaining_amount: Cents,
    pub currency: Currency,
    pub debt_type: DebtType,
    pub status: DebtStatus,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Debt {
    pub fn new(
        person_name: impl Into<String>,
        amount: Cents,
        currency: Currency,
        debt_type: DebtType,
    ) -> Result<Self, DebtError> {
        let person_name = person_name.into().trim().to_string();
        if person_name.is_empty() {
            return Err(DebtError::EmptyName);
        }
        if amount <= 0 {
            return Err(DebtError::NonPositiveAmount(amount));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            person_name,
            original_amount: amount,
            remaining_amount: amount,
            currency,
            debt_type,
            status: DebtStatus::Pending,
            created_at: now,
            due_date: None,
            notes: None,
            last_updated: now,
        })
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_paid(&self) -> bool {
        self.status == DebtStatus::Paid
    }

    /// True when a due date has passed and the debt is still open.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && !self.is_paid(),
            None => false,
        }
    }

    pub fn paid_amount(&self) -> Cents {
        self.original_amount - self.remaining_amount
    }

    /// Fraction of the original amount already paid back, 0.0 to 1.0.
    pub fn payment_progress(&self) -> f64 {
        if self.original_amount <= 0 {
            return 0.0;
        }
        self.paid_amount() as f64 / self.original_amount as f64
    }

    /// Apply a repayment and move the status forward.
    pub fn apply_payment(&mut self, amount: Cents) -> Result<(), DebtError> {
        if self.is_paid() {
            return Err(DebtError::AlreadyPaid);
        }
        if amount <= 0 {
            return Err(DebtError::NonPositiveAmount(amount));
        }
        if amount > self.remaining_amount {
            return Err(DebtError::ExceedsRemaining {
                remaining: self.remaining_amount,
                requested: amount,
            });
        }

        self.remaining_amount -= amount;
        self.status = if self.remaining_amount <= 0 {
            DebtStatus::Paid
        } else {
            DebtStatus::PartiallyPaid
        };
        self.last_updated = Utc::now();
        Ok(())
    }
}

/// One repayment towards a debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub id: DebtPaymentId,
    pub debt_id: DebtId,
    pub amount: Cents,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl DebtPayment {
    pub fn new(debt_id: DebtId, amount: Cents, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            debt_id,
            amount,
            date,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebtFilter {
    #[default]
    All,
    IOwe,
    OwesMe,
    /// Anything not yet paid
    Active,
    Paid,
}

impl DebtFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "all" => Some(DebtFilter::All),
            "i_owe" | "iowe" => Some(DebtFilter::IOwe),
            "owes_me" | "owesme" => Some(DebtFilter::OwesMe),
            "active" => Some(DebtFilter::Active),
            "paid" => Some(DebtFilter::Paid),
            _ => None,
        }
    }

    pub fn matches(&self, debt: &Debt) -> bool {
        match self {
            DebtFilter::All => true,
            DebtFilter::IOwe => debt.debt_type == DebtType::IOwe,
            DebtFilter::OwesMe => debt.debt_type == DebtType::OwesMe,
            DebtFilter::Active => !debt.is_paid(),
            DebtFilter::Paid => debt.is_paid(),
        }
    }
}

/// Remaining amounts of open debts of one type, per currency.
pub fn outstanding_totals(debts: &[Debt], debt_type: DebtType) -> BTreeMap<Currency, Cents> {
    let mut totals = BTreeMap::new();
    for debt in debts
        .iter()
        .filter(|d| d.debt_type == debt_type && !d.is_paid())
    {
        *totals.entry(debt.currency).or_insert(0) += debt.remaining_amount;
    }
    totals
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebtError {
    EmptyName,
    NonPositiveAmount(Cents),
    ExceedsRemaining { remaining: Cents, requested: Cents },
    AlreadyPaid,
}

impl fmt::Display for DebtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebtError::EmptyName => write!(f, "person name must not be empty"),
            DebtError::NonPositiveAmount(amount) => {
                write!(f, "amount must be positive, got {} cents", amount)
            }
            DebtError::ExceedsRemaining {
                remaining,
                requested,
            } => write!(
                f,
                "payment of {} cents exceeds the remaining {} cents",
                requested, remaining
            ),
            DebtError::AlreadyPaid => write!(f, "debt is already paid"),
        }
    }
}

impl std::error::Error for DebtError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_new_debt_is_pending() {
        let debt = Debt::new("Nino", 50000, Currency::Gel, DebtType::OwesMe).unwrap();
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(debt.remaining_amount, 50000);
        assert_eq!(debt.paid_amount(), 0);
        assert_eq!(debt.payment_progress(), 0.0);
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut debt = Debt::new("Nino", 10000, Currency::Usd, DebtType::IOwe).unwrap();

        debt.apply_payment(2500).unwrap();
        assert_eq!(debt.status, DebtStatus::PartiallyPaid);
        assert_eq!(debt.paid_amount(), 2500);
        assert!((debt.payment_progress() - 0.25).abs() < f64::EPSILON);

        debt.apply_payment(7500).unwrap();
        assert_eq!(debt.status, DebtStatus::Paid);
        assert_eq!(debt.remaining_amount, 0);
        assert_eq!(debt.apply_payment(1), Err(DebtError::AlreadyPaid));
    }

    #[test]
    fn test_payment_cannot_exceed_remaining() {
        let mut debt = Debt::new("Giorgi", 1000, Currency::Eur, DebtType::IOwe).unwrap();
        assert_eq!(
            debt.apply_payment(1001),
            Err(DebtError::ExceedsRemaining {
                remaining: 1000,
                requested: 1001
            })
        );
        assert_eq!(debt.apply_payment(0), Err(DebtError::NonPositiveAmount(0)));
        assert_eq!(debt.status, DebtStatus::Pending);
    }

    #[test]
    fn test_past_due() {
        let debt = Debt::new("Giorgi", 1000, Currency::Eur, DebtType::IOwe)
            .unwrap()
            .with_due_date(date("2025-03-01"));
        assert!(!debt.is_past_due(date("2025-03-01")));
        assert!(debt.is_past_due(date("2025-03-02")));

        let mut paid = debt.clone();
        paid.apply_payment(1000).unwrap();
        assert!(!paid.is_past_due(date("2025-03-02")));
    }

    #[test]
    fn test_filters_and_outstanding_totals() {
        let mut paid = Debt::new("A", 1000, Currency::Gel, DebtType::IOwe).unwrap();
        paid.apply_payment(1000).unwrap();
        let mut partial = Debt::new("B", 3000, Currency::Gel, DebtType::IOwe).unwrap();
        partial.apply_payment(1000).unwrap();
        let debts = vec![
            paid,
            partial,
            Debt::new("C", 500, Currency::Byn, DebtType::IOwe).unwrap(),
            Debt::new("D", 700, Currency::Gel, DebtType::OwesMe).unwrap(),
        ];

        let active = debts.iter().filter(|d| DebtFilter::Active.matches(d)).count();
        assert_eq!(active, 3);
        let owes_me = debts.iter().filter(|d| DebtFilter::OwesMe.matches(d)).count();
        assert_eq!(owes_me, 1);

        let i_owe = outstanding_totals(&debts, DebtType::IOwe);
        assert_eq!(i_owe.get(&Currency::Gel), Some(&2000));
        assert_eq!(i_owe.get(&Currency::Byn), Some(&500));
        assert_eq!(outstanding_totals(&debts, DebtType::OwesMe).get(&Currency::Gel), Some(&700));
    }

    #[test]
    fn test_debt_type_parsing() {
        assert_eq!(DebtType::from_str("i-owe"), Some(DebtType::IOwe));
        assert_eq!(DebtType::from_str("Owes Me"), Some(DebtType::OwesMe));
        assert_eq!(DebtType::from_str(DebtType::IOwe.as_str()), Some(DebtType::IOwe));
        assert_eq!(DebtType::from_str("nobody"), None);
    }
}
