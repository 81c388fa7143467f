use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    /// Georgian lari, the default home currency
    Gel,
    /// Belarusian ruble, only used for debts and maintenance costs
    Byn,
}

impl Currency {
    /// Every supported currency.
    pub const ALL: [Currency; 4] = [Currency::Eur, Currency::Usd, Currency::Gel, Currency::Byn];

    /// Currencies an income payment may be recorded in.
    pub const INCOME: [Currency; 3] = [Currency::Eur, Currency::Usd, Currency::Gel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gel => "GEL",
            Currency::Byn => "BYN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "EUR" => Some(Currency::Eur),
            "USD" => Some(Currency::Usd),
            "GEL" => Some(Currency::Gel),
            "BYN" => Some(Currency::Byn),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Eur => "€",
            Currency::Usd => "$",
            Currency::Gel => "₾",
            Currency::Byn => "Br",
        }
    }

    /// Returns true if income payments can be recorded in this currency.
    pub fn is_income_currency(&self) -> bool {
        Self::INCOME.contains(self)
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
