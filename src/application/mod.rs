// Application layer: use cases and orchestration on top of the repository.

mod aggregator;
mod debts;
pub mod error;
mod maintenance;
mod rates;
pub mod reporting;
mod service;

pub use aggregator::LedgerAggregator;
pub use debts::{DebtDetails, DebtTotals, NewDebt};
pub use error::*;
pub use maintenance::{NewMaintenance, UpcomingService};
pub use rates::QuickConversion;
pub use reporting::*;
pub use service::{LedgerService, NewPayment, PaymentUpdate};
