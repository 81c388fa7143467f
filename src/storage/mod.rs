mod debts;
mod maintenance;
mod payments;
mod rates;
mod repository;
mod summaries;

pub use repository::*;

/// SQL migration for payments, summaries and rate history
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for debts
pub const MIGRATION_002_DEBTS: &str = include_str!("migrations/002_debts.sql");

/// SQL migration for vehicle maintenance
pub const MIGRATION_003_MAINTENANCE: &str = include_str!("migrations/003_maintenance.sql");
