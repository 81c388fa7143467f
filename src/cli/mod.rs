use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{LedgerService, NewDebt, NewMaintenance, NewPayment, PaymentUpdate};
use crate::config::Config;
use crate::domain::{
    Cents, Currency, DebtFilter, DebtType, MaintenanceType, PaymentFilter, format_cents,
    format_decimal,
    parse_cents, parse_rate,
};

/// Taxbook - income and tax ledger for individual entrepreneurs
#[derive(Parser)]
#[command(name = "taxbook")]
#[command(
    about = "A local-first income ledger with monthly tax summaries, debts and car maintenance"
)]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "taxbook.db", global = true)]
    pub database: String,

    /// Config file path (defaults to taxbook.json next to the database)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database and write a default config file
    Init,

    /// Income payment commands
    #[command(subcommand)]
    Payment(PaymentCommands),

    /// Show monthly summaries
    Summary {
        /// Only this year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Show the monthly tax for a year
    Tax {
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Show quick statistics over payments
    Stats {
        /// Only this year (omit for all years)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// List the years that have payments
    Years,

    /// Exchange rate commands
    #[command(subcommand)]
    Rates(RatesCommands),

    /// Debt and loan commands
    #[command(subcommand)]
    Debt(DebtCommands),

    /// Vehicle maintenance commands
    #[command(subcommand)]
    Maintenance(MaintenanceCommands),

    /// Verify that monthly summaries match the payments
    Check,

    /// Rebuild every monthly summary from the payments
    Rebuild,

    /// Export data to CSV or JSON
    Export {
        /// What to export: payments, summaries, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv, json for full)
        #[arg(short, long)]
        format: Option<String>,

        /// Only this year (payments and summaries)
        #[arg(short, long)]
        year: Option<i32>,
    },
}

#[derive(Subcommand)]
pub enum PaymentCommands {
    /// Record an income payment
    Add {
        /// Paying company
        company: String,

        /// Amount in the payment currency (e.g., "1500.00" or "1500")
        amount: String,

        /// Payment currency: EUR, USD, GEL (defaults to the home currency)
        #[arg(long)]
        currency: Option<String>,

        /// Payment date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Exchange rate to the home currency (looked up when omitted)
        #[arg(long)]
        rate: Option<String>,
    },

    /// List payments grouped by month
    List {
        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long)]
        month: Option<u32>,

        /// Company name contains (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one payment
    Show {
        /// Payment ID
        id: String,
    },

    /// Edit a payment; omitted fields keep their value
    Edit {
        /// Payment ID
        id: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        amount: Option<String>,

        #[arg(long)]
        currency: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        rate: Option<String>,
    },

    /// Delete a payment
    Delete {
        /// Payment ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum RatesCommands {
    /// Fetch and store the latest rates
    Latest,

    /// Fetch and store the rates of a given day
    Fetch {
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Convert an amount to the home currency at the latest rate
    Convert {
        /// Amount (e.g., "100.00")
        amount: String,

        /// Currency: EUR, USD
        #[arg(long)]
        currency: String,
    },

    /// Show stored rate history
    History {
        #[arg(long)]
        currency: Option<String>,

        /// Maximum number of rows
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Subcommand)]
pub enum DebtCommands {
    /// Record a new debt
    Add {
        /// Person name
        person: String,

        /// Amount (e.g., "250.00")
        amount: String,

        /// Direction: i-owe, owes-me
        #[arg(short = 't', long = "type")]
        debt_type: String,

        /// Currency: EUR, USD, GEL, BYN (defaults to the home currency)
        #[arg(long)]
        currency: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List debts
    List {
        /// Filter: all, i-owe, owes-me, active, paid
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Person name contains (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a debt with its payment history
    Show {
        /// Debt ID
        id: String,
    },

    /// Record a payment towards a debt
    Pay {
        /// Debt ID
        id: String,

        /// Amount paid
        amount: String,

        /// Payment date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete a debt and its payments
    Delete {
        /// Debt ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// Log a maintenance record
    Add {
        /// Odometer reading in km
        mileage: i64,

        /// Cost (e.g., "120.00")
        cost: String,

        /// Type: oil-change, inspection, tires, brakes, filters, other
        #[arg(short = 't', long = "type")]
        maintenance_type: String,

        /// Currency (defaults to the home currency)
        #[arg(long)]
        currency: Option<String>,

        /// Service date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,

        /// Mileage of the next service
        #[arg(long)]
        next_mileage: Option<i64>,

        /// Date of the next service (YYYY-MM-DD)
        #[arg(long)]
        next_date: Option<String>,
    },

    /// List maintenance records
    List,

    /// Delete a maintenance record
    Delete {
        /// Record ID
        id: String,
    },

    /// Show planned services and their status
    Upcoming {
        /// Current odometer reading (defaults to the last recorded mileage)
        #[arg(short, long)]
        mileage: Option<i64>,
    },

    /// Show maintenance spending
    Stats {
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
    },
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| Config::default_path_for(Path::new(&self.database)))
    }

    async fn connect(&self) -> Result<LedgerService> {
        let config = Config::load_or_default(&self.config_path())?;
        Ok(LedgerService::connect(&self.database, config).await?)
    }

    pub async fn run(self) -> Result<()> {
        if let Commands::Init = self.command {
            let config_path = self.config_path();
            let config = Config::load_or_default(&config_path)?;
            if !config_path.exists() {
                config.save(&config_path)?;
                println!("Config written: {}", config_path.display());
            }
            LedgerService::init(&self.database, config).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = self.connect().await?;

        match self.command {
            Commands::Init => {}

            Commands::Payment(cmd) => run_payment_command(&service, cmd).await?,

            Commands::Summary { year } => run_summary_command(&service, year).await?,

            Commands::Tax { year } => {
                run_tax_command(&service, year.unwrap_or_else(current_year)).await?
            }

            Commands::Stats { year } => run_stats_command(&service, year).await?,

            Commands::Years => {
                let years = service.available_years().await?;
                if years.is_empty() {
                    println!("No payments recorded.");
                }
                for year in years {
                    println!("{}", year);
                }
            }

            Commands::Rates(cmd) => run_rates_command(&service, cmd).await?,

            Commands::Debt(cmd) => run_debt_command(&service, cmd).await?,

            Commands::Maintenance(cmd) => run_maintenance_command(&service, cmd).await?,

            Commands::Check => run_check_command(&service).await?,

            Commands::Rebuild => {
                let count = service.rebuild_summaries().await?;
                println!("Rebuilt {} monthly summaries.", count);
            }

            Commands::Export {
                export_type,
                output,
                format,
                year,
            } => {
                run_export_command(
                    &service,
                    &export_type,
                    output.as_deref(),
                    format.as_deref(),
                    year,
                )
                .await?;
            }
        }

        Ok(())
    }
}

async fn run_payment_command(service: &LedgerService, cmd: PaymentCommands) -> Result<()> {
    let home = service.home_currency();

    match cmd {
        PaymentCommands::Add {
            company,
            amount,
            currency,
            date,
            rate,
        } => {
            let new = NewPayment {
                company,
                amount: parse_amount(&amount)?,
                currency: parse_currency_or(currency.as_deref(), service.home_currency())?,
                date: date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today),
                exchange_rate: rate.as_deref().map(parse_exchange_rate).transpose()?,
            };
            let payment = service.add_payment(new).await?;

            println!(
                "Recorded payment: {} {} from {} on {} = {} {} ({})",
                format_cents(payment.amount),
                payment.currency,
                payment.company,
                payment.date,
                format_cents(payment.converted_amount),
                home,
                payment.id
            );
        }

        PaymentCommands::List {
            year,
            month,
            search,
        } => {
            if let Some(month) = month {
                if !(1..=12).contains(&month) {
                    bail!("Month must be between 1 and 12, got {}", month);
                }
            }
            let filter = PaymentFilter {
                year,
                month,
                search,
            };
            let groups = service.payment_groups(&filter).await?;
            if groups.is_empty() {
                println!("No payments found.");
                return Ok(());
            }

            for group in groups {
                println!(
                    "{} {}  ({} payments, {} {})",
                    group.period,
                    group.period.month_name(),
                    group.payments.len(),
                    format_cents(group.total_converted),
                    home
                );
                println!(
                    "  {:<12} {:<24} {:>12} {:<4} {:>9} {:>12}",
                    "DATE", "COMPANY", "AMOUNT", "CUR", "RATE", "CONVERTED"
                );
                println!("  {}", "-".repeat(78));
                for payment in &group.payments {
                    println!(
                        "  {:<12} {:<24} {:>12} {:<4} {:>9} {:>12}",
                        payment.date.to_string(),
                        truncate(&payment.company, 24),
                        format_cents(payment.amount),
                        payment.currency.as_str(),
                        payment.exchange_rate.normalize().to_string(),
                        format_cents(payment.converted_amount)
                    );
                }
                println!();
            }
        }

        PaymentCommands::Show { id } => {
            let payment = service.get_payment(parse_id(&id, "payment")?).await?;
            println!("Payment: {}", payment.id);
            println!("  Company:    {}", payment.company);
            println!("  Date:       {}", payment.date);
            println!(
                "  Amount:     {} {}",
                format_cents(payment.amount),
                payment.currency
            );
            println!("  Rate:       {}", payment.exchange_rate.normalize());
            println!(
                "  Converted:  {} {}",
                format_cents(payment.converted_amount),
                home
            );
            println!(
                "  Recorded:   {}",
                payment.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        PaymentCommands::Edit {
            id,
            company,
            amount,
            currency,
            date,
            rate,
        } => {
            let update = PaymentUpdate {
                company,
                amount: amount.as_deref().map(parse_amount).transpose()?,
                currency: currency.as_deref().map(parse_currency).transpose()?,
                date: date.as_deref().map(parse_date).transpose()?,
                exchange_rate: rate.as_deref().map(parse_exchange_rate).transpose()?,
            };
            let payment = service
                .update_payment(parse_id(&id, "payment")?, update)
                .await?;
            println!(
                "Updated payment: {} {} from {} on {} = {} {}",
                format_cents(payment.amount),
                payment.currency,
                payment.company,
                payment.date,
                format_cents(payment.converted_amount),
                home
            );
        }

        PaymentCommands::Delete { id } => {
            let payment = service.delete_payment(parse_id(&id, "payment")?).await?;
            println!(
                "Deleted payment: {} {} from {} on {}",
                format_cents(payment.amount),
                payment.currency,
                payment.company,
                payment.date
            );
        }
    }
    Ok(())
}

async fn run_summary_command(service: &LedgerService, year: Option<i32>) -> Result<()> {
    let summaries = service.summaries(year).await?;
    if summaries.is_empty() {
        println!("No summaries found.");
        return Ok(());
    }

    let home = service.home_currency();
    println!(
        "{:<8} {:<10} {:>8} {:>14} {:>14}",
        "PERIOD", "MONTH", "PAYMENTS", "INCOME", "YEAR TO DATE"
    );
    println!("{}", "-".repeat(58));
    for summary in &summaries {
        let period = summary.period();
        println!(
            "{:<8} {:<10} {:>8} {:>14} {:>14}",
            period.to_string(),
            period.month_name(),
            summary.payment_count,
            format_cents(summary.total_income),
            format_cents(summary.cumulative_income)
        );
    }
    println!("\nAmounts in {}.", home);
    Ok(())
}

async fn run_tax_command(service: &LedgerService, year: i32) -> Result<()> {
    let report = service.tax_report(year).await?;
    if report.is_empty() {
        println!("No income recorded in {}.", year);
        return Ok(());
    }

    let home = service.home_currency();
    println!(
        "Tax report {} (rate {}%, amounts in {})\n",
        report.year,
        (report.tax_rate * rust_decimal::Decimal::from(100)).normalize(),
        home
    );
    println!(
        "{:<10} {:>14} {:>10} {:>14} {:>12}",
        "MONTH", "INCOME", "TAX", "YEAR TO DATE", "TAX TO DATE"
    );
    println!("{}", "-".repeat(64));
    for month in &report.months {
        println!(
            "{:<10} {:>14} {:>10} {:>14} {:>12}",
            month.period.month_name(),
            format_cents(month.income),
            format_decimal(month.tax),
            format_cents(month.cumulative_income),
            format_decimal(month.cumulative_tax)
        );
    }
    println!("{}", "-".repeat(64));
    println!(
        "{:<10} {:>14} {:>10}",
        "Total",
        format_cents(report.total_income),
        format_decimal(report.total_tax)
    );
    Ok(())
}

async fn run_stats_command(service: &LedgerService, year: Option<i32>) -> Result<()> {
    let stats = service.quick_stats(year).await?;
    let home = service.home_currency();

    match year {
        Some(year) => println!("Statistics for {}\n", year),
        None => println!("Statistics for all years\n"),
    }
    println!("  Payments:   {}", stats.payment_count);
    println!("  Companies:  {}", stats.company_count);
    println!(
        "  Income:     {} {}",
        format_cents(stats.total_converted),
        home
    );
    if !stats.totals_by_currency.is_empty() {
        println!("\n  By currency:");
        for (currency, total) in &stats.totals_by_currency {
            println!(
                "    {:<4} {:>14} {}",
                currency.as_str(),
                format_cents(*total),
                currency.symbol()
            );
        }
    }
    Ok(())
}

async fn run_rates_command(service: &LedgerService, cmd: RatesCommands) -> Result<()> {
    let home = service.home_currency();

    match cmd {
        RatesCommands::Latest => {
            let rates = service.fetch_latest_rates().await?;
            println!("Latest rates ({} per unit):", home);
            for (currency, rate) in rates.iter().filter(|(c, _)| **c != home) {
                println!("  {:<4} {:>10}", currency.as_str(), rate.normalize().to_string());
            }
        }

        RatesCommands::Fetch { date } => {
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today);
            let rates = service.fetch_rates_on(date).await?;
            if rates.is_empty() {
                println!("No rates available for {}.", date);
            } else {
                println!("Rates on {} ({} per unit):", date, home);
                for (currency, rate) in &rates {
                    println!("  {:<4} {:>10}", currency.as_str(), rate.normalize().to_string());
                }
            }
        }

        RatesCommands::Convert { amount, currency } => {
            let conversion = service
                .convert_at_latest(parse_amount(&amount)?, parse_currency(&currency)?)
                .await?;
            println!(
                "{} {} = {:.2} {}",
                format_cents(conversion.amount),
                conversion.currency,
                conversion.converted,
                conversion.home_currency
            );
            println!(
                "Rate: 1 {} = {} {}",
                conversion.currency,
                conversion.rate.normalize(),
                conversion.home_currency
            );
        }

        RatesCommands::History { currency, limit } => {
            let currency = currency.as_deref().map(parse_currency).transpose()?;
            let history = service.rate_history(currency, limit).await?;
            if history.is_empty() {
                println!("No stored rates.");
                return Ok(());
            }
            println!("{:<12} {:<4} {:>10} {:<20}", "DATE", "CUR", "RATE", "FETCHED");
            println!("{}", "-".repeat(50));
            for rate in &history {
                println!(
                    "{:<12} {:<4} {:>10} {:<20}",
                    rate.date.to_string(),
                    rate.currency.as_str(),
                    rate.rate.normalize().to_string(),
                    rate.fetched_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }
    Ok(())
}

async fn run_debt_command(service: &LedgerService, cmd: DebtCommands) -> Result<()> {
    match cmd {
        DebtCommands::Add {
            person,
            amount,
            debt_type,
            currency,
            due,
            notes,
        } => {
            let debt_type = DebtType::from_str(&debt_type).ok_or_else(|| {
                anyhow::anyhow!("Invalid debt type '{}'. Valid types: i-owe, owes-me", debt_type)
            })?;
            let debt = service
                .create_debt(NewDebt {
                    person_name: person,
                    amount: parse_amount(&amount)?,
                    currency: parse_currency_or(currency.as_deref(), service.home_currency())?,
                    debt_type,
                    due_date: due.as_deref().map(parse_date).transpose()?,
                    notes,
                })
                .await?;
            println!(
                "Recorded debt: {} {} {} ({}) ({})",
                debt.person_name,
                format_cents(debt.original_amount),
                debt.currency,
                debt.debt_type,
                debt.id
            );
        }

        DebtCommands::List { filter, search } => {
            let filter = DebtFilter::from_str(&filter).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid filter '{}'. Valid filters: all, i-owe, owes-me, active, paid",
                    filter
                )
            })?;
            let debts = service.list_debts(filter, search.as_deref()).await?;
            if debts.is_empty() {
                println!("No debts found.");
            } else {
                let today = today();
                println!(
                    "{:<36} {:<20} {:<8} {:>12} {:>12} {:<15} DUE",
                    "ID", "PERSON", "TYPE", "REMAINING", "ORIGINAL", "STATUS"
                );
                println!("{}", "-".repeat(120));
                for debt in &debts {
                    let due = match debt.due_date {
                        Some(date) if debt.is_past_due(today) => format!("{} (past due)", date),
                        Some(date) => date.to_string(),
                        None => String::new(),
                    };
                    println!(
                        "{:<36} {:<20} {:<8} {:>12} {:>12} {:<15} {}",
                        debt.id.to_string(),
                        truncate(&debt.person_name, 20),
                        debt.debt_type.label(),
                        format!(
                            "{} {}",
                            format_cents(debt.remaining_amount),
                            debt.currency.symbol()
                        ),
                        format!(
                            "{} {}",
                            format_cents(debt.original_amount),
                            debt.currency.symbol()
                        ),
                        debt.status.to_string(),
                        due
                    );
                }
            }

            let totals = service.debt_totals().await?;
            println!();
            print_totals("I owe", &totals.i_owe);
            print_totals("Owed to me", &totals.owes_me);
        }

        DebtCommands::Show { id } => {
            let details = service.debt_details(parse_id(&id, "debt")?).await?;
            let debt = &details.debt;

            println!("Debt: {}", debt.id);
            println!("  Person:     {}", debt.person_name);
            println!("  Type:       {}", debt.debt_type);
            println!("  Status:     {}", debt.status);
            println!(
                "  Original:   {} {}",
                format_cents(debt.original_amount),
                debt.currency
            );
            println!(
                "  Remaining:  {} {}",
                format_cents(debt.remaining_amount),
                debt.currency
            );
            println!("  Progress:   {:.0}%", debt.payment_progress() * 100.0);
            if let Some(due) = debt.due_date {
                let flag = if debt.is_past_due(today()) {
                    " (past due)"
                } else {
                    ""
                };
                println!("  Due:        {}{}", due, flag);
            }
            if let Some(notes) = &debt.notes {
                println!("  Notes:      {}", notes);
            }
            println!(
                "  Created:    {}",
                debt.created_at.format("%Y-%m-%d %H:%M:%S")
            );

            if !details.payments.is_empty() {
                println!("\n  Payments:");
                for payment in &details.payments {
                    println!(
                        "    - {} on {}{}",
                        format_cents(payment.amount),
                        payment.date,
                        payment
                            .notes
                            .as_deref()
                            .map(|n| format!(" ({})", n))
                            .unwrap_or_default()
                    );
                }
            }
        }

        DebtCommands::Pay {
            id,
            amount,
            date,
            notes,
        } => {
            let debt = service
                .record_debt_payment(
                    parse_id(&id, "debt")?,
                    parse_amount(&amount)?,
                    date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today),
                    notes,
                )
                .await?;
            println!(
                "Recorded payment for {}: {} {} remaining ({})",
                debt.person_name,
                format_cents(debt.remaining_amount),
                debt.currency,
                debt.status
            );
        }

        DebtCommands::Delete { id } => {
            service.delete_debt(parse_id(&id, "debt")?).await?;
            println!("Deleted debt: {}", id);
        }
    }
    Ok(())
}

fn print_totals(label: &str, totals: &BTreeMap<Currency, Cents>) {
    if totals.is_empty() {
        println!("{:<12} -", format!("{}:", label));
        return;
    }
    let parts: Vec<String> = totals
        .iter()
        .map(|(currency, total)| format!("{} {}", format_cents(*total), currency.symbol()))
        .collect();
    println!("{:<12} {}", format!("{}:", label), parts.join(", "));
}

async fn run_maintenance_command(service: &LedgerService, cmd: MaintenanceCommands) -> Result<()> {
    match cmd {
        MaintenanceCommands::Add {
            mileage,
            cost,
            maintenance_type,
            currency,
            date,
            notes,
            next_mileage,
            next_date,
        } => {
            let kind = MaintenanceType::from_str(&maintenance_type).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid maintenance type '{}'. Valid types: oil-change, inspection, tires, brakes, filters, other",
                    maintenance_type
                )
            })?;
            let record = service
                .add_maintenance(NewMaintenance {
                    date: date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today),
                    mileage,
                    maintenance_type: kind,
                    cost: parse_amount(&cost)?,
                    currency: parse_currency_or(currency.as_deref(), service.home_currency())?,
                    notes,
                    next_service_mileage: next_mileage,
                    next_service_date: next_date.as_deref().map(parse_date).transpose()?,
                })
                .await?;
            println!(
                "Logged {} at {} km: {} {} ({})",
                record.maintenance_type,
                record.mileage,
                format_cents(record.cost),
                record.currency,
                record.id
            );
        }

        MaintenanceCommands::List => {
            let records = service.list_maintenance().await?;
            if records.is_empty() {
                println!("No maintenance records found.");
                return Ok(());
            }
            println!(
                "{:<36} {:<12} {:>9} {:<12} {:>12} NEXT",
                "ID", "DATE", "KM", "TYPE", "COST"
            );
            println!("{}", "-".repeat(100));
            for record in &records {
                let next = match (record.next_service_mileage, record.next_service_date) {
                    (Some(km), Some(date)) => format!("{} km / {}", km, date),
                    (Some(km), None) => format!("{} km", km),
                    (None, Some(date)) => date.to_string(),
                    (None, None) => String::new(),
                };
                println!(
                    "{:<36} {:<12} {:>9} {:<12} {:>12} {}",
                    record.id.to_string(),
                    record.date.to_string(),
                    record.mileage,
                    record.maintenance_type.to_string(),
                    format!("{} {}", format_cents(record.cost), record.currency.symbol()),
                    next
                );
            }
        }

        MaintenanceCommands::Delete { id } => {
            service
                .delete_maintenance(parse_id(&id, "maintenance record")?)
                .await?;
            println!("Deleted maintenance record: {}", id);
        }

        MaintenanceCommands::Upcoming { mileage } => {
            let upcoming = service.upcoming_services(mileage, today()).await?;
            if upcoming.is_empty() {
                println!("No services planned.");
                return Ok(());
            }
            println!(
                "{:<12} {:>10} {:<12} {:<10} LAST DONE",
                "TYPE", "NEXT KM", "NEXT DATE", "STATUS"
            );
            println!("{}", "-".repeat(64));
            for item in &upcoming {
                let record = &item.record;
                println!(
                    "{:<12} {:>10} {:<12} {:<10} {} at {} km",
                    record.maintenance_type.to_string(),
                    record
                        .next_service_mileage
                        .map(|km| km.to_string())
                        .unwrap_or_default(),
                    record
                        .next_service_date
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    item.status.to_string(),
                    record.date,
                    record.mileage
                );
            }
        }

        MaintenanceCommands::Stats { year } => {
            let stats = service.maintenance_stats(year).await?;
            let home = service.home_currency();

            println!("Maintenance costs ({}, estimated)\n", home);
            println!("  Records:     {}", stats.record_count);
            println!("  Total:       {}", format_decimal(stats.total_cost));
            if let Some(km) = stats.last_mileage {
                println!("  Last km:     {}", km);
            }
            println!("\n  {}: {}", stats.year, format_decimal(stats.year_cost));
            for (kind, cost) in &stats.cost_by_type {
                println!("    {:<12} {:>10}", kind.to_string(), format_decimal(*cost));
            }
            if !stats.cost_by_month.is_empty() {
                println!("\n  By month:");
                for (month, cost) in &stats.cost_by_month {
                    let period = crate::domain::Period::new(stats.year, *month);
                    println!("    {:<12} {:>10}", period.month_name(), format_decimal(*cost));
                }
            }
            if stats.available_years.len() > 1 {
                let years: Vec<String> =
                    stats.available_years.iter().map(|y| y.to_string()).collect();
                println!("\n  Years with records: {}", years.join(", "));
            }
        }
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking monthly summaries...\n");

    let check = service.check_summaries().await?;

    println!("Payments:  {}", check.payment_count);
    println!("Summaries: {}", check.summary_count);
    println!();

    if check.is_healthy() {
        println!("Summaries are consistent.");
    } else {
        println!("Issues found:");
        for issue in &check.issues {
            println!("  - {}", issue);
        }
        println!("\nRun `taxbook rebuild` to derive the summaries again from the payments.");
        bail!("Summary check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
    year: Option<i32>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let json = match (export_type, format) {
        (_, Some("json")) => true,
        (_, Some("csv")) => false,
        ("full", None) => true,
        (_, None) => false,
        (_, Some(other)) => bail!("Invalid format '{}'. Valid formats: csv, json", other),
    };
    if export_type == "full" && !json {
        bail!("Full export is only available as JSON");
    }

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let filter = PaymentFilter {
        year,
        ..PaymentFilter::default()
    };

    match export_type {
        "payments" => {
            let count = if json {
                exporter.export_payments_json(writer, &filter).await?
            } else {
                exporter.export_payments_csv(writer, &filter).await?
            };
            if output.is_some() {
                eprintln!("Exported {} payments", count);
            }
        }
        "summaries" => {
            let count = if json {
                exporter.export_summaries_json(writer, year).await?
            } else {
                exporter.export_summaries_csv(writer, year).await?
            };
            if output.is_some() {
                eprintln!("Exported {} summaries", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} payments, {} summaries, {} rates, {} debts, {} maintenance records",
                    snapshot.payments.len(),
                    snapshot.summaries.len(),
                    snapshot.exchange_rates.len(),
                    snapshot.debts.len(),
                    snapshot.maintenance.len()
                );
            }
        }
        _ => {
            bail!(
                "Invalid export type '{}'. Valid types: payments, summaries, full",
                export_type
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn current_year() -> i32 {
    today().year()
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

fn parse_amount(amount: &str) -> Result<Cents> {
    parse_cents(amount)
        .with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", amount))
}

fn parse_exchange_rate(rate: &str) -> Result<rust_decimal::Decimal> {
    parse_rate(rate).with_context(|| format!("Invalid exchange rate '{}'", rate))
}

fn parse_currency(code: &str) -> Result<Currency> {
    Currency::from_str(code).ok_or_else(|| {
        let valid: Vec<&str> = Currency::ALL.iter().map(|c| c.as_str()).collect();
        anyhow::anyhow!("Unknown currency '{}'. Valid currencies: {}", code, valid.join(", "))
    })
}

fn parse_currency_or(code: Option<&str>, default: Currency) -> Result<Currency> {
    code.map(parse_currency).transpose().map(|c| c.unwrap_or(default))
}

fn parse_id(id: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid {} ID format (expected UUID)", what))
}
