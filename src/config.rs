//! Configuration file handling.
//!
//! Settings live in a JSON file, `taxbook.json` next to the database by default. Every field
//! is optional; a missing file means all defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CostEstimator, Currency, ServiceThresholds};
use crate::rates::NBG_BASE_URL;

pub const CONFIG_FILE_NAME: &str = "taxbook.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Currency all income is normalized to
    pub home_currency: Currency,
    /// Flat tax rate applied to converted monthly income, e.g. 0.01 for 1%
    pub tax_rate: Decimal,
    pub rates: RateSourceConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub due_soon_km: i64,
    pub due_soon_days: i64,
    /// Fixed home-currency estimates used for maintenance cost statistics
    pub estimate_rates: BTreeMap<Currency, Decimal>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_currency: Currency::Gel,
            tax_rate: Decimal::new(1, 2),
            rates: RateSourceConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

impl Default for RateSourceConfig {
    fn default() -> Self {
        Self {
            base_url: NBG_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            due_soon_km: 1000,
            due_soon_days: 30,
            estimate_rates: BTreeMap::from([
                (Currency::Eur, Decimal::new(30, 1)),
                (Currency::Usd, Decimal::new(28, 1)),
                (Currency::Byn, Decimal::new(85, 2)),
            ]),
        }
    }
}

impl Config {
    /// Load the config from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!("No config file at '{}', using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file '{}'", path.display()))?;
        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Unable to parse config file '{}'", path.display()))?;
        config.validate()?;
        debug!("Loaded config from '{}'", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        std::fs::write(path, data)
            .with_context(|| format!("Unable to write config file '{}'", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            bail!("tax_rate must be between 0 and 1, got {}", self.tax_rate);
        }
        if self.rates.timeout_secs == 0 {
            bail!("rates.timeout_secs must be greater than 0");
        }
        if self.maintenance.due_soon_km < 0 || self.maintenance.due_soon_days < 0 {
            bail!("maintenance thresholds must not be negative");
        }
        if let Some((currency, rate)) = self
            .maintenance
            .estimate_rates
            .iter()
            .find(|(_, rate)| **rate <= Decimal::ZERO)
        {
            bail!("maintenance estimate rate for {} must be positive, got {}", currency, rate);
        }
        Ok(())
    }

    /// The default config path for a database file: `taxbook.json` in the same directory.
    pub fn default_path_for(database: &Path) -> PathBuf {
        database
            .parent()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    pub fn rate_timeout(&self) -> Duration {
        Duration::from_secs(self.rates.timeout_secs)
    }

    pub fn service_thresholds(&self) -> ServiceThresholds {
        ServiceThresholds {
            due_soon_km: self.maintenance.due_soon_km,
            due_soon_days: self.maintenance.due_soon_days,
        }
    }

    pub fn cost_estimator(&self) -> CostEstimator {
        CostEstimator {
            home_currency: self.home_currency,
            rates: self.maintenance.estimate_rates.clone(),
        }
    }
}
