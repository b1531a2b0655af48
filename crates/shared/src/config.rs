//! Application configuration management.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::types::money::{CurrencyCode, MonetaryCurrency, MoneyError};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration, absent when running against the in-memory store.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Loan servicing rules.
    #[serde(default)]
    pub servicing: ServicingConfig,
    /// Currencies known to the engine.
    #[serde(default = "default_currencies")]
    pub currencies: Vec<CurrencyConfig>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Rules applied when posting loan transactions.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicingConfig {
    /// Accept transactions dated on a holiday.
    #[serde(default)]
    pub allow_transactions_on_holiday: bool,
    /// Accept transactions dated on a non-working day.
    #[serde(default)]
    pub allow_transactions_on_non_working_day: bool,
    /// Working days as an RRULE `BYDAY` list, e.g. `MO,TU,WE,TH,FR`.
    #[serde(default = "default_working_days")]
    pub working_days: String,
    /// Fixed business date; the system date is used when absent.
    #[serde(default)]
    pub business_date: Option<NaiveDate>,
}

impl Default for ServicingConfig {
    fn default() -> Self {
        Self {
            allow_transactions_on_holiday: false,
            allow_transactions_on_non_working_day: false,
            working_days: default_working_days(),
            business_date: None,
        }
    }
}

fn default_working_days() -> String {
    "MO,TU,WE,TH,FR".to_string()
}

/// A configured currency.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyConfig {
    /// ISO code.
    pub code: String,
    /// Digits after the decimal point.
    pub decimal_places: u32,
}

impl CurrencyConfig {
    /// Builds the monetary currency.
    pub fn to_currency(&self) -> Result<MonetaryCurrency, MoneyError> {
        Ok(MonetaryCurrency::new(
            CurrencyCode::new(&self.code)?,
            self.decimal_places,
        ))
    }
}

fn default_currencies() -> Vec<CurrencyConfig> {
    [("USD", 2), ("EUR", 2), ("JPY", 0)]
        .into_iter()
        .map(|(code, decimal_places)| CurrencyConfig {
            code: code.to_string(),
            decimal_places,
        })
        .collect()
}

impl AppConfig {
    /// Loads configuration from config files and the environment.
    ///
    /// Sources, later overriding earlier: `config/default`, `config/{RUN_MODE}`,
    /// then `LOANBOOK__*` variables (e.g. `LOANBOOK__SERVICING__BUSINESS_DATE`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LOANBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Looks up a configured currency by code.
    pub fn currency(&self, code: &str) -> Result<MonetaryCurrency, MoneyError> {
        let wanted = CurrencyCode::new(code)?;
        self.currencies
            .iter()
            .map(CurrencyConfig::to_currency)
            .find(|currency| currency.as_ref().is_ok_and(|c| c.code == wanted))
            .unwrap_or_else(|| Err(MoneyError::InvalidCurrencyCode(code.to_string())))
    }
}
