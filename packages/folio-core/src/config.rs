//! Analytics configuration loaded from TOML.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when a held ticker's newest close predates the valuation date.
///
/// `Warn` substitutes the older close, which trades the fail-loudly rule for
/// stale prices for a complete report; the substitution is always surfaced
/// through `price_date` and a [`DataWarning::StalePrice`](crate::DataWarning).
/// Use `Fail` to refuse stale values outright.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StalePricePolicy {
    /// Value the position at its newest close and report a warning.
    #[default]
    Warn,
    /// Abort the run.
    Fail,
}

/// Tunable constants for valuation and risk calculations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Annual risk-free rate used by the Sharpe ratio (0.04 = 4%)
    pub risk_free_rate: f64,
    /// Periods used to annualize daily volatility
    pub trading_days_per_year: u32,
    /// Confidence level for historical VaR (0.95 = 5th percentile)
    pub var_confidence: f64,
    /// Number of rows in top/bottom rankings
    pub ranking_size: usize,
    pub stale_price_policy: StalePricePolicy,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.04,
            trading_days_per_year: 252,
            var_confidence: 0.95,
            ranking_size: 5,
            stale_price_policy: StalePricePolicy::Warn,
        }
    }
}

impl AnalyticsConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.folio/config.toml`
    /// Can be overridden with `FOLIO_CONFIG_FILE` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FOLIO_CONFIG_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".folio/config.toml"))
            .unwrap_or_else(|| PathBuf::from("folio.toml"))
    }

    /// Load from the default path, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load from a specific path. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the calculations meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidConfig(
                "risk_free_rate must be a finite number".to_string(),
            ));
        }
        if self.trading_days_per_year == 0 {
            return Err(Error::InvalidConfig(
                "trading_days_per_year must be positive".to_string(),
            ));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "var_confidence must be in (0, 1), got {}",
                self.var_confidence
            )));
        }
        Ok(())
    }

    /// Lower-tail probability used for VaR (0.05 for 95% confidence).
    pub fn var_tail(&self) -> f64 {
        1.0 - self.var_confidence
    }
}
