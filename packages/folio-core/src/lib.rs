//! Folio Core - Portfolio valuation, performance and risk analytics.
//!
//! This crate turns a static holdings list and a daily price history into
//! flat, BI-ready tables:
//!
//! - **Price history**: per-ticker OHLCV records keyed by (ticker, date)
//! - **Holdings ledger**: positions with purchase price, date and asset class
//! - **Valuation**: cost basis, market value and unrealized gain per position
//! - **Time series**: daily portfolio value, returns, running peak and drawdown
//! - **Risk**: volatility, Sharpe ratio, max drawdown, historical VaR
//! - **Report**: CSV tables written atomically for dashboard tools
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::{io, pipeline, AnalyticsConfig};
//!
//! let holdings = io::read_holdings("portfolio_holdings.csv")?;
//! let prices = io::read_prices("market_data_clean.csv")?;
//!
//! let report = pipeline::run(&AnalyticsConfig::default(), &holdings, &prices)?;
//! println!("Sharpe: {:?}", report.risk.sharpe_ratio);
//! # Ok::<(), folio_core::Error>(())
//! ```

pub mod config;
pub mod holdings;
pub mod io;
pub mod market;
pub mod pipeline;
pub mod portfolio;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use config::{AnalyticsConfig, StalePricePolicy};
pub use holdings::HoldingsLedger;
pub use market::PriceHistory;
pub use pipeline::AnalyticsReport;
pub use types::{
    ApiResponse, AssetClassAllocation, DataWarning, Holding, PortfolioSummary,
    PortfolioValuePoint, PositionSnapshot, PriceRecord, RiskSummary, SeriesRow, TickerRisk,
};

// Re-export main functionality
pub use portfolio::{
    max_drawdown, percentile, reconstruct_series, risk_summary, sample_std_dev, sharpe_ratio,
    ticker_risk, value_holdings, volatility, Valuation,
};

use chrono::NaiveDate;

/// Error types for folio-core operations.
///
/// Every variant aborts the run; degraded-data conditions that still allow a
/// result are reported as [`DataWarning`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("No price data for held ticker {ticker}")]
    MissingPrice { ticker: String },

    #[error("Stale price for {ticker}: last close on {last_date}, valuation date is {valuation_date}")]
    StalePrice {
        ticker: String,
        last_date: NaiveDate,
        valuation_date: NaiveDate,
    },

    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("Duplicate price row for {ticker} on {date}")]
    DuplicatePrice { ticker: String, date: NaiveDate },

    #[error("Invalid holding {ticker}: {reason}")]
    InvalidHolding { ticker: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for folio-core operations.
pub type Result<T> = std::result::Result<T, Error>;
