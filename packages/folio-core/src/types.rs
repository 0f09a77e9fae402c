//! Core data types for the folio analytics pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cleaned daily OHLCV row for a single ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    /// Trading date
    pub date: NaiveDate,
    /// Ticker symbol (uppercase)
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceRecord {
    /// Create a record where only the close matters (open/high/low mirror it).
    pub fn close_only(ticker: &str, date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            ticker: ticker.to_uppercase(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// A position in the holdings ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    /// Ticker symbol (uppercase)
    pub ticker: String,
    /// Company or fund name
    pub asset_name: String,
    /// Categorical grouping, e.g. "Equity" or "ETF"
    pub asset_class: String,
    /// Number of shares owned
    pub shares: f64,
    /// Price paid per share
    pub purchase_price: f64,
    /// Date the position was opened
    pub purchase_date: NaiveDate,
}

impl Holding {
    /// Create a new holding. The ticker is normalized to uppercase.
    pub fn new(
        ticker: &str,
        asset_name: &str,
        asset_class: &str,
        shares: f64,
        purchase_price: f64,
        purchase_date: NaiveDate,
    ) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            asset_name: asset_name.to_string(),
            asset_class: asset_class.to_string(),
            shares,
            purchase_price,
            purchase_date,
        }
    }

    /// Total amount originally paid for the position.
    pub fn cost_basis(&self) -> f64 {
        self.shares * self.purchase_price
    }

    /// Whether the position was already owned on `date`.
    pub fn is_held_on(&self, date: NaiveDate) -> bool {
        self.purchase_date <= date
    }

    /// Value the holding at `current_price`, observed on `price_date`.
    pub fn snapshot(
        &self,
        current_price: f64,
        price_date: NaiveDate,
        valuation_date: NaiveDate,
    ) -> PositionSnapshot {
        let cost_basis = self.cost_basis();
        let current_value = self.shares * current_price;
        let unrealized_gain = current_value - cost_basis;
        let unrealized_gain_pct = if cost_basis > 0.0 {
            (unrealized_gain / cost_basis) * 100.0
        } else {
            0.0
        };

        PositionSnapshot {
            ticker: self.ticker.clone(),
            asset_name: self.asset_name.clone(),
            asset_class: self.asset_class.clone(),
            shares: self.shares,
            purchase_date: self.purchase_date,
            purchase_price: self.purchase_price,
            current_price,
            price_date,
            cost_basis,
            current_value,
            unrealized_gain,
            unrealized_gain_pct,
            days_held: (valuation_date - self.purchase_date).num_days(),
        }
    }
}

/// Point-in-time valuation of one holding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionSnapshot {
    pub ticker: String,
    pub asset_name: String,
    pub asset_class: String,
    pub shares: f64,
    pub purchase_date: NaiveDate,
    pub purchase_price: f64,
    /// Close used for the valuation
    pub current_price: f64,
    /// Date of that close; earlier than the valuation date when stale
    pub price_date: NaiveDate,
    /// shares * purchase_price
    pub cost_basis: f64,
    /// shares * current_price
    pub current_value: f64,
    /// current_value - cost_basis
    pub unrealized_gain: f64,
    /// unrealized_gain / cost_basis * 100
    pub unrealized_gain_pct: f64,
    /// Calendar days between purchase and valuation date
    pub days_held: i64,
}

/// Aggregate totals across all positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    /// Latest date present in the price history
    pub valuation_date: NaiveDate,
    pub position_count: usize,
    pub total_cost_basis: f64,
    pub total_current_value: f64,
    pub total_unrealized_gain: f64,
    /// Absent when the total cost basis is zero
    pub total_return_pct: Option<f64>,
}

/// Allocation and performance of one asset class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetClassAllocation {
    pub asset_class: String,
    pub position_count: usize,
    pub cost_basis: f64,
    pub current_value: f64,
    pub unrealized_gain: f64,
    /// Share of total portfolio value in percent
    pub weight_pct: Option<f64>,
    /// unrealized_gain / cost_basis * 100
    pub return_pct: Option<f64>,
}

/// Total portfolio value on one trading date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PortfolioValuePoint {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    /// Purchased positions with a close on this date
    pub positions_priced: usize,
    /// Purchased positions without a close on this date (contributed 0)
    pub positions_missing: usize,
}

/// A value point with its derived return and drawdown columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    /// Absent for the first retained point
    pub daily_return: Option<f64>,
    /// Percent change from the first retained point
    pub cumulative_return: f64,
    /// Running maximum of portfolio_value
    pub peak: f64,
    /// Percent below the running peak (always <= 0)
    pub drawdown: f64,
    pub positions_priced: usize,
    pub positions_missing: usize,
}

impl SeriesRow {
    /// Whether any purchased position lacked a price on this date.
    pub fn is_partial(&self) -> bool {
        self.positions_missing > 0
    }
}

/// Portfolio-level risk and performance statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Number of series points used
    pub observations: usize,
    /// Percent
    pub total_return: f64,
    /// Percent, compounded over calendar days; absent when it overflows
    pub annualized_return: Option<f64>,
    /// Annualized percent; absent when fewer than two daily returns exist
    pub volatility: Option<f64>,
    /// Absent when volatility is zero or absent, or the return is absent
    pub sharpe_ratio: Option<f64>,
    /// Percent (most negative drawdown)
    pub max_drawdown: f64,
    /// 5th percentile daily return, percent
    pub var_95: f64,
    pub best_daily_return: f64,
    pub worst_daily_return: f64,
}

/// Volatility and drawdown of a single ticker's own close series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerRisk {
    pub ticker: String,
    pub asset_name: String,
    pub observations: usize,
    pub volatility: Option<f64>,
    pub max_drawdown: f64,
}

/// Degraded-data condition that does not abort the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    /// Ticker's newest close predates the valuation date.
    StalePrice {
        ticker: String,
        last_date: NaiveDate,
        valuation_date: NaiveDate,
    },
    /// Ticker had no close on dates where it was already held.
    PartialCoverage {
        ticker: String,
        dates: Vec<NaiveDate>,
    },
    /// A ratio was left empty because its denominator was zero.
    DivisionByZero { metric: String, subject: String },
    /// A metric overflowed to a non-finite value and was left empty.
    NonFinite { metric: String, subject: String },
}

impl DataWarning {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DataWarning::StalePrice { .. } => "stale_price",
            DataWarning::PartialCoverage { .. } => "partial_coverage",
            DataWarning::DivisionByZero { .. } => "division_by_zero",
            DataWarning::NonFinite { .. } => "non_finite",
        }
    }

    /// Ticker the warning refers to, if any.
    pub fn ticker(&self) -> Option<&str> {
        match self {
            DataWarning::StalePrice { ticker, .. } | DataWarning::PartialCoverage { ticker, .. } => {
                Some(ticker)
            }
            DataWarning::DivisionByZero { .. } | DataWarning::NonFinite { .. } => None,
        }
    }
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::StalePrice {
                ticker,
                last_date,
                valuation_date,
            } => write!(
                f,
                "{ticker}: last close on {last_date}, valuation date is {valuation_date}"
            ),
            DataWarning::PartialCoverage { ticker, dates } => {
                let first = dates.first().map(|d| d.to_string()).unwrap_or_default();
                let last = dates.last().map(|d| d.to_string()).unwrap_or_default();
                write!(
                    f,
                    "{ticker}: no close on {} held date(s) between {first} and {last}",
                    dates.len()
                )
            }
            DataWarning::DivisionByZero { metric, subject } => {
                write!(f, "{metric} undefined for {subject}: zero denominator")
            }
            DataWarning::NonFinite { metric, subject } => {
                write!(f, "{metric} undefined for {subject}: value is not finite")
            }
        }
    }
}

/// API response wrapper used for CLI JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_holding_new() {
        let holding = Holding::new("aapl", "Apple Inc.", "Equity", 10.0, 150.0, date(2023, 1, 3));
        assert_eq!(holding.ticker, "AAPL");
        assert_eq!(holding.cost_basis(), 1500.0);
        assert!(holding.is_held_on(date(2023, 1, 3)));
        assert!(!holding.is_held_on(date(2023, 1, 2)));
    }

    #[test]
    fn test_holding_snapshot() {
        let holding = Holding::new("AAPL", "Apple Inc.", "Equity", 10.0, 100.0, date(2023, 1, 1));
        let snap = holding.snapshot(150.0, date(2023, 6, 1), date(2023, 6, 1));

        assert_eq!(snap.cost_basis, 1000.0);
        assert_eq!(snap.current_value, 1500.0);
        assert_eq!(snap.unrealized_gain, 500.0);
        assert_eq!(snap.unrealized_gain_pct, 50.0);
        assert_eq!(snap.days_held, 151);
    }

    #[test]
    fn test_warning_display_names_ticker() {
        let warning = DataWarning::StalePrice {
            ticker: "MSFT".to_string(),
            last_date: date(2024, 3, 1),
            valuation_date: date(2024, 3, 4),
        };
        assert_eq!(warning.kind(), "stale_price");
        assert_eq!(warning.ticker(), Some("MSFT"));
        assert!(warning.to_string().contains("2024-03-01"));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = DataWarning::DivisionByZero {
            metric: "sharpe_ratio".to_string(),
            subject: "portfolio".to_string(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "division_by_zero");
        assert_eq!(json["metric"], "sharpe_ratio");
    }

    #[test]
    fn test_api_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test".to_string());
        assert!(response.ok);
        assert_eq!(response.data, Some("test".to_string()));

        let err_response: ApiResponse<String> = ApiResponse::err("error");
        assert!(!err_response.ok);
        assert_eq!(err_response.error, Some("error".to_string()));
    }
}
