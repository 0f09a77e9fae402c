//! Portfolio analytics module.
//!
//! Provides point-in-time valuation, daily series reconstruction, and risk
//! metrics.

mod performance;
mod risk;
mod timeseries;
mod valuation;

pub use performance::{
    annualize_return, cumulative_returns, daily_returns, holding_period_return, running_drawdown,
};
pub use risk::{
    max_drawdown, percentile, risk_summary, sample_std_dev, sharpe_ratio, ticker_risk,
    value_at_risk, volatility,
};
pub use timeseries::{portfolio_values, reconstruct_series, PortfolioSeries};
pub use valuation::{value_holdings, Valuation};
