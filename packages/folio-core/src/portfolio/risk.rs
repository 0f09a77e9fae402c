//! Portfolio risk metrics calculation.
//!
//! Provides volatility, Sharpe ratio, max drawdown and historical VaR, for the
//! reconstructed portfolio series as well as for each ticker's own closes.

use super::performance::{annualize_return, daily_returns, holding_period_return, running_drawdown};
use super::timeseries::PortfolioSeries;
use super::valuation::{division_warning, non_finite_warning};
use crate::config::AnalyticsConfig;
use crate::holdings::HoldingsLedger;
use crate::market::PriceHistory;
use crate::types::{DataWarning, RiskSummary, TickerRisk};
use crate::{Error, Result};

/// Calendar days per year used to annualize total return.
const DAYS_PER_YEAR: u32 = 365;

/// Calculate the risk summary of a reconstructed portfolio series.
///
/// # Errors
///
/// Returns [`Error::InsufficientHistory`] when the series has fewer than two
/// points or spans zero calendar days.
///
/// # Returns
///
/// The summary plus a warning for every ratio left empty because its
/// denominator was zero.
pub fn risk_summary(
    series: &PortfolioSeries,
    config: &AnalyticsConfig,
) -> Result<(RiskSummary, Vec<DataWarning>)> {
    let (first, last) = match (series.rows.first(), series.rows.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => (first, last),
        _ => {
            return Err(Error::InsufficientHistory(format!(
                "need at least 2 portfolio value points, got {}",
                series.len()
            )))
        }
    };

    let days_span = (last.date - first.date).num_days();
    if days_span <= 0 {
        return Err(Error::InsufficientHistory(format!(
            "series from {} to {} spans no calendar days",
            first.date, last.date
        )));
    }

    let returns = series.daily_returns();
    let mut warnings = Vec::new();

    let total_return = holding_period_return(first.portfolio_value, last.portfolio_value);
    let annualized_return = annualize_return(total_return, days_span, DAYS_PER_YEAR);
    if annualized_return.is_none() {
        warnings.push(non_finite_warning("annualized_return", "portfolio"));
    }

    let volatility = volatility(&returns, config.trading_days_per_year);
    if volatility.is_none() {
        warnings.push(division_warning("volatility", "portfolio"));
    }

    let sharpe_ratio = match (annualized_return, volatility) {
        (Some(ann), Some(vol)) => {
            let sharpe = sharpe_ratio(ann, vol, config.risk_free_rate);
            if sharpe.is_none() && vol == 0.0 {
                warnings.push(division_warning("sharpe_ratio", "portfolio"));
            } else if sharpe.is_none() {
                warnings.push(non_finite_warning("sharpe_ratio", "portfolio"));
            }
            sharpe
        }
        (None, _) => {
            warnings.push(non_finite_warning("sharpe_ratio", "portfolio"));
            None
        }
        (Some(_), None) => {
            warnings.push(division_warning("sharpe_ratio", "portfolio"));
            None
        }
    };

    let max_drawdown = series
        .rows
        .iter()
        .map(|r| r.drawdown)
        .fold(0.0_f64, f64::min);

    // At least one return exists because the series has two or more points.
    let var_95 = value_at_risk(&returns, config.var_tail()).unwrap_or(0.0);
    let best_daily_return = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max) * 100.0;
    let worst_daily_return = returns.iter().copied().fold(f64::INFINITY, f64::min) * 100.0;

    let summary = RiskSummary {
        start_date: first.date,
        end_date: last.date,
        observations: series.len(),
        total_return,
        annualized_return,
        volatility,
        sharpe_ratio,
        max_drawdown,
        var_95,
        best_daily_return,
        worst_daily_return,
    };

    tracing::info!(
        total_return = summary.total_return,
        volatility = ?summary.volatility,
        sharpe = ?summary.sharpe_ratio,
        "Calculated portfolio risk"
    );

    Ok((summary, warnings))
}

/// Volatility and max drawdown of each held ticker's own close series.
///
/// One row per distinct ticker in ledger order. Tickers are not aligned on
/// common dates; each uses every close it has.
pub fn ticker_risk(
    ledger: &HoldingsLedger,
    prices: &PriceHistory,
    config: &AnalyticsConfig,
) -> (Vec<TickerRisk>, Vec<DataWarning>) {
    let mut warnings = Vec::new();

    let rows = ledger
        .tickers()
        .into_iter()
        .map(|ticker| {
            let closes = prices.closes(ticker);
            let returns = daily_returns(&closes);

            let volatility = volatility(&returns, config.trading_days_per_year);
            if volatility.is_none() {
                warnings.push(division_warning("volatility", ticker));
            }

            TickerRisk {
                ticker: ticker.to_string(),
                asset_name: ledger
                    .find(ticker)
                    .map(|h| h.asset_name.clone())
                    .unwrap_or_default(),
                observations: closes.len(),
                volatility,
                max_drawdown: max_drawdown(&closes),
            }
        })
        .collect();

    (rows, warnings)
}

/// Sample standard deviation (N - 1 denominator).
///
/// Returns `None` for fewer than two observations.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Some(variance.sqrt())
}

/// Calculate annualized volatility in percent from daily returns.
pub fn volatility(returns: &[f64], periods_per_year: u32) -> Option<f64> {
    sample_std_dev(returns).map(|std| std * (periods_per_year as f64).sqrt() * 100.0)
}

/// Calculate the Sharpe ratio from an annualized return and volatility, both
/// in percent, and an annual risk-free rate as a decimal.
///
/// Returns `None` when volatility is zero or the ratio is not finite.
pub fn sharpe_ratio(
    annualized_return_pct: f64,
    volatility_pct: f64,
    risk_free_rate: f64,
) -> Option<f64> {
    if volatility_pct == 0.0 {
        return None;
    }
    let sharpe = (annualized_return_pct / 100.0 - risk_free_rate) / (volatility_pct / 100.0);
    sharpe.is_finite().then_some(sharpe)
}

/// Calculate maximum drawdown in percent from a value series.
///
/// Returns the most negative drawdown from the running peak (0.0 when the
/// series never declines).
pub fn max_drawdown(values: &[f64]) -> f64 {
    running_drawdown(values)
        .into_iter()
        .map(|(_, dd)| dd)
        .fold(0.0, f64::min)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is a fraction in [0, 1]. The rank is `p * (n - 1)` over the ascending
/// sample, matching NumPy's default `linear` method.
pub fn percentile(sample: &[f64], p: f64) -> Option<f64> {
    if sample.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Historical Value at Risk: the `tail` percentile of daily returns, in
/// percent (e.g. `tail = 0.05` for 95% confidence).
pub fn value_at_risk(returns: &[f64], tail: f64) -> Option<f64> {
    percentile(returns, tail).map(|r| r * 100.0)
}
