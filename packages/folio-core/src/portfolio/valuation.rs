//! Point-in-time valuation of the holdings ledger.

use crate::config::StalePricePolicy;
use crate::holdings::HoldingsLedger;
use crate::market::PriceHistory;
use crate::types::{AssetClassAllocation, DataWarning, PortfolioSummary, PositionSnapshot};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Valuation of every holding at the latest date in the price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    /// One snapshot per holding, in ledger order
    pub positions: Vec<PositionSnapshot>,
    pub summary: PortfolioSummary,
    /// Per asset class, sorted by class name
    pub allocation: Vec<AssetClassAllocation>,
    pub warnings: Vec<DataWarning>,
}

/// Value each holding at the close on the latest date present in `prices`.
///
/// A held ticker with no price rows aborts with [`Error::MissingPrice`]. A
/// ticker whose newest row predates the valuation date is valued at that
/// older close and reported as stale, or aborts under
/// [`StalePricePolicy::Fail`].
pub fn value_holdings(
    ledger: &HoldingsLedger,
    prices: &PriceHistory,
    policy: StalePricePolicy,
) -> Result<Valuation> {
    if let Some(missing) = ledger.iter().find(|h| !prices.contains_ticker(&h.ticker)) {
        return Err(Error::MissingPrice {
            ticker: missing.ticker.clone(),
        });
    }

    let valuation_date = prices
        .latest_date()
        .ok_or_else(|| Error::InsufficientHistory("price history is empty".to_string()))?;

    let mut warnings = Vec::new();
    let mut positions = Vec::with_capacity(ledger.len());

    for holding in ledger {
        let (price_date, close) = prices
            .latest_close(&holding.ticker)
            .ok_or_else(|| Error::MissingPrice {
                ticker: holding.ticker.clone(),
            })?;

        if price_date < valuation_date {
            if policy == StalePricePolicy::Fail {
                return Err(Error::StalePrice {
                    ticker: holding.ticker.clone(),
                    last_date: price_date,
                    valuation_date,
                });
            }

            let warning = DataWarning::StalePrice {
                ticker: holding.ticker.clone(),
                last_date: price_date,
                valuation_date,
            };
            if !warnings.contains(&warning) {
                tracing::warn!("Stale price: {}", warning);
                warnings.push(warning);
            }
        }

        positions.push(holding.snapshot(close, price_date, valuation_date));
    }

    let total_cost_basis: f64 = positions.iter().map(|p| p.cost_basis).sum();
    let total_current_value: f64 = positions.iter().map(|p| p.current_value).sum();
    let total_unrealized_gain: f64 = positions.iter().map(|p| p.unrealized_gain).sum();

    let total_return_pct = ratio_pct(total_unrealized_gain, total_cost_basis);
    if total_return_pct.is_none() {
        warnings.push(division_warning("total_return_pct", "portfolio"));
    }

    let summary = PortfolioSummary {
        valuation_date,
        position_count: positions.len(),
        total_cost_basis,
        total_current_value,
        total_unrealized_gain,
        total_return_pct,
    };

    let allocation = allocate_by_class(&positions, total_current_value, &mut warnings);

    tracing::info!(
        %valuation_date,
        positions = positions.len(),
        total_value = total_current_value,
        "Valued holdings"
    );

    Ok(Valuation {
        positions,
        summary,
        allocation,
        warnings,
    })
}

fn allocate_by_class(
    positions: &[PositionSnapshot],
    total_value: f64,
    warnings: &mut Vec<DataWarning>,
) -> Vec<AssetClassAllocation> {
    let mut groups: BTreeMap<&str, (usize, f64, f64, f64)> = BTreeMap::new();
    for p in positions {
        let entry = groups.entry(p.asset_class.as_str()).or_default();
        entry.0 += 1;
        entry.1 += p.cost_basis;
        entry.2 += p.current_value;
        entry.3 += p.unrealized_gain;
    }

    groups
        .into_iter()
        .map(|(class, (count, cost_basis, current_value, unrealized_gain))| {
            let weight_pct = ratio_pct(current_value, total_value);
            if weight_pct.is_none() {
                warnings.push(division_warning("weight_pct", class));
            }
            let return_pct = ratio_pct(unrealized_gain, cost_basis);
            if return_pct.is_none() {
                warnings.push(division_warning("return_pct", class));
            }

            AssetClassAllocation {
                asset_class: class.to_string(),
                position_count: count,
                cost_basis,
                current_value,
                unrealized_gain,
                weight_pct,
                return_pct,
            }
        })
        .collect()
}

/// `numerator / denominator * 100`, or `None` for a zero denominator.
pub(crate) fn ratio_pct(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator * 100.0)
    }
}

pub(crate) fn division_warning(metric: &str, subject: &str) -> DataWarning {
    let warning = DataWarning::DivisionByZero {
        metric: metric.to_string(),
        subject: subject.to_string(),
    };
    tracing::warn!("{}", warning);
    warning
}

pub(crate) fn non_finite_warning(metric: &str, subject: &str) -> DataWarning {
    let warning = DataWarning::NonFinite {
        metric: metric.to_string(),
        subject: subject.to_string(),
    };
    tracing::warn!("{}", warning);
    warning
}

impl Valuation {
    /// Positions with the highest percent return, ledger order on ties.
    pub fn top_performers(&self, n: usize) -> Vec<&PositionSnapshot> {
        ranked(&self.positions, n, |p| p.unrealized_gain_pct, true)
    }

    /// Positions with the lowest percent return, ledger order on ties.
    pub fn bottom_performers(&self, n: usize) -> Vec<&PositionSnapshot> {
        ranked(&self.positions, n, |p| p.unrealized_gain_pct, false)
    }

    /// Largest positions by current value, ledger order on ties.
    pub fn top_positions(&self, n: usize) -> Vec<&PositionSnapshot> {
        ranked(&self.positions, n, |p| p.current_value, true)
    }

    /// Share of total portfolio value held in `position`, in percent.
    pub fn weight_pct(&self, position: &PositionSnapshot) -> Option<f64> {
        ratio_pct(position.current_value, self.summary.total_current_value)
    }

    /// Weight of each position in ledger order.
    pub fn position_weights(&self) -> Vec<(String, Option<f64>)> {
        self.positions
            .iter()
            .map(|p| (p.ticker.clone(), self.weight_pct(p)))
            .collect()
    }
}

fn ranked<F>(
    positions: &[PositionSnapshot],
    n: usize,
    key: F,
    descending: bool,
) -> Vec<&PositionSnapshot>
where
    F: Fn(&PositionSnapshot) -> f64,
{
    let mut refs: Vec<&PositionSnapshot> = positions.iter().collect();
    // Stable sort keeps ledger order among equal keys.
    refs.sort_by(|a, b| {
        let ord = key(a).total_cmp(&key(b));
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    refs.truncate(n);
    refs
}
