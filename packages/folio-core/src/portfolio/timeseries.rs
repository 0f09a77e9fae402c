//! Daily portfolio value reconstruction.

use super::performance::{cumulative_returns, running_drawdown};
use crate::holdings::HoldingsLedger;
use crate::market::PriceHistory;
use crate::types::{DataWarning, PortfolioValuePoint, SeriesRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Portfolio value history with derived return and drawdown columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioSeries {
    /// One row per retained trading date, ascending
    pub rows: Vec<SeriesRow>,
    /// Partial-coverage warnings, one per affected ticker
    pub warnings: Vec<DataWarning>,
}

impl PortfolioSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.portfolio_value).collect()
    }

    /// Daily returns with the leading gap removed.
    pub fn daily_returns(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.daily_return).collect()
    }

    /// Dates on which at least one held position had no close.
    pub fn partial_dates(&self) -> Vec<NaiveDate> {
        self.rows
            .iter()
            .filter(|r| r.is_partial())
            .map(|r| r.date)
            .collect()
    }
}

/// Sum `shares * close` over holdings already purchased, for every date in
/// the price history. Also returns, per ticker, the held dates that had no
/// close.
fn value_points(
    ledger: &HoldingsLedger,
    prices: &PriceHistory,
) -> (Vec<PortfolioValuePoint>, BTreeMap<String, Vec<NaiveDate>>) {
    let mut gaps: BTreeMap<String, Vec<NaiveDate>> = BTreeMap::new();

    let points = prices
        .dates()
        .map(|date| {
            let mut point = PortfolioValuePoint {
                date,
                portfolio_value: 0.0,
                positions_priced: 0,
                positions_missing: 0,
            };

            for holding in ledger.iter().filter(|h| h.is_held_on(date)) {
                match prices.close(&holding.ticker, date) {
                    Some(close) => {
                        point.portfolio_value += holding.shares * close;
                        point.positions_priced += 1;
                    }
                    None => {
                        point.positions_missing += 1;
                        let dates = gaps.entry(holding.ticker.clone()).or_default();
                        if dates.last() != Some(&date) {
                            dates.push(date);
                        }
                    }
                }
            }

            point
        })
        .collect();

    (points, gaps)
}

/// Portfolio value on each trading date, dropping dates where nothing held
/// had a value (e.g. before the first purchase).
pub fn portfolio_values(ledger: &HoldingsLedger, prices: &PriceHistory) -> Vec<PortfolioValuePoint> {
    let (points, _) = value_points(ledger, prices);
    points
        .into_iter()
        .filter(|p| p.portfolio_value > 0.0)
        .collect()
}

/// Reconstruct the daily portfolio series.
///
/// A purchased holding without a close on some date contributes nothing for
/// that date only; such dates carry `positions_missing > 0` and every
/// affected ticker is reported once as [`DataWarning::PartialCoverage`].
pub fn reconstruct_series(ledger: &HoldingsLedger, prices: &PriceHistory) -> PortfolioSeries {
    let (points, gaps) = value_points(ledger, prices);
    let points: Vec<PortfolioValuePoint> = points
        .into_iter()
        .filter(|p| p.portfolio_value > 0.0)
        .collect();

    let values: Vec<f64> = points.iter().map(|p| p.portfolio_value).collect();
    let cumulative = cumulative_returns(&values);
    let drawdowns = running_drawdown(&values);

    let rows: Vec<SeriesRow> = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let daily_return = (i > 0).then(|| (values[i] - values[i - 1]) / values[i - 1]);
            let (peak, drawdown) = drawdowns[i];
            SeriesRow {
                date: point.date,
                portfolio_value: point.portfolio_value,
                daily_return,
                cumulative_return: cumulative[i],
                peak,
                drawdown,
                positions_priced: point.positions_priced,
                positions_missing: point.positions_missing,
            }
        })
        .collect();

    // Gaps on dropped zero-value dates are not part of the series.
    let retained: BTreeSet<NaiveDate> = points.iter().map(|p| p.date).collect();
    let warnings: Vec<DataWarning> = gaps
        .into_iter()
        .filter_map(|(ticker, mut dates)| {
            dates.retain(|d| retained.contains(d));
            if dates.is_empty() {
                return None;
            }
            let warning = DataWarning::PartialCoverage { ticker, dates };
            tracing::warn!("Partial coverage: {}", warning);
            Some(warning)
        })
        .collect();

    tracing::info!(
        points = rows.len(),
        partial_tickers = warnings.len(),
        "Reconstructed portfolio series"
    );

    PortfolioSeries { rows, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Holding, PriceRecord};
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger(holdings: &[(&str, f64, NaiveDate)]) -> HoldingsLedger {
        HoldingsLedger::new(
            holdings
                .iter()
                .map(|&(t, shares, bought)| Holding::new(t, t, "Equity", shares, 1.0, bought))
                .collect(),
        )
        .unwrap()
    }

    fn prices(rows: &[(&str, NaiveDate, f64)]) -> PriceHistory {
        PriceHistory::new(
            rows.iter()
                .map(|&(t, d, c)| PriceRecord::close_only(t, d, c))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_mid_series_purchase_excludes_earlier_dates() {
        let ledger = ledger(&[("AAPL", 10.0, date(2024, 1, 3))]);
        let prices = prices(&[
            ("AAPL", date(2024, 1, 1), 100.0),
            ("AAPL", date(2024, 1, 2), 101.0),
            ("AAPL", date(2024, 1, 3), 102.0),
            ("AAPL", date(2024, 1, 4), 104.0),
        ]);

        let series = reconstruct_series(&ledger, &prices);
        let dates: Vec<_> = series.rows.iter().map(|r| r.date).collect();

        assert_eq!(dates, vec![date(2024, 1, 3), date(2024, 1, 4)]);
        assert!(series.rows.iter().all(|r| r.portfolio_value > 0.0));
        assert_eq!(series.rows[0].daily_return, None);
        assert_eq!(series.rows[0].cumulative_return, 0.0);
    }

    #[test]
    fn test_ramp_up_as_positions_are_bought() {
        let ledger = ledger(&[
            ("AAPL", 1.0, date(2024, 1, 1)),
            ("MSFT", 2.0, date(2024, 1, 2)),
        ]);
        let prices = prices(&[
            ("AAPL", date(2024, 1, 1), 100.0),
            ("MSFT", date(2024, 1, 1), 50.0),
            ("AAPL", date(2024, 1, 2), 100.0),
            ("MSFT", date(2024, 1, 2), 50.0),
        ]);

        let values = portfolio_values(&ledger, &prices);
        assert_eq!(values[0].portfolio_value, 100.0);
        assert_eq!(values[1].portfolio_value, 200.0);
    }

    #[test]
    fn test_returns_and_drawdown() {
        let ledger = ledger(&[("SPY", 1.0, date(2024, 1, 1))]);
        let prices = prices(&[
            ("SPY", date(2024, 1, 1), 100.0),
            ("SPY", date(2024, 1, 2), 120.0),
            ("SPY", date(2024, 1, 3), 90.0),
            ("SPY", date(2024, 1, 4), 110.0),
        ]);

        let series = reconstruct_series(&ledger, &prices);
        let rows = &series.rows;

        assert_abs_diff_eq!(rows[1].daily_return.unwrap(), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(rows[2].daily_return.unwrap(), -0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(rows[3].cumulative_return, 10.0, epsilon = 1e-9);
        assert_eq!(rows[2].peak, 120.0);
        assert_abs_diff_eq!(rows[2].drawdown, -25.0, epsilon = 1e-9);
        assert_eq!(rows[1].drawdown, 0.0);
        assert_eq!(series.daily_returns().len(), 3);
    }

    #[test]
    fn test_dates_ascending_and_drawn_from_store() {
        let ledger = ledger(&[
            ("AAPL", 1.0, date(2024, 1, 1)),
            ("MSFT", 1.0, date(2024, 1, 1)),
        ]);
        let prices = prices(&[
            ("MSFT", date(2024, 1, 5), 10.0),
            ("AAPL", date(2024, 1, 2), 10.0),
            ("AAPL", date(2024, 1, 4), 11.0),
            ("MSFT", date(2024, 1, 3), 12.0),
        ]);

        let series = reconstruct_series(&ledger, &prices);
        let store_dates: Vec<_> = prices.dates().collect();

        for pair in series.rows.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        for row in &series.rows {
            assert!(store_dates.contains(&row.date));
            assert!(row.drawdown <= 0.0);
        }
    }

    #[test]
    fn test_gap_dates_are_flagged() {
        let ledger = ledger(&[
            ("AAPL", 1.0, date(2024, 1, 1)),
            ("MSFT", 1.0, date(2024, 1, 1)),
        ]);
        let prices = prices(&[
            ("AAPL", date(2024, 1, 1), 100.0),
            ("MSFT", date(2024, 1, 1), 200.0),
            ("AAPL", date(2024, 1, 2), 100.0),
        ]);

        let series = reconstruct_series(&ledger, &prices);

        assert_eq!(series.rows[1].portfolio_value, 100.0);
        assert_eq!(series.rows[1].positions_missing, 1);
        assert_eq!(series.partial_dates(), vec![date(2024, 1, 2)]);
        assert_eq!(
            series.warnings,
            vec![DataWarning::PartialCoverage {
                ticker: "MSFT".to_string(),
                dates: vec![date(2024, 1, 2)],
            }]
        );
    }

    #[test]
    fn test_gaps_on_dropped_dates_are_not_reported() {
        let ledger = ledger(&[
            ("AAA", 1.0, date(2024, 1, 1)),
            ("BBB", 1.0, date(2024, 1, 2)),
        ]);
        let prices = prices(&[
            ("BBB", date(2024, 1, 1), 50.0),
            ("AAA", date(2024, 1, 2), 100.0),
            ("BBB", date(2024, 1, 2), 50.0),
            ("AAA", date(2024, 1, 3), 101.0),
        ]);

        let series = reconstruct_series(&ledger, &prices);
        let dates: Vec<_> = series.rows.iter().map(|r| r.date).collect();

        // Nothing held is priced on 2024-01-01, so that date and AAA's gap are dropped
        assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(
            series.warnings,
            vec![DataWarning::PartialCoverage {
                ticker: "BBB".to_string(),
                dates: vec![date(2024, 1, 3)],
            }]
        );
    }

    #[test]
    fn test_no_purchases_in_window_yields_empty_series() {
        let ledger = ledger(&[("AAPL", 1.0, date(2025, 1, 1))]);
        let prices = prices(&[("AAPL", date(2024, 1, 1), 100.0)]);

        let series = reconstruct_series(&ledger, &prices);
        assert!(series.is_empty());
        assert!(series.warnings.is_empty());
    }
}
