//! End-to-end analytics run: valuation, series reconstruction and risk.

use crate::config::AnalyticsConfig;
use crate::holdings::HoldingsLedger;
use crate::market::PriceHistory;
use crate::portfolio::{
    reconstruct_series, risk_summary, ticker_risk, value_holdings, PortfolioSeries, Valuation,
};
use crate::report::{self, BiTables};
use crate::types::{DataWarning, RiskSummary, TickerRisk};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything computed by one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub valuation: Valuation,
    pub series: PortfolioSeries,
    pub risk: RiskSummary,
    pub ticker_risk: Vec<TickerRisk>,
    /// Every non-fatal condition raised by any stage
    pub warnings: Vec<DataWarning>,
}

impl AnalyticsReport {
    /// Whether the run completed on degraded data.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run every engine over the loaded inputs.
///
/// Any fatal condition (missing ticker, insufficient history, stale price
/// under the `fail` policy) aborts before a report exists.
pub fn run(
    config: &AnalyticsConfig,
    ledger: &HoldingsLedger,
    prices: &PriceHistory,
) -> Result<AnalyticsReport> {
    config.validate()?;

    let valuation = value_holdings(ledger, prices, config.stale_price_policy)?;
    let series = reconstruct_series(ledger, prices);
    let (risk, risk_warnings) = risk_summary(&series, config)?;
    let (ticker_risk, ticker_warnings) = ticker_risk(ledger, prices, config);

    let warnings: Vec<DataWarning> = valuation
        .warnings
        .iter()
        .chain(series.warnings.iter())
        .cloned()
        .chain(risk_warnings)
        .chain(ticker_warnings)
        .collect();

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Run completed with data warnings");
    }

    Ok(AnalyticsReport {
        valuation,
        series,
        risk,
        ticker_risk,
        warnings,
    })
}

/// Run the analytics and export every BI table into `out_dir`.
///
/// Nothing is written unless the whole computation succeeds.
pub fn run_and_export(
    config: &AnalyticsConfig,
    ledger: &HoldingsLedger,
    prices: &PriceHistory,
    out_dir: &Path,
) -> Result<(AnalyticsReport, Vec<PathBuf>)> {
    let report = run(config, ledger, prices)?;
    let tables = BiTables::build(&report, ledger, prices);
    let written = report::export(out_dir, &tables)?;

    tracing::info!(
        files = written.len(),
        dir = %out_dir.display(),
        "Exported BI tables"
    );
    Ok((report, written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Holding, PriceRecord};
    use crate::Error;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn inputs() -> (HoldingsLedger, PriceHistory) {
        let ledger = HoldingsLedger::new(vec![
            Holding::new("AAPL", "Apple Inc.", "Equity", 10.0, 100.0, date(2023, 1, 2)),
            Holding::new("SPY", "SPDR S&P 500", "ETF", 2.0, 380.0, date(2023, 1, 4)),
        ])
        .unwrap();
        let prices = PriceHistory::new(vec![
            PriceRecord::close_only("AAPL", date(2023, 1, 2), 100.0),
            PriceRecord::close_only("SPY", date(2023, 1, 2), 380.0),
            PriceRecord::close_only("AAPL", date(2023, 1, 3), 104.0),
            PriceRecord::close_only("SPY", date(2023, 1, 3), 382.0),
            PriceRecord::close_only("AAPL", date(2023, 1, 4), 101.0),
            PriceRecord::close_only("SPY", date(2023, 1, 4), 385.0),
            PriceRecord::close_only("AAPL", date(2023, 1, 5), 108.0),
            PriceRecord::close_only("SPY", date(2023, 1, 5), 390.0),
        ])
        .unwrap();
        (ledger, prices)
    }

    #[test]
    fn test_run_combines_stages() {
        let (ledger, prices) = inputs();
        let report = run(&AnalyticsConfig::default(), &ledger, &prices).unwrap();

        assert_eq!(report.valuation.positions.len(), 2);
        assert_eq!(report.series.len(), 4);
        // SPY joins the series on its purchase date
        assert_eq!(report.series.rows[1].portfolio_value, 1040.0);
        assert_eq!(report.series.rows[2].portfolio_value, 1010.0 + 770.0);
        assert_eq!(report.risk.start_date, date(2023, 1, 2));
        assert_eq!(report.ticker_risk.len(), 2);
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_run_rejects_missing_ticker() {
        let (_, prices) = inputs();
        let ledger = HoldingsLedger::new(vec![Holding::new(
            "NVDA",
            "NVIDIA",
            "Equity",
            1.0,
            1.0,
            date(2023, 1, 2),
        )])
        .unwrap();

        let result = run(&AnalyticsConfig::default(), &ledger, &prices);
        assert!(matches!(result, Err(Error::MissingPrice { .. })));
    }

    #[test]
    fn test_run_and_export_writes_tables() {
        let (ledger, prices) = inputs();
        let dir = tempdir().unwrap();

        let (_, written) =
            run_and_export(&AnalyticsConfig::default(), &ledger, &prices, dir.path()).unwrap();

        assert!(written.iter().all(|p| p.exists()));
        assert!(dir.path().join("risk_metrics.csv").exists());
        // Staging directory is cleaned up
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, written.len());
    }
}
