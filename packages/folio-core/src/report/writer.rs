//! Atomic CSV export of the BI tables.

use super::tables::BiTables;
use crate::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of every table written by [`export`], in write order.
pub const TABLE_FILES: [&str; 10] = [
    "fact_portfolio_performance.csv",
    "fact_daily_portfolio.csv",
    "risk_metrics.csv",
    "position_risk.csv",
    "dim_asset_class.csv",
    "dim_date.csv",
    "fact_stock_history.csv",
    "kpi_metrics.csv",
    "data_warnings.csv",
    "DATA_DICTIONARY.txt",
];

const PERFORMANCE_HEADER: &[&str] = &[
    "ticker",
    "asset_name",
    "asset_class",
    "shares",
    "purchase_date",
    "purchase_price",
    "current_price",
    "price_date",
    "cost_basis",
    "current_value",
    "unrealized_gain",
    "unrealized_gain_pct",
    "days_held",
    "weight_pct",
    "gain_loss_label",
    "performance_category",
    "size_category",
];
const DAILY_HEADER: &[&str] = &[
    "date",
    "portfolio_value",
    "daily_return",
    "daily_return_pct",
    "cumulative_return",
    "peak",
    "drawdown",
    "portfolio_gain_loss",
    "return_category",
    "positions_priced",
    "positions_missing",
    "partial_coverage",
];
const RISK_HEADER: &[&str] = &[
    "start_date",
    "end_date",
    "observations",
    "total_return",
    "annualized_return",
    "volatility",
    "sharpe_ratio",
    "max_drawdown",
    "var_95",
    "best_daily_return",
    "worst_daily_return",
];
const POSITION_RISK_HEADER: &[&str] =
    &["ticker", "asset_name", "observations", "volatility", "max_drawdown"];
const ASSET_CLASS_HEADER: &[&str] = &[
    "asset_class",
    "position_count",
    "cost_basis",
    "current_value",
    "unrealized_gain",
    "weight_pct",
    "return_pct",
];
const DATE_HEADER: &[&str] = &[
    "date",
    "year",
    "month",
    "month_name",
    "quarter",
    "week",
    "day_of_week",
    "is_weekend",
];
const STOCK_HISTORY_HEADER: &[&str] = &[
    "date",
    "ticker",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "asset_name",
    "asset_class",
    "shares",
    "purchase_price",
    "purchase_date",
    "position_value",
    "cost_basis",
    "unrealized_gain",
    "unrealized_gain_pct",
    "price_change",
    "price_change_pct",
];
const KPI_HEADER: &[&str] = &["metric_name", "metric_value", "metric_format"];
const WARNING_HEADER: &[&str] = &["kind", "ticker", "detail"];

/// Column reference shipped next to the tables.
pub const DATA_DICTIONARY: &str = "\
FOLIO BI DATA DICTIONARY

Percent columns are in percent units (12.5 means 12.5%) except
fact_daily_portfolio.daily_return, which is a fraction. Empty cells mean the
value is undefined (zero denominator, overflow or too little history); see
data_warnings.csv.

fact_portfolio_performance.csv
  One row per holding, valued at the latest date in the price history.
  price_date            date of the close used; earlier than the valuation date when stale
  cost_basis            shares * purchase_price
  current_value         shares * current_price
  unrealized_gain_pct   unrealized_gain / cost_basis * 100
  weight_pct            current_value / total portfolio value * 100
  gain_loss_label       Gain or Loss
  performance_category  Large Loss, Small Loss, Small Gain, Moderate Gain, Good Gain, Excellent Gain
  size_category         Small, Medium, Large, Very Large by current_value

fact_daily_portfolio.csv
  One row per trading date with a positive portfolio value.
  daily_return          fractional change from the previous row
  cumulative_return     percent change from the first row
  peak                  running maximum of portfolio_value
  drawdown              percent below peak
  portfolio_gain_loss   portfolio_value minus the first row's value
  partial_coverage      true when a held position had no close on that date

risk_metrics.csv
  Portfolio-level statistics: annualized return, annualized volatility,
  Sharpe ratio, maximum drawdown, 95% historical VaR of daily returns.

position_risk.csv
  Annualized volatility and maximum drawdown of each held ticker's closes.

dim_asset_class.csv
  Cost basis, value, gain and weight aggregated per asset class.

dim_date.csv
  Every calendar day between the first and last series date.

fact_stock_history.csv
  Daily OHLCV of each held ticker joined with its holding.

kpi_metrics.csv
  Headline metrics with their display format.

data_warnings.csv
  Degraded-data conditions that did not abort the run.
";

/// Write every table into `dir`.
///
/// Tables are first written into a staging directory inside `dir` and only
/// moved into place once all of them serialized, so a failure leaves no
/// partial table set behind.
pub fn export(dir: &Path, tables: &BiTables) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".folio-staging")
        .tempdir_in(dir)?;
    let stage = staging.path();

    write_table(&stage.join(TABLE_FILES[0]), PERFORMANCE_HEADER, &tables.performance)?;
    write_table(&stage.join(TABLE_FILES[1]), DAILY_HEADER, &tables.daily)?;
    write_table(&stage.join(TABLE_FILES[2]), RISK_HEADER, &tables.risk)?;
    write_table(&stage.join(TABLE_FILES[3]), POSITION_RISK_HEADER, &tables.position_risk)?;
    write_table(&stage.join(TABLE_FILES[4]), ASSET_CLASS_HEADER, &tables.asset_classes)?;
    write_table(&stage.join(TABLE_FILES[5]), DATE_HEADER, &tables.dates)?;
    write_table(&stage.join(TABLE_FILES[6]), STOCK_HISTORY_HEADER, &tables.stock_history)?;
    write_table(&stage.join(TABLE_FILES[7]), KPI_HEADER, &tables.kpis)?;
    write_table(&stage.join(TABLE_FILES[8]), WARNING_HEADER, &tables.warnings)?;
    fs::write(stage.join(TABLE_FILES[9]), DATA_DICTIONARY)?;

    let mut written = Vec::with_capacity(TABLE_FILES.len());
    for name in TABLE_FILES {
        let target = dir.join(name);
        fs::rename(stage.join(name), &target)?;
        tracing::debug!(path = %target.display(), "Wrote table");
        written.push(target);
    }

    staging.close()?;
    Ok(written)
}

/// Header is written explicitly so empty tables still carry their columns;
/// serde headers only appear alongside a first row.
fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{KpiRow, WarningRow};
    use crate::types::{Holding, PriceRecord};
    use crate::{pipeline, AnalyticsConfig, HoldingsLedger, PriceHistory};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    /// Header row serde derives for `row`.
    fn serde_header<T: Serialize>(row: &T) -> String {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
        writer.serialize(row).unwrap();
        let bytes = writer.into_inner().unwrap();
        String::from_utf8(bytes).unwrap().lines().next().unwrap().to_string()
    }

    fn full_tables() -> BiTables {
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let ledger = HoldingsLedger::new(vec![Holding::new(
            "AAPL",
            "Apple Inc.",
            "Equity",
            10.0,
            100.0,
            date(2),
        )])
        .unwrap();
        let prices = PriceHistory::new(vec![
            PriceRecord::close_only("AAPL", date(2), 100.0),
            PriceRecord::close_only("AAPL", date(3), 102.0),
            PriceRecord::close_only("AAPL", date(4), 101.0),
        ])
        .unwrap();
        let report = pipeline::run(&AnalyticsConfig::default(), &ledger, &prices).unwrap();
        let mut tables = BiTables::build(&report, &ledger, &prices);
        tables.warnings.push(WarningRow {
            kind: "stale_price",
            ticker: None,
            detail: String::new(),
        });
        tables
    }

    fn sample() -> BiTables {
        BiTables {
            kpis: vec![
                KpiRow {
                    metric_name: "Sharpe Ratio",
                    metric_value: None,
                    metric_format: "Number",
                },
                KpiRow {
                    metric_name: "Total Return",
                    metric_value: Some(12.5),
                    metric_format: "Percentage",
                },
            ],
            ..BiTables::default()
        }
    }

    #[test]
    fn test_export_writes_every_table() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("bi");

        let written = export(&out, &sample()).unwrap();

        assert_eq!(written.len(), TABLE_FILES.len());
        for name in TABLE_FILES {
            assert!(out.join(name).exists(), "{name} missing");
        }
        assert_eq!(fs::read_dir(&out).unwrap().count(), TABLE_FILES.len());
    }

    #[test]
    fn test_undefined_values_are_empty_cells() {
        let dir = tempdir().unwrap();
        export(dir.path(), &sample()).unwrap();

        let kpis = fs::read_to_string(dir.path().join("kpi_metrics.csv")).unwrap();
        let lines: Vec<_> = kpis.lines().collect();
        assert_eq!(lines[0], "metric_name,metric_value,metric_format");
        assert_eq!(lines[1], "Sharpe Ratio,,Number");
        assert_eq!(lines[2], "Total Return,12.5,Percentage");
    }

    #[test]
    fn test_headers_match_row_fields() {
        let t = full_tables();
        let header = |h: &[&str]| h.join(",");

        assert_eq!(header(PERFORMANCE_HEADER), serde_header(&t.performance[0]));
        assert_eq!(header(DAILY_HEADER), serde_header(&t.daily[0]));
        assert_eq!(header(RISK_HEADER), serde_header(&t.risk[0]));
        assert_eq!(header(POSITION_RISK_HEADER), serde_header(&t.position_risk[0]));
        assert_eq!(header(ASSET_CLASS_HEADER), serde_header(&t.asset_classes[0]));
        assert_eq!(header(DATE_HEADER), serde_header(&t.dates[0]));
        assert_eq!(header(STOCK_HISTORY_HEADER), serde_header(&t.stock_history[0]));
        assert_eq!(header(KPI_HEADER), serde_header(&t.kpis[0]));
        assert_eq!(header(WARNING_HEADER), serde_header(&t.warnings[0]));
    }

    #[test]
    fn test_empty_tables_keep_headers() {
        let dir = tempdir().unwrap();
        export(dir.path(), &BiTables::default()).unwrap();

        let daily = fs::read_to_string(dir.path().join("fact_daily_portfolio.csv")).unwrap();
        assert_eq!(daily.trim(), DAILY_HEADER.join(","));
        let risk = fs::read_to_string(dir.path().join("risk_metrics.csv")).unwrap();
        assert!(risk.starts_with("start_date,end_date,observations"));
    }

    #[test]
    fn test_empty_warning_table_keeps_header() {
        let dir = tempdir().unwrap();
        export(dir.path(), &sample()).unwrap();

        let warnings = fs::read_to_string(dir.path().join("data_warnings.csv")).unwrap();
        assert_eq!(warnings.trim(), "kind,ticker,detail");

        let mut tables = sample();
        tables.warnings.push(WarningRow {
            kind: "stale_price",
            ticker: Some("MSFT".to_string()),
            detail: "MSFT: stale".to_string(),
        });
        export(dir.path(), &tables).unwrap();
        let warnings = fs::read_to_string(dir.path().join("data_warnings.csv")).unwrap();
        assert_eq!(warnings.lines().nth(1), Some("stale_price,MSFT,MSFT: stale"));
    }
}
