//! Row types for each exported table.

use crate::holdings::HoldingsLedger;
use crate::market::PriceHistory;
use crate::pipeline::AnalyticsReport;
use crate::types::{AssetClassAllocation, DataWarning, RiskSummary, TickerRisk};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// A position snapshot enriched with weight and bucket labels.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceRow {
    pub ticker: String,
    pub asset_name: String,
    pub asset_class: String,
    pub shares: f64,
    pub purchase_date: NaiveDate,
    pub purchase_price: f64,
    pub current_price: f64,
    pub price_date: NaiveDate,
    pub cost_basis: f64,
    pub current_value: f64,
    pub unrealized_gain: f64,
    pub unrealized_gain_pct: f64,
    pub days_held: i64,
    pub weight_pct: Option<f64>,
    /// "Gain" or "Loss"
    pub gain_loss_label: &'static str,
    pub performance_category: Option<&'static str>,
    pub size_category: Option<&'static str>,
}

/// One trading day of the portfolio series.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub daily_return: Option<f64>,
    pub daily_return_pct: Option<f64>,
    pub cumulative_return: f64,
    pub peak: f64,
    pub drawdown: f64,
    /// Value change since the first day of the series
    pub portfolio_gain_loss: f64,
    /// "Positive", "Negative" or "Flat"
    pub return_category: &'static str,
    pub positions_priced: usize,
    pub positions_missing: usize,
    pub partial_coverage: bool,
}

/// Calendar dimension row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DateRow {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub quarter: u32,
    /// ISO week number
    pub week: u32,
    pub day_of_week: String,
    pub is_weekend: bool,
}

/// One price row of a held ticker joined with its holding.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockHistoryRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub asset_name: String,
    pub asset_class: String,
    pub shares: f64,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
    pub position_value: f64,
    pub cost_basis: f64,
    pub unrealized_gain: f64,
    pub unrealized_gain_pct: f64,
    /// Close minus the ticker's previous close
    pub price_change: Option<f64>,
    pub price_change_pct: Option<f64>,
}

/// Dashboard headline metric.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KpiRow {
    pub metric_name: &'static str,
    pub metric_value: Option<f64>,
    /// "Currency", "Percentage" or "Number"
    pub metric_format: &'static str,
}

/// Flattened [`DataWarning`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WarningRow {
    pub kind: &'static str,
    pub ticker: Option<String>,
    pub detail: String,
}

impl From<&DataWarning> for WarningRow {
    fn from(warning: &DataWarning) -> Self {
        Self {
            kind: warning.kind(),
            ticker: warning.ticker().map(str::to_string),
            detail: warning.to_string(),
        }
    }
}

/// Every exported table, fully materialized before anything is written.
#[derive(Debug, Clone, Default)]
pub struct BiTables {
    pub performance: Vec<PerformanceRow>,
    pub daily: Vec<DailyRow>,
    pub risk: Vec<RiskSummary>,
    pub position_risk: Vec<TickerRisk>,
    pub asset_classes: Vec<AssetClassAllocation>,
    pub dates: Vec<DateRow>,
    pub stock_history: Vec<StockHistoryRow>,
    pub kpis: Vec<KpiRow>,
    pub warnings: Vec<WarningRow>,
}

impl BiTables {
    pub fn build(report: &AnalyticsReport, ledger: &HoldingsLedger, prices: &PriceHistory) -> Self {
        Self {
            performance: performance_rows(report),
            daily: daily_rows(report),
            risk: vec![report.risk.clone()],
            position_risk: report.ticker_risk.clone(),
            asset_classes: report.valuation.allocation.clone(),
            dates: date_rows(report.risk.start_date, report.risk.end_date),
            stock_history: stock_history_rows(ledger, prices),
            kpis: kpi_rows(report),
            warnings: report.warnings.iter().map(WarningRow::from).collect(),
        }
    }
}

/// Bucket a percent return; bins are right-closed like
/// `(-100, -10], (-10, 0], ...`.
pub fn performance_category(return_pct: f64) -> Option<&'static str> {
    const BINS: [(f64, f64, &str); 6] = [
        (-100.0, -10.0, "Large Loss"),
        (-10.0, 0.0, "Small Loss"),
        (0.0, 10.0, "Small Gain"),
        (10.0, 25.0, "Moderate Gain"),
        (25.0, 50.0, "Good Gain"),
        (50.0, 200.0, "Excellent Gain"),
    ];
    bucket(&BINS, return_pct)
}

/// Bucket a position value into size bands.
pub fn size_category(value: f64) -> Option<&'static str> {
    const BINS: [(f64, f64, &str); 4] = [
        (0.0, 20_000.0, "Small"),
        (20_000.0, 40_000.0, "Medium"),
        (40_000.0, 60_000.0, "Large"),
        (60_000.0, 100_000.0, "Very Large"),
    ];
    bucket(&BINS, value)
}

fn bucket(bins: &[(f64, f64, &'static str)], value: f64) -> Option<&'static str> {
    bins.iter()
        .find(|(low, high, _)| value > *low && value <= *high)
        .map(|(_, _, label)| *label)
}

fn performance_rows(report: &AnalyticsReport) -> Vec<PerformanceRow> {
    let valuation = &report.valuation;
    valuation
        .positions
        .iter()
        .map(|p| PerformanceRow {
            ticker: p.ticker.clone(),
            asset_name: p.asset_name.clone(),
            asset_class: p.asset_class.clone(),
            shares: p.shares,
            purchase_date: p.purchase_date,
            purchase_price: p.purchase_price,
            current_price: p.current_price,
            price_date: p.price_date,
            cost_basis: p.cost_basis,
            current_value: p.current_value,
            unrealized_gain: p.unrealized_gain,
            unrealized_gain_pct: p.unrealized_gain_pct,
            days_held: p.days_held,
            weight_pct: valuation.weight_pct(p),
            gain_loss_label: if p.unrealized_gain > 0.0 { "Gain" } else { "Loss" },
            performance_category: performance_category(p.unrealized_gain_pct),
            size_category: size_category(p.current_value),
        })
        .collect()
}

fn daily_rows(report: &AnalyticsReport) -> Vec<DailyRow> {
    let rows = &report.series.rows;
    let base = rows.first().map(|r| r.portfolio_value).unwrap_or(0.0);

    rows.iter()
        .map(|r| {
            let daily_return_pct = r.daily_return.map(|d| d * 100.0);
            let return_category = match daily_return_pct {
                Some(pct) if pct > 0.0 => "Positive",
                Some(pct) if pct < 0.0 => "Negative",
                _ => "Flat",
            };
            DailyRow {
                date: r.date,
                portfolio_value: r.portfolio_value,
                daily_return: r.daily_return,
                daily_return_pct,
                cumulative_return: r.cumulative_return,
                peak: r.peak,
                drawdown: r.drawdown,
                portfolio_gain_loss: r.portfolio_value - base,
                return_category,
                positions_priced: r.positions_priced,
                positions_missing: r.positions_missing,
                partial_coverage: r.is_partial(),
            }
        })
        .collect()
}

/// Every calendar day from `start` to `end`, inclusive.
fn date_rows(start: NaiveDate, end: NaiveDate) -> Vec<DateRow> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|d| DateRow {
            date: d,
            year: d.year(),
            month: d.month(),
            month_name: d.format("%B").to_string(),
            quarter: (d.month() - 1) / 3 + 1,
            week: d.iso_week().week(),
            day_of_week: d.format("%A").to_string(),
            is_weekend: matches!(d.weekday(), Weekday::Sat | Weekday::Sun),
        })
        .collect()
}

/// Price history of every held ticker, sorted by (ticker, date).
fn stock_history_rows(ledger: &HoldingsLedger, prices: &PriceHistory) -> Vec<StockHistoryRow> {
    let mut tickers = ledger.tickers();
    tickers.sort_unstable();

    let mut rows = Vec::new();
    for ticker in tickers {
        let holdings: Vec<_> = ledger.iter().filter(|h| h.ticker == ticker).collect();
        let mut previous_close: Option<f64> = None;

        for record in prices.records(ticker) {
            let price_change = previous_close.map(|prev| record.close - prev);
            let price_change_pct = previous_close
                .filter(|prev| *prev != 0.0)
                .map(|prev| (record.close / prev - 1.0) * 100.0);

            for holding in &holdings {
                let position_value = holding.shares * record.close;
                let cost_basis = holding.cost_basis();
                let unrealized_gain = position_value - cost_basis;
                rows.push(StockHistoryRow {
                    date: record.date,
                    ticker: record.ticker.clone(),
                    open: record.open,
                    high: record.high,
                    low: record.low,
                    close: record.close,
                    volume: record.volume,
                    asset_name: holding.asset_name.clone(),
                    asset_class: holding.asset_class.clone(),
                    shares: holding.shares,
                    purchase_price: holding.purchase_price,
                    purchase_date: holding.purchase_date,
                    position_value,
                    cost_basis,
                    unrealized_gain,
                    unrealized_gain_pct: unrealized_gain / cost_basis * 100.0,
                    price_change,
                    price_change_pct,
                });
            }

            previous_close = Some(record.close);
        }
    }
    rows
}

fn kpi_rows(report: &AnalyticsReport) -> Vec<KpiRow> {
    let summary = &report.valuation.summary;
    let risk = &report.risk;
    let row = |metric_name, metric_value, metric_format| KpiRow {
        metric_name,
        metric_value,
        metric_format,
    };

    vec![
        row("Total Portfolio Value", Some(summary.total_current_value), "Currency"),
        row("Total Cost Basis", Some(summary.total_cost_basis), "Currency"),
        row("Total Unrealized Gain", Some(summary.total_unrealized_gain), "Currency"),
        row("Total Return", summary.total_return_pct, "Percentage"),
        row("Number of Positions", Some(summary.position_count as f64), "Number"),
        row("Annualized Return", risk.annualized_return, "Percentage"),
        row("Sharpe Ratio", risk.sharpe_ratio, "Number"),
        row("Maximum Drawdown", Some(risk.max_drawdown), "Percentage"),
    ]
}
