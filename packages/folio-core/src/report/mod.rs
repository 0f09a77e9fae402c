//! BI report tables.
//!
//! Flattens an [`AnalyticsReport`](crate::AnalyticsReport) into one-row-per-entity
//! tables and writes them as CSV files for dashboard tools.

mod tables;
mod writer;

pub use tables::{
    performance_category, size_category, BiTables, DailyRow, DateRow, KpiRow, PerformanceRow,
    StockHistoryRow, WarningRow,
};
pub use writer::{export, DATA_DICTIONARY, TABLE_FILES};
