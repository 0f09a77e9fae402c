//! In-memory price history keyed by (ticker, date).

use crate::types::PriceRecord;
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Cleaned daily OHLCV history for every ticker.
///
/// Each ticker's rows are kept in date order, and the set of all trading
/// dates across tickers is tracked separately so the latest date is an
/// explicit maximum rather than whatever row happened to load last.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    by_ticker: BTreeMap<String, BTreeMap<NaiveDate, PriceRecord>>,
    dates: BTreeSet<NaiveDate>,
}

impl PriceHistory {
    /// Index records, rejecting duplicate (ticker, date) keys and
    /// non-finite closes.
    pub fn new(records: Vec<PriceRecord>) -> Result<Self> {
        let mut history = Self::default();

        for mut record in records {
            record.ticker = record.ticker.trim().to_uppercase();

            if !record.close.is_finite() {
                return Err(Error::Schema(format!(
                    "non-finite close for {} on {}",
                    record.ticker, record.date
                )));
            }

            let series = history.by_ticker.entry(record.ticker.clone()).or_default();
            if series.contains_key(&record.date) {
                return Err(Error::DuplicatePrice {
                    ticker: record.ticker,
                    date: record.date,
                });
            }

            history.dates.insert(record.date);
            series.insert(record.date, record);
        }

        Ok(history)
    }

    /// Number of price rows.
    pub fn len(&self) -> usize {
        self.by_ticker.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Tickers present in the store, sorted.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.by_ticker.keys().map(|t| t.as_str())
    }

    pub fn contains_ticker(&self, ticker: &str) -> bool {
        self.by_ticker.contains_key(&ticker.to_uppercase())
    }

    /// Every distinct trading date, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Maximum date present across all tickers.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Close for a ticker on an exact date.
    pub fn close(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.by_ticker
            .get(ticker)
            .and_then(|series| series.get(&date))
            .map(|record| record.close)
    }

    /// Newest (date, close) for a ticker.
    pub fn latest_close(&self, ticker: &str) -> Option<(NaiveDate, f64)> {
        self.by_ticker
            .get(ticker)
            .and_then(|series| series.last_key_value())
            .map(|(date, record)| (*date, record.close))
    }

    /// A ticker's rows in date order.
    pub fn records(&self, ticker: &str) -> impl Iterator<Item = &PriceRecord> {
        self.by_ticker
            .get(ticker)
            .into_iter()
            .flat_map(|series| series.values())
    }

    /// A ticker's closes in date order.
    pub fn closes(&self, ticker: &str) -> Vec<f64> {
        self.records(ticker).map(|r| r.close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_latest_date_is_max_not_last_loaded() {
        let history = PriceHistory::new(vec![
            PriceRecord::close_only("AAPL", date(2024, 1, 5), 190.0),
            PriceRecord::close_only("MSFT", date(2024, 1, 8), 380.0),
            PriceRecord::close_only("AAPL", date(2024, 1, 2), 185.0),
        ])
        .unwrap();

        assert_eq!(history.latest_date(), Some(date(2024, 1, 8)));
        assert_eq!(history.first_date(), Some(date(2024, 1, 2)));
        assert_eq!(history.latest_close("AAPL"), Some((date(2024, 1, 5), 190.0)));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = PriceHistory::new(vec![
            PriceRecord::close_only("AAPL", date(2024, 1, 2), 185.0),
            PriceRecord::close_only("aapl", date(2024, 1, 2), 186.0),
        ]);

        assert!(matches!(
            result,
            Err(Error::DuplicatePrice { ref ticker, .. }) if ticker == "AAPL"
        ));
    }

    #[test]
    fn test_non_finite_close_rejected() {
        let result = PriceHistory::new(vec![PriceRecord::close_only(
            "AAPL",
            date(2024, 1, 2),
            f64::NAN,
        )]);
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_dates_are_distinct_and_sorted() {
        let history = PriceHistory::new(vec![
            PriceRecord::close_only("MSFT", date(2024, 1, 3), 1.0),
            PriceRecord::close_only("AAPL", date(2024, 1, 3), 1.0),
            PriceRecord::close_only("AAPL", date(2024, 1, 2), 1.0),
        ])
        .unwrap();

        let dates: Vec<_> = history.dates().collect();
        assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_close_lookup() {
        let history =
            PriceHistory::new(vec![PriceRecord::close_only("AAPL", date(2024, 1, 2), 185.0)])
                .unwrap();

        assert_eq!(history.close("AAPL", date(2024, 1, 2)), Some(185.0));
        assert_eq!(history.close("AAPL", date(2024, 1, 3)), None);
        assert_eq!(history.close("MSFT", date(2024, 1, 2)), None);
        assert!(history.contains_ticker("aapl"));
        assert!(history.closes("MSFT").is_empty());
    }
}
