//! Reshape a raw wide (ticker x field) price download into records.
//!
//! The raw file carries two header rows, one naming the ticker of each column
//! and one naming the OHLCV field, followed by one row per date. Columns are
//! resolved against an explicit [`WideSchema`] so a missing (ticker, field)
//! pair is reported up front instead of silently shifting columns.

use crate::types::PriceRecord;
use crate::{Error, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;

/// OHLCV field of a wide column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    pub const ALL: [PriceField; 5] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Volume,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::Volume => "Volume",
        }
    }

    /// Case-insensitive parse of a header label.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A (ticker, field) column identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub ticker: String,
    pub field: PriceField,
}

/// The columns a raw download is expected to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideSchema {
    columns: Vec<ColumnKey>,
}

impl WideSchema {
    /// Full OHLCV columns for each ticker.
    pub fn ohlcv<S: AsRef<str>>(tickers: &[S]) -> Self {
        let columns = tickers
            .iter()
            .flat_map(|t| {
                let ticker = t.as_ref().trim().to_uppercase();
                PriceField::ALL.into_iter().map(move |field| ColumnKey {
                    ticker: ticker.clone(),
                    field,
                })
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    /// Distinct tickers in schema order.
    pub fn tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = Vec::new();
        for key in &self.columns {
            if !tickers.contains(&key.ticker.as_str()) {
                tickers.push(&key.ticker);
            }
        }
        tickers
    }

    /// Map each schema column to its index in the raw header rows.
    fn resolve(
        &self,
        tickers_row: &StringRecord,
        fields_row: &StringRecord,
    ) -> Result<HashMap<ColumnKey, usize>> {
        let mut found: HashMap<ColumnKey, usize> = HashMap::new();

        // Column 0 holds the row labels.
        let labelled = tickers_row.iter().zip(fields_row.iter()).enumerate();
        for (idx, (ticker, field)) in labelled.skip(1) {
            let Some(field) = PriceField::parse(field) else {
                continue;
            };
            let key = ColumnKey {
                ticker: ticker.trim().to_uppercase(),
                field,
            };
            if found.insert(key.clone(), idx).is_some() {
                return Err(Error::Schema(format!(
                    "column {} {} appears more than once",
                    key.ticker, key.field
                )));
            }
        }

        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|key| !found.contains_key(key))
            .map(|key| format!("{}.{}", key.ticker, key.field))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Schema(format!(
                "raw download is missing columns: {}",
                missing.join(", ")
            )));
        }

        found.retain(|key, _| self.columns.contains(key));
        Ok(found)
    }
}

/// Reshape a raw wide download into one record per (ticker, date).
///
/// Rows without a close for a ticker are skipped for that ticker. Records
/// come back sorted by (date, ticker).
pub fn reshape_wide<R: Read>(reader: R, schema: &WideSchema) -> Result<Vec<PriceRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = reader.records();

    let first = rows
        .next()
        .transpose()?
        .ok_or_else(|| Error::Schema("raw download is empty".to_string()))?;
    let second = rows
        .next()
        .transpose()?
        .ok_or_else(|| Error::Schema("raw download has a single header row".to_string()))?;

    // Either header order is accepted; the labelled "Price" row holds fields.
    let (tickers_row, fields_row) = if label_of(&first).eq_ignore_ascii_case("price") {
        (second, first)
    } else {
        (first, second)
    };
    let columns = schema.resolve(&tickers_row, &fields_row)?;
    let tickers = schema.tickers();

    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        let row = row?;
        let line = offset + 3;
        let label = label_of(&row);
        if label.is_empty() || label.eq_ignore_ascii_case("date") {
            continue;
        }
        let date = parse_date(label)
            .ok_or_else(|| Error::Schema(format!("line {line}: invalid date {label:?}")))?;

        for &ticker in &tickers {
            let cell = |field: PriceField| -> Result<Option<f64>> {
                let key = ColumnKey {
                    ticker: ticker.to_string(),
                    field,
                };
                match columns.get(&key).and_then(|&idx| row.get(idx)) {
                    Some(raw) => parse_number(raw).map_err(|_| {
                        Error::Schema(format!("line {line}: invalid {ticker} {field} {raw:?}"))
                    }),
                    None => Ok(None),
                }
            };

            let Some(close) = cell(PriceField::Close)? else {
                continue;
            };
            let (Some(open), Some(high), Some(low)) = (
                cell(PriceField::Open)?,
                cell(PriceField::High)?,
                cell(PriceField::Low)?,
            ) else {
                tracing::warn!(%ticker, %date, "Close present without open/high/low, row skipped");
                continue;
            };

            records.push(PriceRecord {
                date,
                ticker: ticker.to_string(),
                open,
                high,
                low,
                close,
                volume: cell(PriceField::Volume)?.unwrap_or(0.0),
            });
        }
    }

    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));
    tracing::info!(
        records = records.len(),
        tickers = tickers.len(),
        "Reshaped raw price download"
    );
    Ok(records)
}

fn label_of(row: &StringRecord) -> &str {
    row.get(0).map(str::trim).unwrap_or("")
}

/// Accepts `YYYY-MM-DD` optionally followed by a time component.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_number(raw: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed.parse::<f64>().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "\
Ticker,AAPL,AAPL,AAPL,AAPL,AAPL,MSFT,MSFT,MSFT,MSFT,MSFT
Price,Open,High,Low,Close,Volume,Open,High,Low,Close,Volume
Date,,,,,,,,,,
2024-01-02,187.1,188.4,183.9,185.6,82488700,373.9,375.9,366.8,370.9,25258600
2024-01-03,184.2,185.9,183.4,184.3,58414500,,,,,
";

    #[test]
    fn test_reshape_wide_download() {
        let schema = WideSchema::ohlcv(&["aapl", "msft"]);
        let records = reshape_wide(RAW.as_bytes(), &schema).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].ticker, "AAPL");
        assert_eq!(records[0].close, 185.6);
        assert_eq!(records[1].ticker, "MSFT");
        assert_eq!(records[1].volume, 25258600.0);
        // MSFT has no close on the second date
        assert_eq!(records[2].ticker, "AAPL");
        assert_eq!(records[2].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_field_header_first_is_accepted() {
        let raw = "\
Price,Close,Open,High,Low,Volume
Ticker,SPY,SPY,SPY,SPY,SPY
2024-01-02 00:00:00+00:00,472.6,476.2,476.4,470.5,123623700
";
        let records = reshape_wide(raw.as_bytes(), &WideSchema::ohlcv(&["SPY"])).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].close, 472.6);
        assert_eq!(records[0].open, 476.2);
    }

    #[test]
    fn test_missing_schema_column_is_reported() {
        let schema = WideSchema::ohlcv(&["AAPL", "NVDA"]);
        let err = reshape_wide(RAW.as_bytes(), &schema).unwrap_err();

        match err {
            Error::Schema(msg) => assert!(msg.contains("NVDA.Close")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let raw = "\
Ticker,AAPL,AAPL,AAPL,AAPL,AAPL
Price,Open,High,Low,Close,Volume
2024-01-02,1,1,1,abc,1
";
        let err = reshape_wide(raw.as_bytes(), &WideSchema::ohlcv(&["AAPL"])).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_price_field_parse() {
        assert_eq!(PriceField::parse(" close "), Some(PriceField::Close));
        assert_eq!(PriceField::parse("Adj Close"), None);
    }
}
