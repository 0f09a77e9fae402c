//! CSV loading of holdings and cleaned prices.
//!
//! Header names are matched case-insensitively, so both `purchase_price`
//! and `Purchase_Price` style files load.

use crate::holdings::HoldingsLedger;
use crate::market::{reshape_wide, PriceHistory, WideSchema};
use crate::types::{Holding, PriceRecord};
use crate::Result;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Load and validate a holdings file.
pub fn read_holdings(path: impl AsRef<Path>) -> Result<HoldingsLedger> {
    let path = path.as_ref();
    let ledger = parse_holdings(File::open(path)?)?;
    tracing::debug!(path = %path.display(), positions = ledger.len(), "Loaded holdings");
    Ok(ledger)
}

/// Load a cleaned price file into the price history store.
pub fn read_prices(path: impl AsRef<Path>) -> Result<PriceHistory> {
    let path = path.as_ref();
    let history = parse_prices(File::open(path)?)?;
    tracing::debug!(path = %path.display(), rows = history.len(), "Loaded prices");
    Ok(history)
}

pub fn parse_holdings<R: Read>(reader: R) -> Result<HoldingsLedger> {
    HoldingsLedger::new(read_rows::<Holding, R>(reader)?)
}

pub fn parse_prices<R: Read>(reader: R) -> Result<PriceHistory> {
    PriceHistory::new(read_rows::<PriceRecord, R>(reader)?)
}

/// Reshape a raw wide download file using an explicit column schema.
pub fn read_raw_download(path: impl AsRef<Path>, schema: &WideSchema) -> Result<Vec<PriceRecord>> {
    reshape_wide(File::open(path.as_ref())?, schema)
}

/// Write cleaned price records with snake_case headers.
pub fn write_prices(path: impl AsRef<Path>, records: &[PriceRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers: StringRecord = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    reader.set_headers(headers);

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
