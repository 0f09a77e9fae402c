//! Market data module.
//!
//! Holds the cleaned price history and the reshaping step that turns a raw
//! wide download into per-ticker records.

mod ingest;
mod store;

pub use ingest::{reshape_wide, ColumnKey, PriceField, WideSchema};
pub use store::PriceHistory;
