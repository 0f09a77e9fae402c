//! Holdings ledger: the static list of owned positions.

use crate::types::Holding;
use crate::{Error, Result};

/// Validated, read-only list of holdings in input order.
#[derive(Debug, Clone, Default)]
pub struct HoldingsLedger {
    holdings: Vec<Holding>,
}

impl HoldingsLedger {
    /// Build a ledger, normalizing tickers and rejecting non-positive
    /// share counts or purchase prices.
    pub fn new(holdings: Vec<Holding>) -> Result<Self> {
        let mut validated = Vec::with_capacity(holdings.len());

        for mut holding in holdings {
            holding.ticker = holding.ticker.trim().to_uppercase();

            if holding.ticker.is_empty() {
                return Err(Error::InvalidHolding {
                    ticker: holding.ticker,
                    reason: "empty ticker".to_string(),
                });
            }
            if !(holding.shares.is_finite() && holding.shares > 0.0) {
                return Err(Error::InvalidHolding {
                    reason: format!("shares must be positive, got {}", holding.shares),
                    ticker: holding.ticker,
                });
            }
            if !(holding.purchase_price.is_finite() && holding.purchase_price > 0.0) {
                return Err(Error::InvalidHolding {
                    reason: format!(
                        "purchase_price must be positive, got {}",
                        holding.purchase_price
                    ),
                    ticker: holding.ticker,
                });
            }

            validated.push(holding);
        }

        Ok(Self {
            holdings: validated,
        })
    }

    /// All holdings in input order.
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Holding> {
        self.holdings.iter()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Distinct tickers in order of first occurrence.
    pub fn tickers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for holding in &self.holdings {
            if !seen.contains(&holding.ticker.as_str()) {
                seen.push(holding.ticker.as_str());
            }
        }
        seen
    }

    /// First holding for a ticker (case insensitive).
    pub fn find(&self, ticker: &str) -> Option<&Holding> {
        let ticker_upper = ticker.to_uppercase();
        self.holdings.iter().find(|h| h.ticker == ticker_upper)
    }

    /// Total cost basis of all holdings.
    pub fn total_cost_basis(&self) -> f64 {
        self.holdings.iter().map(|h| h.cost_basis()).sum()
    }
}

impl<'a> IntoIterator for &'a HoldingsLedger {
    type Item = &'a Holding;
    type IntoIter = std::slice::Iter<'a, Holding>;

    fn into_iter(self) -> Self::IntoIter {
        self.holdings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn holding(ticker: &str, shares: f64, price: f64) -> Holding {
        Holding::new(
            ticker,
            "Test Asset",
            "Equity",
            shares,
            price,
            NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
        )
    }

    #[test]
    fn test_ledger_normalizes_tickers() {
        let mut raw = holding("aapl", 10.0, 150.0);
        raw.ticker = " aapl ".to_string();

        let ledger = HoldingsLedger::new(vec![raw]).unwrap();
        assert_eq!(ledger.holdings()[0].ticker, "AAPL");
        assert!(ledger.find("Aapl").is_some());
    }

    #[test]
    fn test_ledger_rejects_zero_shares() {
        let result = HoldingsLedger::new(vec![holding("AAPL", 0.0, 150.0)]);
        assert!(matches!(result, Err(Error::InvalidHolding { ticker, .. }) if ticker == "AAPL"));
    }

    #[test]
    fn test_ledger_rejects_negative_price() {
        let result = HoldingsLedger::new(vec![holding("MSFT", 5.0, -1.0)]);
        assert!(matches!(result, Err(Error::InvalidHolding { .. })));
    }

    #[test]
    fn test_tickers_first_occurrence_order() {
        let ledger = HoldingsLedger::new(vec![
            holding("MSFT", 1.0, 1.0),
            holding("AAPL", 1.0, 1.0),
            holding("MSFT", 2.0, 1.0),
        ])
        .unwrap();

        assert_eq!(ledger.tickers(), vec!["MSFT", "AAPL"]);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_total_cost_basis() {
        let ledger = HoldingsLedger::new(vec![
            holding("AAPL", 10.0, 150.0),
            holding("GOOGL", 5.0, 100.0),
        ])
        .unwrap();

        assert_eq!(ledger.total_cost_basis(), 2000.0);
    }
}
