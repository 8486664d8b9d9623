use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::MarketDataError;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One trading day of OHLCV data, dated in the exchange's local calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

// ---------------------------------------------------------------------------
// PriceSeries -- validated, immutable bar sequence
// ---------------------------------------------------------------------------

/// Bars in strictly ascending date order, one per trading day, with finite
/// non-negative prices and volumes. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Validate `bars` and wrap them.
    ///
    /// Fails with [`MarketDataError::MalformedRow`] naming the first offending
    /// row. An empty input is valid; callers decide whether that is an error.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, MarketDataError> {
        for (row, bar) in bars.iter().enumerate() {
            let fields = [
                ("open", bar.open),
                ("high", bar.high),
                ("low", bar.low),
                ("close", bar.close),
                ("volume", bar.volume),
            ];
            for (name, value) in fields {
                if !value.is_finite() || value < 0.0 {
                    return Err(MarketDataError::MalformedRow {
                        row,
                        reason: format!("{name} is {value}"),
                    });
                }
            }

            if row > 0 && bars[row - 1].date >= bar.date {
                return Err(MarketDataError::MalformedRow {
                    row,
                    reason: format!(
                        "date {} does not follow {}",
                        bar.date,
                        bars[row - 1].date
                    ),
                });
            }
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Close prices in bar order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// The bar before the last one, if the series has at least two bars.
    pub fn previous(&self) -> Option<&PriceBar> {
        self.bars.len().checked_sub(2).and_then(|i| self.bars.get(i))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
