use async_trait::async_trait;

use crate::error::MarketDataError;
use crate::market_data::PriceBar;
use crate::types::{Period, Ticker};

/// Bars returned by a provider plus the number of partial rows it dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedHistory {
    pub bars: Vec<PriceBar>,
    pub skipped_rows: usize,
}

/// Provider of daily OHLCV history.
///
/// Implementations return bars in ascending date order. An unknown ticker is
/// reported as [`MarketDataError::Empty`].
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_history(
        &self,
        ticker: &Ticker,
        period: Period,
    ) -> Result<FetchedHistory, MarketDataError>;
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------
