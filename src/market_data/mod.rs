pub mod price_bar;
pub mod source;

// Re-export the core types for convenient access (e.g. `use crate::market_data::PriceBar`).
pub use price_bar::{PriceBar, PriceSeries};
pub use source::{FetchedHistory, MarketDataSource};
