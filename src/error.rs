// =============================================================================
// Error taxonomy
// =============================================================================
//
// Domain failures are typed so the API layer can map each one to a status
// code and a user-facing message. Plumbing (config, startup) stays on
// `anyhow`.
// =============================================================================

use thiserror::Error;

/// Failures while obtaining or validating the raw OHLCV bars.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketDataError {
    /// The provider returned no usable rows (unknown or delisted ticker).
    #[error("no data found for {ticker}")]
    Empty { ticker: String },

    /// A row is missing a field or violates the series invariants.
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    /// Network, HTTP or provider-side error.
    #[error("market data provider failed: {0}")]
    Provider(String),
}

/// Failure of a single indicator. Never aborts the rest of the report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("insufficient data for {indicator}: need {required} bars, have {available}")]
    InsufficientData {
        indicator: String,
        required: usize,
        available: usize,
    },
}

/// Request-level failure of one analysis cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),
}

impl AnalysisError {
    /// Short follow-up suggestion shown next to the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MarketData(MarketDataError::Empty { .. }) => Some(
                "Make sure to use the .NS suffix for NSE stocks (e.g. TCS.NS) or .BO for BSE",
            ),
            Self::MarketData(MarketDataError::Provider(_)) => {
                Some("Please check the ticker symbol and try again")
            }
            Self::InvalidRequest(_) => Some("Format: SYMBOL.NS (e.g. TCS.NS)"),
            Self::MarketData(MarketDataError::MalformedRow { .. }) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_carries_suffix_hint() {
        let err = AnalysisError::from(MarketDataError::Empty {
            ticker: "RELIANCE".into(),
        });
        assert_eq!(err.to_string(), "no data found for RELIANCE");
        assert!(err.hint().unwrap().contains(".NS"));
    }

    #[test]
    fn insufficient_data_message() {
        let err = IndicatorError::InsufficientData {
            indicator: "MA50".into(),
            required: 50,
            available: 21,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for MA50: need 50 bars, have 21"
        );
    }
}
