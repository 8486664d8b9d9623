// =============================================================================
// Shared types used across the Dalal Lens dashboard
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// History window requested from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
    ];

    /// Token understood by the provider's `range` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == token)
            .ok_or_else(|| {
                format!(
                    "unknown period '{s}', expected one of: 1mo, 3mo, 6mo, 1y, 2y, 5y"
                )
            })
    }
}

/// Listing venue inferred from the ticker suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Nse,
    Bse,
    Other,
}

impl Exchange {
    /// Same token the venue serialises to.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BSE",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised ticker symbol, e.g. `RELIANCE.NS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Trim and upper-case `raw`, rejecting empty input and characters the
    /// provider never uses in symbols.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err("ticker must not be empty".to_string());
        }
        if let Some(bad) = symbol
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '&' | '^' | '_')))
        {
            return Err(format!("ticker '{symbol}' contains invalid character '{bad}'"));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn exchange(&self) -> Exchange {
        if self.0.ends_with(".NS") {
            Exchange::Nse
        } else if self.0.ends_with(".BO") {
            Exchange::Bse
        } else {
            Exchange::Other
        }
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entry of the quick-pick list shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularStock {
    pub name: String,
    pub ticker: String,
}

impl PopularStock {
    pub fn new(name: &str, ticker: &str) -> Self {
        Self {
            name: name.to_string(),
            ticker: ticker.to_string(),
        }
    }
}
