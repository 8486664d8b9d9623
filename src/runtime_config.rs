// =============================================================================
// Runtime Configuration — dashboard settings loaded at startup
// =============================================================================
//
// Every tunable lives here: where to listen, where to fetch from, which
// period the sidebar starts on, the quick-pick stock list and the indicator
// windows.
//
// All fields carry `#[serde(default)]` so that a partial (or missing) config
// file still yields a complete configuration. A handful of environment
// variables override the file for container deployments.
// =============================================================================

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Period, PopularStock};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_provider_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_popular_stocks() -> Vec<PopularStock> {
    vec![
        PopularStock::new("Reliance Industries", "RELIANCE.NS"),
        PopularStock::new("Tata Consultancy Services", "TCS.NS"),
        PopularStock::new("Infosys", "INFY.NS"),
        PopularStock::new("HDFC Bank", "HDFCBANK.NS"),
        PopularStock::new("ITC Limited", "ITC.NS"),
        PopularStock::new("ICICI Bank", "ICICIBANK.NS"),
        PopularStock::new("State Bank of India", "SBIN.NS"),
        PopularStock::new("Bharti Airtel", "BHARTIARTL.NS"),
        PopularStock::new("Wipro", "WIPRO.NS"),
        PopularStock::new("Hindustan Unilever", "HINDUNILVR.NS"),
    ]
}

fn default_ma_short() -> usize {
    20
}

fn default_ma_long() -> usize {
    50
}

fn default_rsi_period() -> usize {
    crate::indicators::rsi::DEFAULT_RSI_PERIOD
}

fn default_rsi_overbought() -> f64 {
    70.0
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_recent_rows() -> usize {
    10
}

// =============================================================================
// IndicatorSettings
// =============================================================================

/// Windows and thresholds for the indicator panel and recent-data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    /// Short moving average window (MA20).
    #[serde(default = "default_ma_short")]
    pub ma_short: usize,

    /// Long moving average window (MA50).
    #[serde(default = "default_ma_long")]
    pub ma_long: usize,

    /// RSI look-back.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// RSI strictly above this reads as overbought.
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,

    /// RSI strictly below this reads as oversold.
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// Rows in the recent trading data table.
    #[serde(default = "default_recent_rows")]
    pub recent_rows: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ma_short: default_ma_short(),
            ma_long: default_ma_long(),
            rsi_period: default_rsi_period(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            recent_rows: default_recent_rows(),
        }
    }
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the dashboard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Address the HTTP API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the chart API (no trailing slash).
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Per-request timeout for provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Period used when a request does not name one.
    #[serde(default)]
    pub default_period: Period,

    /// Quick-pick list for the sidebar.
    #[serde(default = "default_popular_stocks")]
    pub popular_stocks: Vec<PopularStock>,

    #[serde(default)]
    pub indicators: IndicatorSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            provider_url: default_provider_url(),
            request_timeout_secs: default_request_timeout_secs(),
            default_period: Period::default(),
            popular_stocks: default_popular_stocks(),
            indicators: IndicatorSettings::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;
        config.provider_url = config.provider_url.trim_end_matches('/').to_string();

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            default_period = %config.default_period,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Apply `DALAL_*` overrides from the given lookup (normally
    /// `std::env::var`). Invalid values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("DALAL_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(url) = lookup("DALAL_PROVIDER_URL") {
            self.provider_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("DALAL_DEFAULT_PERIOD") {
            match raw.parse::<Period>() {
                Ok(period) => self.default_period = period,
                Err(e) => warn!(error = %e, "ignoring DALAL_DEFAULT_PERIOD"),
            }
        }
    }

    /// Reject settings that would make every request fail or every
    /// indicator section permanently unavailable.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if self.provider_url.is_empty() {
            bail!("provider_url must not be empty");
        }
        self.indicators.validate()
    }
}

impl IndicatorSettings {
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("ma_short", self.ma_short),
            ("ma_long", self.ma_long),
            ("rsi_period", self.rsi_period),
            ("recent_rows", self.recent_rows),
        ];
        for (name, value) in windows {
            if value == 0 {
                bail!("indicators.{name} must be at least 1");
            }
        }
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.rsi_oversold) || !in_range(self.rsi_overbought) {
            bail!(
                "RSI thresholds must lie in [0, 100], got oversold {} / overbought {}",
                self.rsi_oversold,
                self.rsi_overbought
            );
        }
        if self.rsi_oversold >= self.rsi_overbought {
            bail!(
                "rsi_oversold ({}) must be below rsi_overbought ({})",
                self.rsi_oversold,
                self.rsi_overbought
            );
        }
        Ok(())
    }
}
