// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the last `window` closes:
//   SMA_i = (close_{i-W+1} + ... + close_i) / W      for i >= W - 1
//
// Positions before the first full window are undefined.
// =============================================================================

use super::{latest_value, Series};
use crate::error::IndicatorError;

/// Compute the SMA series for `closes` over `window` bars.
///
/// The result always has `closes.len()` entries.
///
/// # Edge cases
/// - `window == 0` => every entry `None`
/// - `closes.len() < window` => every entry `None`
/// - A window containing a non-finite close => `None` at that index
pub fn calculate_sma(closes: &[f64], window: usize) -> Series {
    let mut result = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return result;
    }

    let divisor = window as f64;
    for (offset, slice) in closes.windows(window).enumerate() {
        let mean = slice.iter().sum::<f64>() / divisor;
        if mean.is_finite() {
            result[offset + window - 1] = Some(mean);
        }
    }

    result
}

/// Most recent value of an SMA series, e.g. the "MA 20" metric.
pub fn latest_sma(series: &Series, window: usize) -> Result<f64, IndicatorError> {
    latest_value(series, &sma_label(window), window.max(1))
}

/// Display name used in reports and errors: `MA20`, `MA50`, ...
pub fn sma_label(window: usize) -> String {
    format!("MA{window}")
}
