// =============================================================================
// Relative Strength Index (RSI) — rolling-mean (Cutler) variant
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Split into gains (positive deltas) and losses (|negative deltas|).
// Step 3: Take the simple mean of the last `period` gains / losses.
// Step 4: RS  = avg_gain / avg_loss
//         RSI = 100 - 100 / (1 + RS)
//
// The first value needs `period` deltas, i.e. it lands at index `period`.
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::{latest_value, Series};
use crate::error::IndicatorError;

/// Default look-back used by the dashboard.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Momentum classification of an RSI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiSignal {
    /// Strictly above `overbought` or strictly below `oversold`; anything in
    /// between (inclusive) is neutral.
    pub fn classify(value: f64, overbought: f64, oversold: f64) -> Self {
        if value > overbought {
            Self::Overbought
        } else if value < oversold {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

impl std::fmt::Display for RsiSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "Overbought"),
            Self::Oversold => write!(f, "Oversold"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Compute the full RSI series for the given `closes` and `period`.
///
/// The returned vector has `closes.len()` entries; entries `0..period` are
/// always `None`.
///
/// # Edge cases
/// - `period == 0` => every entry `None`
/// - `closes.len() < period + 1` => every entry `None`
/// - Average loss zero with some gain => 100.0
/// - Average loss and gain both zero (flat window) => 50.0
/// - A window touching a non-finite close => `None` at that index
pub fn calculate_rsi(closes: &[f64], period: usize) -> Series {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    // deltas[j] is the change from close j to close j + 1.
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    for (offset, window) in deltas.windows(period).enumerate() {
        let (sum_gain, sum_loss) = window.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d.is_nan() {
                (f64::NAN, f64::NAN)
            } else if d > 0.0 {
                (g + d, l)
            } else {
                (g, l + d.abs())
            }
        });

        result[offset + period] = rsi_from_averages(sum_gain / period_f, sum_loss / period_f);
    }

    result
}

/// Most recent value of an RSI series together with its signal.
pub fn latest_rsi(
    series: &Series,
    period: usize,
    overbought: f64,
    oversold: f64,
) -> Result<(f64, RsiSignal), IndicatorError> {
    let value = latest_value(series, &rsi_label(period), period + 1)?;
    Ok((value, RsiSignal::classify(value, overbought, oversold)))
}

/// Display name used in reports and errors: `RSI(14)`.
pub fn rsi_label(period: usize) -> String {
    format!("RSI({period})")
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If both averages are zero, RSI is 50.0 (no movement).
/// - If average loss is zero (only gains), RSI is 100.0.
/// - Returns `None` when either average is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }

    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    // ---- calculate_rsi ---------------------------------------------------

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
        assert!(latest_rsi(&calculate_rsi(&[], 14), 14, 70.0, 30.0).is_err());
    }

    #[test]
    fn rsi_period_zero() {
        assert_eq!(calculate_rsi(&[1.0, 2.0, 3.0], 0), vec![None, None, None]);
    }

    #[test]
    fn rsi_insufficient_data() {
        // Need period+1 closes (period deltas). 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 14);
        assert!(series.iter().all(Option::is_none));

        let err = latest_rsi(&series, 14, 70.0, 30.0).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                indicator: "RSI(14)".into(),
                required: 15,
                available: 14,
            }
        );
    }

    #[test]
    fn rsi_undefined_before_period() {
        let closes: Vec<f64> = (1..=20).map(|x| (x as f64).sin() + 10.0).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 20);
        assert!(series[..14].iter().all(Option::is_none));
        assert!(series[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_all_gains() {
        // Strictly ascending prices => RSI should be 100.
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        for v in series.iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
        assert_eq!(series.iter().flatten().count(), 16);
    }

    #[test]
    fn rsi_all_losses() {
        // Strictly descending prices => RSI should be 0.
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert!(series.iter().flatten().count() > 0);
        for v in series.iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market() {
        // No price change at all => RSI = 50 (neutral).
        let closes = vec![100.0; 30];
        let series = calculate_rsi(&closes, 14);
        for v in series.iter().flatten() {
            assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
        }
    }

    #[test]
    fn rsi_range_check() {
        // Arbitrary data; RSI must always be in [0, 100].
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let series = calculate_rsi(&closes, 14);
        assert!(series.iter().flatten().count() > 0);
        for &v in series.iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_known_value() {
        // period 2, closes 10 -> 12 -> 11: gains [2, 0], losses [0, 1]
        // avg_gain = 1.0, avg_loss = 0.5, RS = 2 => RSI = 100 - 100/3
        let series = calculate_rsi(&[10.0, 12.0, 11.0], 2);
        let expected = 100.0 - 100.0 / 3.0;
        assert_eq!(series[..2], [None, None]);
        assert!((series[2].unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn rsi_non_finite_window_is_undefined() {
        let mut closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        closes[16] = f64::NAN;
        let series = calculate_rsi(&closes, 3);
        // Windows that include a delta touching index 16 are undefined.
        assert!(series[16].is_none());
        assert!(series[17].is_none());
        assert!(series[19].is_none());
        assert_eq!(series[15], Some(100.0));
    }

    // ---- latest_rsi ------------------------------------------------------

    #[test]
    fn latest_rsi_overbought() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let (val, signal) = latest_rsi(&calculate_rsi(&closes, 14), 14, 70.0, 30.0).unwrap();
        assert!((val - 100.0).abs() < 1e-10);
        assert_eq!(signal, RsiSignal::Overbought);
    }

    #[test]
    fn latest_rsi_oversold() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let (val, signal) = latest_rsi(&calculate_rsi(&closes, 14), 14, 70.0, 30.0).unwrap();
        assert!(val.abs() < 1e-10);
        assert_eq!(signal, RsiSignal::Oversold);
    }

    #[test]
    fn latest_rsi_neutral() {
        let closes = vec![100.0; 30];
        let (val, signal) = latest_rsi(&calculate_rsi(&closes, 14), 14, 70.0, 30.0).unwrap();
        assert!((val - 50.0).abs() < 1e-10);
        assert_eq!(signal, RsiSignal::Neutral);
    }

    #[test]
    fn signal_thresholds_are_strict() {
        assert_eq!(RsiSignal::classify(70.0, 70.0, 30.0), RsiSignal::Neutral);
        assert_eq!(RsiSignal::classify(70.01, 70.0, 30.0), RsiSignal::Overbought);
        assert_eq!(RsiSignal::classify(30.0, 70.0, 30.0), RsiSignal::Neutral);
        assert_eq!(RsiSignal::classify(29.99, 70.0, 30.0), RsiSignal::Oversold);
    }
}
