// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators shown on the
// dashboard. Every `calculate_*` function returns a series aligned
// index-for-index with its input: `None` marks positions where the window has
// not accumulated enough history (or touched a non-finite value). The
// `latest_*` helpers turn "no value at the last index" into an
// `IndicatorError::InsufficientData` so callers report it per indicator.

pub mod rsi;
pub mod sma;

use crate::error::IndicatorError;

/// A derived series aligned with the source bars.
pub type Series = Vec<Option<f64>>;

/// Last defined-at-tail value of `series`, or an insufficient-data error
/// naming `indicator` and the number of bars it needed.
pub(crate) fn latest_value(
    series: &Series,
    indicator: &str,
    required: usize,
) -> Result<f64, IndicatorError> {
    match series.last() {
        Some(Some(value)) => Ok(*value),
        _ => Err(IndicatorError::InsufficientData {
            indicator: indicator.to_string(),
            required,
            available: series.len(),
        }),
    }
}
