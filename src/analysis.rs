// =============================================================================
// Analysis Pipeline — one fetch-and-compute cycle per request
// =============================================================================
//
// A request names its ticker and period explicitly; nothing is remembered
// between requests. The cycle is:
//
//   1. Fetch daily bars from the market data source.
//   2. Validate them into a `PriceSeries`.
//   3. Run each derived output as an independent step. A step that fails
//      (e.g. MA50 on 30 bars) becomes an `unavailable` section; the other
//      sections are still reported.
//
// Steps 1–2 abort the cycle on failure. Step 3 is `build_report`, a pure
// function of the series and the indicator settings.
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{AnalysisError, IndicatorError, MarketDataError};
use crate::indicators::rsi::{calculate_rsi, latest_rsi, rsi_label, RsiSignal};
use crate::indicators::sma::{calculate_sma, latest_sma, sma_label};
use crate::indicators::Series;
use crate::market_data::{MarketDataSource, PriceBar, PriceSeries};
use crate::runtime_config::IndicatorSettings;
use crate::types::{Exchange, Period, Ticker};

// =============================================================================
// Request
// =============================================================================

/// Explicit parameters of one analysis cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub ticker: Ticker,
    pub period: Period,
}

impl AnalysisRequest {
    /// Build a request from raw query values, falling back to
    /// `default_period` when no period is given.
    pub fn parse(
        ticker: Option<&str>,
        period: Option<&str>,
        default_period: Period,
    ) -> Result<Self, AnalysisError> {
        let ticker = Ticker::parse(ticker.unwrap_or_default())
            .map_err(AnalysisError::InvalidRequest)?;
        let period = match period.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => raw.parse().map_err(AnalysisError::InvalidRequest)?,
            None => default_period,
        };
        Ok(Self { ticker, period })
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Outcome of one independent step, as shown to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ready { data: T },
    Unavailable { reason: String },
}

impl<T> Section<T> {
    fn from_step<E: std::fmt::Display>(name: &str, outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(data) => Self::Ready { data },
            Err(e) => {
                warn!(section = name, reason = %e, "section unavailable");
                Self::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready { data } => Some(data),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

// =============================================================================
// Report payloads
// =============================================================================

/// Headline numbers for the last session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceMetrics {
    pub as_of: NaiveDate,
    pub current_price: f64,
    /// `None` with a single bar.
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    /// `None` with a single bar or a zero previous close.
    pub change_pct: Option<f64>,
    pub day_high: f64,
    pub day_low: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandlePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumePoint {
    pub date: NaiveDate,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Moving-average panel entry: latest value plus the chart overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverageReading {
    pub label: String,
    pub window: usize,
    pub latest: f64,
    pub series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiReading {
    pub label: String,
    pub period: usize,
    pub latest: f64,
    pub signal: RsiSignal,
    pub series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPanel {
    pub ma_short: Section<MovingAverageReading>,
    pub ma_long: Section<MovingAverageReading>,
    pub rsi: Section<RsiReading>,
}

/// Row of the recent trading data table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub rsi: Option<f64>,
}

/// Every derived output of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSections {
    pub metrics: Section<PriceMetrics>,
    pub candles: Section<Vec<CandlePoint>>,
    pub volume: Section<Vec<VolumePoint>>,
    pub indicators: IndicatorPanel,
    pub recent: Section<Vec<RecentRow>>,
}

/// Full response of one analysis cycle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub ticker: Ticker,
    pub exchange: Exchange,
    pub period: Period,
    pub bar_count: usize,
    pub skipped_rows: usize,
    #[serde(flatten)]
    pub sections: ReportSections,
}

// =============================================================================
// Cycle
// =============================================================================

/// Run one fetch-and-compute cycle.
///
/// Fetch failures, empty results and malformed rows abort the cycle; anything
/// after validation is reported per section.
#[instrument(
    skip_all,
    fields(ticker = %request.ticker, exchange = %request.ticker.exchange(), period = %request.period)
)]
pub async fn analyze(
    source: &dyn MarketDataSource,
    request: &AnalysisRequest,
    settings: &IndicatorSettings,
) -> Result<AnalysisReport, AnalysisError> {
    let history = source
        .fetch_history(&request.ticker, request.period)
        .await
        .inspect_err(|e| warn!(error = %e, "market data fetch failed"))?;

    let series = PriceSeries::new(history.bars)?;
    if series.is_empty() {
        return Err(MarketDataError::Empty {
            ticker: request.ticker.to_string(),
        }
        .into());
    }

    let sections = build_report(&series, settings);

    let ready = [
        sections.metrics.is_ready(),
        sections.indicators.ma_short.is_ready(),
        sections.indicators.ma_long.is_ready(),
        sections.indicators.rsi.is_ready(),
    ];
    info!(
        bars = series.len(),
        skipped = history.skipped_rows,
        ready = ready.iter().filter(|r| **r).count(),
        last_close = ?sections.metrics.data().map(|m| m.current_price),
        rsi = ?sections.indicators.rsi.data().map(|r| r.latest),
        "analysis complete"
    );

    Ok(AnalysisReport {
        id: uuid::Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        ticker: request.ticker.clone(),
        exchange: request.ticker.exchange(),
        period: request.period,
        bar_count: series.len(),
        skipped_rows: history.skipped_rows,
        sections,
    })
}

/// Indicator series for `closes`, aligned with the bars.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub ma_short: Series,
    pub ma_long: Series,
    pub rsi: Series,
}

/// Compute every indicator series configured in `settings`.
pub fn compute_indicators(closes: &[f64], settings: &IndicatorSettings) -> IndicatorSet {
    IndicatorSet {
        ma_short: calculate_sma(closes, settings.ma_short),
        ma_long: calculate_sma(closes, settings.ma_long),
        rsi: calculate_rsi(closes, settings.rsi_period),
    }
}

/// Derive every dashboard section from a validated series. Pure.
pub fn build_report(series: &PriceSeries, settings: &IndicatorSettings) -> ReportSections {
    let bars = series.bars();
    let indicators = compute_indicators(&series.closes(), settings);

    ReportSections {
        metrics: Section::from_step("metrics", price_metrics(series)),
        candles: Section::from_step("candles", candle_points(bars)),
        volume: Section::from_step("volume", volume_points(bars)),
        indicators: IndicatorPanel {
            ma_short: Section::from_step(
                "ma_short",
                moving_average_reading(bars, &indicators.ma_short, settings.ma_short),
            ),
            ma_long: Section::from_step(
                "ma_long",
                moving_average_reading(bars, &indicators.ma_long, settings.ma_long),
            ),
            rsi: Section::from_step("rsi", rsi_reading(bars, &indicators.rsi, settings)),
        },
        recent: Section::from_step(
            "recent",
            recent_rows(bars, &indicators, settings.recent_rows),
        ),
    }
}

// =============================================================================
// Steps
// =============================================================================

fn no_bars(what: &str) -> IndicatorError {
    IndicatorError::InsufficientData {
        indicator: what.to_string(),
        required: 1,
        available: 0,
    }
}

fn require_bars(bars: &[PriceBar], what: &str) -> Result<(), IndicatorError> {
    if bars.is_empty() {
        return Err(no_bars(what));
    }
    Ok(())
}

fn price_metrics(series: &PriceSeries) -> Result<PriceMetrics, IndicatorError> {
    let last = series.last().ok_or_else(|| no_bars("price metrics"))?;

    let previous_close = series.previous().map(|b| b.close);
    let change = previous_close.map(|prev| last.close - prev);
    let change_pct = previous_close
        .zip(change)
        .filter(|(prev, _)| *prev != 0.0)
        .map(|(prev, change)| change / prev * 100.0);

    Ok(PriceMetrics {
        as_of: last.date,
        current_price: last.close,
        previous_close,
        change,
        change_pct,
        day_high: last.high,
        day_low: last.low,
        volume: last.volume,
    })
}

fn candle_points(bars: &[PriceBar]) -> Result<Vec<CandlePoint>, IndicatorError> {
    require_bars(bars, "price chart")?;
    Ok(bars
        .iter()
        .map(|b| CandlePoint {
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
        })
        .collect())
}

fn volume_points(bars: &[PriceBar]) -> Result<Vec<VolumePoint>, IndicatorError> {
    require_bars(bars, "volume chart")?;
    Ok(bars
        .iter()
        .map(|b| VolumePoint {
            date: b.date,
            volume: b.volume,
        })
        .collect())
}

fn dated(bars: &[PriceBar], series: &Series) -> Vec<SeriesPoint> {
    bars.iter()
        .zip(series.iter())
        .map(|(bar, value)| SeriesPoint {
            date: bar.date,
            value: *value,
        })
        .collect()
}

fn moving_average_reading(
    bars: &[PriceBar],
    series: &Series,
    window: usize,
) -> Result<MovingAverageReading, IndicatorError> {
    let latest = latest_sma(series, window)?;
    Ok(MovingAverageReading {
        label: sma_label(window),
        window,
        latest,
        series: dated(bars, series),
    })
}

fn rsi_reading(
    bars: &[PriceBar],
    series: &Series,
    settings: &IndicatorSettings,
) -> Result<RsiReading, IndicatorError> {
    let (latest, signal) = latest_rsi(
        series,
        settings.rsi_period,
        settings.rsi_overbought,
        settings.rsi_oversold,
    )?;
    Ok(RsiReading {
        label: rsi_label(settings.rsi_period),
        period: settings.rsi_period,
        latest,
        signal,
        series: dated(bars, series),
    })
}

/// Last `count` bars, newest first, with the indicator columns alongside.
fn recent_rows(
    bars: &[PriceBar],
    indicators: &IndicatorSet,
    count: usize,
) -> Result<Vec<RecentRow>, IndicatorError> {
    require_bars(bars, "recent trading data")?;
    let column = |series: &Series, i: usize| series.get(i).copied().flatten();

    Ok(bars
        .iter()
        .enumerate()
        .rev()
        .take(count)
        .map(|(i, bar)| RecentRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ma_short: column(&indicators.ma_short, i),
            ma_long: column(&indicators.ma_long, i),
            rsi: column(&indicators.rsi, i),
        })
        .collect())
}
