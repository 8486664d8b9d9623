// =============================================================================
// Yahoo Finance Chart API Client — daily OHLCV history
// =============================================================================
//
// Talks to the public v8 chart endpoint. No credentials are involved; the
// endpoint does reject requests without a browser-like User-Agent, so one is
// installed as a default header.
//
// Unknown symbols come back as HTTP 404 with a `chart.error` body, which is
// mapped to an empty result rather than a provider failure.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use crate::error::MarketDataError;
use crate::market_data::{FetchedHistory, MarketDataSource, PriceBar};
use crate::types::{Period, Ticker};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// OHLCV field names in the order they are read from `indicators.quote[0]`.
const QUOTE_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Yahoo chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `YahooClient`.
    ///
    /// # Arguments
    /// * `base_url`: e.g. `https://query1.finance.yahoo.com` (no trailing slash).
    /// * `timeout`: per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{ticker} with a daily interval over `period`.
    ///
    /// Returns the HTTP status together with the decoded JSON body so that
    /// error bodies (404 for unknown symbols) can be inspected by the caller.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(
        &self,
        ticker: &Ticker,
        period: Period,
    ) -> Result<(StatusCode, serde_json::Value)> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            encode_symbol(ticker.as_str())
        );

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("range", period.as_str()),
                ("interval", "1d"),
                ("includePrePost", "false"),
                ("events", "div,splits"),
            ])
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        let body: serde_json::Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                anyhow::bail!("Yahoo GET /v8/finance/chart returned {status}")
            }
            Err(e) => return Err(e).context("failed to parse chart response"),
        };

        Ok((status, body))
    }
}

#[async_trait]
impl MarketDataSource for YahooClient {
    async fn fetch_history(
        &self,
        ticker: &Ticker,
        period: Period,
    ) -> Result<FetchedHistory, MarketDataError> {
        let (status, body) = self
            .get_chart(ticker, period)
            .await
            .map_err(|e| MarketDataError::Provider(format!("{e:#}")))?;

        let has_chart_error = !body["chart"]["error"].is_null();
        if !status.is_success() && !has_chart_error {
            return Err(MarketDataError::Provider(format!(
                "Yahoo GET /v8/finance/chart returned {status}"
            )));
        }

        let history = parse_chart_response(ticker, &body)?;
        debug!(
            ticker = %ticker,
            period = %period,
            count = history.bars.len(),
            skipped = history.skipped_rows,
            "daily bars fetched"
        );
        Ok(history)
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Parse a v8 chart response body into ascending daily bars.
///
/// Expected shape:
/// ```json
/// { "chart": { "result": [ { "meta": { "gmtoffset": 19800 },
///     "timestamp": [...],
///     "indicators": { "quote": [ { "open": [...], "high": [...], "low": [...],
///                                  "close": [...], "volume": [...] } ] } } ],
///   "error": null } }
/// ```
///
/// Rows whose fields are all null are non-trading placeholders and are
/// dropped silently; rows with only some nulls are dropped and counted. When
/// two rows fall on the same local date the later (live) row wins.
pub fn parse_chart_response(
    ticker: &Ticker,
    body: &serde_json::Value,
) -> Result<FetchedHistory, MarketDataError> {
    let chart = &body["chart"];
    let empty = || MarketDataError::Empty {
        ticker: ticker.to_string(),
    };

    if !chart["error"].is_null() {
        let code = chart["error"]["code"].as_str().unwrap_or_default();
        let description = chart["error"]["description"]
            .as_str()
            .unwrap_or("unknown provider error");
        if code.eq_ignore_ascii_case("Not Found") {
            return Err(empty());
        }
        return Err(MarketDataError::Provider(format!("{code}: {description}")));
    }

    let result = chart["result"]
        .as_array()
        .and_then(|results| results.first())
        .ok_or_else(empty)?;

    // Yahoo omits `timestamp` entirely when the range holds no sessions.
    let Some(timestamps) = result["timestamp"].as_array() else {
        return Err(empty());
    };

    let quote = &result["indicators"]["quote"][0];
    if !quote.is_object() {
        return Err(MarketDataError::Provider(
            "chart response has no indicators.quote block".to_string(),
        ));
    }

    // Seconds east of UTC for the listing exchange (19800 for IST).
    let gmt_offset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);

    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    let mut skipped_rows = 0;

    for (row, ts) in timestamps.iter().enumerate() {
        let ts = ts.as_i64().ok_or_else(|| MarketDataError::MalformedRow {
            row,
            reason: format!("timestamp {ts} is not an integer"),
        })?;
        let date = DateTime::from_timestamp(ts.saturating_add(gmt_offset), 0)
            .ok_or_else(|| MarketDataError::MalformedRow {
                row,
                reason: format!("timestamp {ts} is out of range"),
            })?
            .date_naive();

        let values = QUOTE_FIELDS.map(|field| quote[field].get(row).and_then(|v| v.as_f64()));

        let [Some(open), Some(high), Some(low), Some(close), Some(volume)] = values else {
            if values.iter().any(Option::is_some) {
                let missing: Vec<&str> = QUOTE_FIELDS
                    .iter()
                    .zip(values.iter())
                    .filter(|(_, v)| v.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                warn!(ticker = %ticker, %date, ?missing, "skipping partial OHLCV row");
                skipped_rows += 1;
            }
            continue;
        };

        let bar = PriceBar::new(date, open, high, low, close, volume);

        // The live session is sometimes appended as a second row for the
        // same day; keep the fresher one.
        if bars.last().is_some_and(|last| last.date == date) {
            bars.pop();
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(empty());
    }

    Ok(FetchedHistory { bars, skipped_rows })
}

/// Percent-encode the characters index symbols use that are not valid in a
/// URL path segment as-is.
fn encode_symbol(symbol: &str) -> String {
    symbol.replace('^', "%5E")
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use chrono::NaiveDate;
    use serde_json::json;

    fn ticker(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    /// Four sessions at 09:15 IST on 2–5 Jan 2024, plus a null placeholder.
    fn sample_body() -> serde_json::Value {
        json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "TCS.NS", "currency": "INR", "gmtoffset": 19800 },
                    "timestamp": [1704167100, 1704253500, 1704339900, 1704380000, 1704426300],
                    "indicators": {
                        "quote": [{
                            "open":   [3700.0, 3710.0, 3720.0, null, 3760.5],
                            "high":   [3725.0, 3730.0, 3750.0, null, 3790.0],
                            "low":    [3690.0, 3695.0, 3712.0, null, 3741.0],
                            "close":  [3712.5, 3701.0, 3748.0, null, 3777.3],
                            "volume": [1200000, 980000, 1500000, null, 1100000]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn parse_chart_ok() {
        let history = parse_chart_response(&ticker("TCS.NS"), &sample_body()).unwrap();
        assert_eq!(history.skipped_rows, 0);
        assert_eq!(history.bars.len(), 4);
        assert_eq!(history.bars[0].date, date(2));
        assert_eq!(history.bars[3].date, date(5));
        assert!((history.bars[2].close - 3748.0).abs() < f64::EPSILON);
        assert!((history.bars[0].volume - 1_200_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_rows_are_skipped_and_counted() {
        let mut body = sample_body();
        body["chart"]["result"][0]["indicators"]["quote"][0]["close"][1] = json!(null);
        let history = parse_chart_response(&ticker("TCS.NS"), &body).unwrap();
        assert_eq!(history.skipped_rows, 1);
        assert_eq!(history.bars.len(), 3);
        assert!(history.bars.iter().all(|b| b.date != date(3)));
    }

    #[test]
    fn same_day_live_row_replaces_earlier_row() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 19800 },
                    "timestamp": [1704253500, 1704339900, 1704362400],
                    "indicators": { "quote": [{
                        "open":   [10.0, 11.0, 11.0],
                        "high":   [10.5, 11.5, 12.0],
                        "low":    [9.5, 10.5, 10.5],
                        "close":  [10.2, 11.2, 11.8],
                        "volume": [100, 200, 250]
                    }]}
                }],
                "error": null
            }
        });
        let history = parse_chart_response(&ticker("ITC.NS"), &body).unwrap();
        assert_eq!(history.bars.len(), 2);
        assert_eq!(history.bars[1].date, date(4));
        assert!((history.bars[1].close - 11.8).abs() < f64::EPSILON);
    }

    #[test]
    fn gmt_offset_shifts_calendar_date() {
        // 20:00 UTC on 3 Jan is 01:30 IST on 4 Jan.
        let body = json!({
            "chart": { "result": [{
                "meta": { "gmtoffset": 19800 },
                "timestamp": [1704312000],
                "indicators": { "quote": [{
                    "open": [1.0], "high": [1.0], "low": [1.0], "close": [1.0], "volume": [0]
                }]}
            }], "error": null }
        });
        let history = parse_chart_response(&ticker("INFY.NS"), &body).unwrap();
        assert_eq!(history.bars[0].date, date(4));
    }

    #[test]
    fn not_found_error_is_empty_result() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        let err = parse_chart_response(&ticker("NOPE.NS"), &body).unwrap_err();
        assert_eq!(err, MarketDataError::Empty { ticker: "NOPE.NS".into() });
    }

    #[test]
    fn other_chart_error_is_provider_failure() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Bad Request", "description": "Invalid input - range" }
            }
        });
        let err = parse_chart_response(&ticker("TCS.NS"), &body).unwrap_err();
        assert!(matches!(err, MarketDataError::Provider(msg) if msg.contains("Invalid input")));
    }

    #[test]
    fn missing_timestamps_is_empty_result() {
        let body = json!({
            "chart": { "result": [{ "meta": {}, "indicators": { "quote": [{}] } }], "error": null }
        });
        assert!(matches!(
            parse_chart_response(&ticker("TCS.NS"), &body),
            Err(MarketDataError::Empty { .. })
        ));
    }

    #[test]
    fn all_null_rows_is_empty_result() {
        let body = json!({
            "chart": { "result": [{
                "meta": { "gmtoffset": 19800 },
                "timestamp": [1704167100],
                "indicators": { "quote": [{
                    "open": [null], "high": [null], "low": [null], "close": [null], "volume": [null]
                }]}
            }], "error": null }
        });
        assert!(matches!(
            parse_chart_response(&ticker("TCS.NS"), &body),
            Err(MarketDataError::Empty { .. })
        ));
    }

    #[test]
    fn non_integer_timestamp_is_malformed() {
        let body = json!({
            "chart": { "result": [{
                "meta": {},
                "timestamp": ["yesterday"],
                "indicators": { "quote": [{
                    "open": [1.0], "high": [1.0], "low": [1.0], "close": [1.0], "volume": [1]
                }]}
            }], "error": null }
        });
        assert!(matches!(
            parse_chart_response(&ticker("TCS.NS"), &body),
            Err(MarketDataError::MalformedRow { row: 0, .. })
        ));
    }

    #[test]
    fn index_symbols_are_encoded() {
        assert_eq!(encode_symbol("^NSEI"), "%5ENSEI");
        assert_eq!(encode_symbol("TCS.NS"), "TCS.NS");
    }

    // ---- HTTP round trip against a local stub ---------------------------

    async fn spawn_stub() -> String {
        let app = Router::new().route(
            "/v8/finance/chart/:symbol",
            get(|Path(symbol): Path<String>| async move {
                match symbol.as_str() {
                    "TCS.NS" => (AxumStatus::OK, Json(sample_body())),
                    "BUSY.NS" => (AxumStatus::TOO_MANY_REQUESTS, Json(json!({}))),
                    _ => (
                        AxumStatus::NOT_FOUND,
                        Json(json!({
                            "chart": { "result": null,
                                "error": { "code": "Not Found", "description": "No data found" } }
                        })),
                    ),
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn fetch_history_over_http() {
        let base = spawn_stub().await;
        let client = YahooClient::new(base, Duration::from_secs(5)).unwrap();

        let history = client
            .fetch_history(&ticker("TCS.NS"), Period::OneMonth)
            .await
            .unwrap();
        assert_eq!(history.bars.len(), 4);

        let err = client
            .fetch_history(&ticker("MISSING.NS"), Period::OneYear)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Empty { .. }));

        let err = client
            .fetch_history(&ticker("BUSY.NS"), Period::OneYear)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Provider(msg) if msg.contains("429")));
    }
}
