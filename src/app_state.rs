// =============================================================================
// Central Application State — Dalal Lens
// =============================================================================
//
// Shared by every HTTP handler via `Arc<AppState>`. Analysis cycles are
// independent, so the only mutable state is diagnostic:
//   - an atomic counter of reports served;
//   - a capped log of recent failures for the error panel.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::MarketDataSource;
use crate::runtime_config::DashboardConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable code (e.g. `empty_result`).
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
pub const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    // ── Configuration ───────────────────────────────────────────────────
    pub config: DashboardConfig,

    // ── Market Data ─────────────────────────────────────────────────────
    pub source: Arc<dyn MarketDataSource>,

    // ── Diagnostics ─────────────────────────────────────────────────────
    pub analyses_served: AtomicU64,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: DashboardConfig, source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            config,
            source,
            analyses_served: AtomicU64::new(0),
            recent_errors: RwLock::new(Vec::new()),
            start_time: Instant::now(),
        }
    }

    /// Count a successfully served report. Returns the new total.
    pub fn record_analysis(&self) -> u64 {
        self.analyses_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn analyses_served(&self) -> u64 {
        self.analyses_served.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error with an optional machine-readable code. The log is
    /// capped at [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, message: String, code: Option<String>) {
        let record = ErrorRecord {
            message,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        if errors.len() > MAX_RECENT_ERRORS {
            let excess = errors.len() - MAX_RECENT_ERRORS;
            errors.drain(..excess);
        }
    }

    /// Recent errors, newest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().iter().rev().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::source::testing::StubSource;
    use crate::market_data::FetchedHistory;

    fn state() -> AppState {
        AppState::new(
            DashboardConfig::default(),
            Arc::new(StubSource(Ok(FetchedHistory::default()))),
        )
    }

    #[test]
    fn error_log_is_capped_and_newest_first() {
        let state = state();
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error(format!("failure {i}"), None);
        }

        let errors = state.recent_errors();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, format!("failure {}", MAX_RECENT_ERRORS + 4));
        assert_eq!(errors.last().unwrap().message, "failure 5");
    }

    #[test]
    fn analysis_counter_increments() {
        let state = state();
        assert_eq!(state.analyses_served(), 0);
        assert_eq!(state.record_analysis(), 1);
        assert_eq!(state.record_analysis(), 2);
        assert_eq!(state.analyses_served(), 2);
    }
}
