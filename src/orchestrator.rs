//! Fallback Orchestrator
//!
//! Public entry point. Runs one combined query for sessions and conversion
//! rate, then narrower fallback queries for whichever metric is still
//! missing. Steps run strictly one after another: each one only fires if the
//! previous steps left its metric unresolved, so later queries are never
//! spent on data already in hand.
//!
//! Steps:
//! 1. combined: `sessions, conversion_rate`
//! 2. sessions only
//! 3. `conversion_rate` only
//! 4. `online_store_conversion_rate` only (older API name)
//! 5. if conversion rate is still missing and nothing failed, report
//!    "conversion rate unavailable"

use crate::client::{HttpQueryClient, QueryExecutor};
use crate::config::EndpointContext;
use crate::error::{MetricsError, CONVERSION_RATE_UNAVAILABLE, DEADLINE_EXCEEDED};
use crate::extract::{sum_column, weighted_average_column};
use crate::table::TableResult;
use crate::window::{MetricQuery, Window, CONVERSION_RATE, ONLINE_STORE_CONVERSION_RATE, SESSIONS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

const SESSION_COLUMNS: &[&str] = &[SESSIONS];
const CONVERSION_COLUMNS: &[&str] = &[CONVERSION_RATE, ONLINE_STORE_CONVERSION_RATE, "conversion"];
const ALT_CONVERSION_COLUMNS: &[&str] = &[ONLINE_STORE_CONVERSION_RATE, CONVERSION_RATE, "conversion"];

/// What one `fetch_metrics` call produced.
///
/// `None` means the metric could not be determined (distinct from `Some(0)`).
/// `error` is advisory: it can be set while both metrics are present, when a
/// fallback had to cover for a failed broader query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    pub sessions: Option<i64>,
    pub conversion_rate_percent: Option<f64>,
    pub error: Option<String>,
}

impl ExtractionOutcome {
    fn failed(error: &MetricsError) -> Self {
        Self {
            sessions: None,
            conversion_rate_percent: None,
            error: Some(error.to_string()),
        }
    }
}

/// Per-call state: write-once metric slots plus a set-if-empty error slot.
/// The earliest error wins since it comes from the broadest attempt.
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    sessions: Option<i64>,
    conversion_rate_percent: Option<f64>,
    error: Option<String>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_sessions(&self) -> bool {
        self.sessions.is_none()
    }

    pub fn needs_conversion_rate(&self) -> bool {
        self.conversion_rate_percent.is_none()
    }

    pub fn offer_sessions(&mut self, value: Option<i64>) {
        if self.sessions.is_none() {
            self.sessions = value;
        }
    }

    pub fn offer_conversion_rate(&mut self, value: Option<f64>) {
        if self.conversion_rate_percent.is_none() {
            self.conversion_rate_percent = value;
        }
    }

    pub fn record_error(&mut self, error: &MetricsError) {
        if self.error.is_none() {
            self.error = Some(error.to_string());
        }
    }

    pub fn finish(mut self) -> ExtractionOutcome {
        if self.conversion_rate_percent.is_none() && self.error.is_none() {
            self.error = Some(MetricsError::NoData(CONVERSION_RATE_UNAVAILABLE.to_string()).to_string());
        }
        ExtractionOutcome {
            sessions: self.sessions,
            conversion_rate_percent: self.conversion_rate_percent,
            error: self.error,
        }
    }
}

/// Fetch sessions and conversion rate for `window` from the live endpoint.
pub async fn fetch_metrics(ctx: &EndpointContext, window: &str) -> ExtractionOutcome {
    let client = HttpQueryClient::new(ctx.clone());
    fetch_metrics_with(&client, window).await
}

/// Same as `fetch_metrics`, abandoning the call once `deadline` elapses.
///
/// No step writes anything, so dropping in-flight work is side-effect free.
pub async fn fetch_metrics_with_deadline(
    ctx: &EndpointContext,
    window: &str,
    deadline: Duration,
) -> ExtractionOutcome {
    match tokio::time::timeout(deadline, fetch_metrics(ctx, window)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("Metrics fetch for {} abandoned after {:?}", window, deadline);
            ExtractionOutcome::failed(&MetricsError::Deadline(DEADLINE_EXCEEDED.to_string()))
        }
    }
}

/// Run the fallback state machine against any executor.
pub async fn fetch_metrics_with(executor: &dyn QueryExecutor, window: &str) -> ExtractionOutcome {
    let window = match Window::parse(window) {
        Ok(w) => w,
        Err(e) => {
            warn!("Rejected window {:?}", window);
            return ExtractionOutcome::failed(&e);
        }
    };

    let fetch_id = Uuid::new_v4();
    let span = info_span!("fetch_metrics", %fetch_id, %window, executor = executor.name());
    run_steps(executor, window).instrument(span).await
}

async fn run_steps(executor: &dyn QueryExecutor, window: Window) -> ExtractionOutcome {
    let mut acc = MetricsAccumulator::new();

    // 1. combined
    match attempt(executor, "combined", &MetricQuery::new(&[SESSIONS, CONVERSION_RATE], window)).await {
        Ok(table) if !table.is_empty() => {
            acc.offer_sessions(sum_column(&table, SESSION_COLUMNS));
            acc.offer_conversion_rate(weighted_average_column(&table, CONVERSION_COLUMNS, SESSION_COLUMNS));
        }
        Ok(_) => debug!("Combined query returned no rows"),
        Err(e) => acc.record_error(&e),
    }

    // 2. sessions only
    if acc.needs_sessions() {
        match attempt(executor, "sessions", &MetricQuery::new(&[SESSIONS], window)).await {
            Ok(table) => acc.offer_sessions(sum_column(&table, SESSION_COLUMNS)),
            Err(e) => acc.record_error(&e),
        }
    }

    // 3 and 4. conversion rate under its current name, then the older one
    for (step, metric, columns) in [
        ("conversion_rate", CONVERSION_RATE, CONVERSION_COLUMNS),
        ("online_store_conversion_rate", ONLINE_STORE_CONVERSION_RATE, ALT_CONVERSION_COLUMNS),
    ] {
        if !acc.needs_conversion_rate() {
            break;
        }
        match attempt(executor, step, &MetricQuery::new(&[metric], window)).await {
            Ok(table) => acc.offer_conversion_rate(weighted_average_column(&table, columns, SESSION_COLUMNS)),
            Err(e) => acc.record_error(&e),
        }
    }

    let outcome = acc.finish();
    info!(
        "Metrics resolved: sessions={:?} conversion_rate_percent={:?} error={:?}",
        outcome.sessions, outcome.conversion_rate_percent, outcome.error
    );
    outcome
}

async fn attempt(
    executor: &dyn QueryExecutor,
    step: &str,
    query: &MetricQuery,
) -> crate::error::Result<TableResult> {
    debug!("Step {}: {}", step, query);
    let result = executor.run_query(query.as_str()).await;
    match &result {
        Ok(table) => debug!("Step {} returned {} rows", step, table.rows.len()),
        Err(e) => warn!("Step {} failed ({}): {}", step, e.kind(), e),
    }
    result
}
