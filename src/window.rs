//! Time windows and query text.
//!
//! Query text follows the external grammar
//! `FROM sessions SHOW <metric[, metric...]> DURING <window>` and is treated
//! as an opaque string once built.

use crate::error::{MetricsError, Result, INVALID_WINDOW};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

pub const SESSIONS: &str = "sessions";
pub const CONVERSION_RATE: &str = "conversion_rate";
pub const ONLINE_STORE_CONVERSION_RATE: &str = "online_store_conversion_rate";

lazy_static! {
    static ref DATE_LITERAL: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Today,
    Yesterday,
    Date(NaiveDate),
}

impl Window {
    /// Accepts `today`, `yesterday` or a strict `YYYY-MM-DD` calendar date.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "today" => Ok(Window::Today),
            "yesterday" => Ok(Window::Yesterday),
            _ if DATE_LITERAL.is_match(token) => NaiveDate::parse_from_str(token, "%Y-%m-%d")
                .map(Window::Date)
                .map_err(|_| MetricsError::InvalidInput(INVALID_WINDOW.to_string())),
            _ => Err(MetricsError::InvalidInput(INVALID_WINDOW.to_string())),
        }
    }

    pub fn token(&self) -> String {
        match self {
            Window::Today => "today".to_string(),
            Window::Yesterday => "yesterday".to_string(),
            Window::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Query text for a set of metrics over one window. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    text: String,
}

impl MetricQuery {
    pub fn new(metrics: &[&str], window: Window) -> Self {
        Self {
            text: format!("FROM sessions SHOW {} DURING {}", metrics.join(", "), window),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for MetricQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_tokens() {
        assert_eq!(Window::parse("today").unwrap(), Window::Today);
        assert_eq!(Window::parse("yesterday").unwrap(), Window::Yesterday);
        assert_eq!(
            Window::parse("2024-05-01").unwrap(),
            Window::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_everything_else() {
        for token in ["last week", "Today", " today", "2024-5-1", "2024-02-30", "20240501", "", "2024-05-01T00:00"] {
            let err = Window::parse(token).unwrap_err();
            assert!(matches!(err, MetricsError::InvalidInput(_)), "{token}");
            assert_eq!(err.to_string(), "invalid window");
        }
    }

    #[test]
    fn test_query_text() {
        let q = MetricQuery::new(&[SESSIONS, CONVERSION_RATE], Window::Today);
        assert_eq!(q.as_str(), "FROM sessions SHOW sessions, conversion_rate DURING today");

        let date = Window::parse("2024-05-01").unwrap();
        let q = MetricQuery::new(&[ONLINE_STORE_CONVERSION_RATE], date);
        assert_eq!(q.to_string(), "FROM sessions SHOW online_store_conversion_rate DURING 2024-05-01");
    }
}
