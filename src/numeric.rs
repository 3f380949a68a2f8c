//! Numeric Normalizer
//!
//! The analytics API returns numbers as JSON numbers on some endpoints and as
//! locale-formatted text ("1,234.5", "4.5%") on others. Everything here is
//! total: bad input yields `None`, never a panic.

use serde_json::Value;

/// Parse a loosely formatted numeric cell.
///
/// JSON numbers pass through. Strings are trimmed, stripped of `,` thousands
/// separators and of a single trailing `%`, then parsed. Empty, non-finite
/// and unparseable values yield `None`.
pub fn parse_numeric(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    }
}

fn parse_numeric_str(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Canonicalize a conversion rate into percent units.
///
/// Values in `(0, 1]` are read as fractions and scaled by 100; everything
/// else (including `0`) is already a percentage.
///
/// Known limitation: a true sub-1% rate reported in percent units (e.g. `0.8`
/// meaning 0.8%) is indistinguishable from a fraction and comes back as `80`.
/// Downstream consumers rely on this behavior, so it is kept as is.
pub fn normalize_conversion_rate(raw: &Value) -> Option<f64> {
    let value = parse_numeric(raw)?;
    if value > 0.0 && value <= 1.0 {
        Some(value * 100.0)
    } else {
        Some(value)
    }
}
