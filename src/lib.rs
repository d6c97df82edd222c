//! # Casino Reports
//!
//! Reconciles activity held in two stores and composes daily, weekly,
//! monthly and tabular reports from it.
//!
//! ## Architecture
//!
//! - **models**: Records, time windows, aggregates and report shapes
//! - **storage**: Analytical (Parquet) and transactional (JSONL) stores
//! - **calculate**: Dedup, reconciliation, aggregation, leaderboards, deltas
//! - **report**: Report composition over both stores
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod report;
pub mod storage;

pub use models::*;

use std::time::Duration;

use chrono::NaiveDate;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num * multiplier))
}

/// Parse a calendar day in `YYYY-MM-DD` form.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_hours() {
        assert_eq!(parse_duration("6h"), Some(Duration::from_secs(21600)));
    }

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_parse_duration_default_seconds() {
        assert_eq!(parse_duration("120"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_parse_duration_zero() {
        assert_eq!(parse_duration("0s"), Some(Duration::from_secs(0)));
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("2025-03-10"), NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(parse_day(" 2024-02-29 "), NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn test_parse_day_invalid() {
        assert_eq!(parse_day("2025-02-30"), None);
        assert_eq!(parse_day("10/03/2025"), None);
        assert_eq!(parse_day(""), None);
    }
}
