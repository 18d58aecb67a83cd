//! Travel-time row validation.
//!
//! A survey row is kept only when both of its time fields are present, parse
//! as `hour:minute`, the start hour is in range and the trip (measured on a
//! 24 hour clock) is not longer than the configured maximum.

use crate::config::CleaningConfig;
use crate::error::{Result, ResultExt};
use crate::utils::raw_string_values;
use polars::prelude::*;
use tracing::debug;

/// A parsed `hour:minute` time of day.
///
/// Values are not range checked here; `25:00` parses fine and is rejected by
/// [`RowValidator`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripTime {
    pub hour: i64,
    pub minute: i64,
}

impl TripTime {
    /// Parse `"HH:MM"`.
    ///
    /// Exactly two `:`-separated parts are required, each an integer with an
    /// optional sign and optional surrounding whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(':');
        let hour = parts.next()?.trim().parse::<i64>().ok()?;
        let minute = parts.next()?.trim().parse::<i64>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { hour, minute })
    }
}

/// Predicate deciding whether a survey row should be kept.
#[derive(Debug, Clone, Copy)]
pub struct RowValidator {
    max_start_hour: i64,
    max_trip_hours: i64,
}

impl Default for RowValidator {
    fn default() -> Self {
        Self {
            max_start_hour: 24,
            max_trip_hours: 12,
        }
    }
}

impl RowValidator {
    pub fn new(max_start_hour: i64, max_trip_hours: i64) -> Self {
        Self {
            max_start_hour,
            max_trip_hours,
        }
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::new(config.max_start_hour, config.max_trip_hours)
    }

    /// Trip length in whole hours on a 24 hour clock.
    ///
    /// Only hours count: 08:59 -> 09:00 is one hour, 08:00 -> 08:59 is zero.
    /// Hours are reduced modulo 24 before subtracting, so any `i64` hour is
    /// accepted.
    pub fn trip_hours(start: TripTime, end: TripTime) -> i64 {
        (end.hour.rem_euclid(24) - start.hour.rem_euclid(24)).rem_euclid(24)
    }

    /// Returns `true` when the row should be kept.
    pub fn is_valid(&self, start_time: Option<&str>, end_time: Option<&str>) -> bool {
        let (Some(start_time), Some(end_time)) = (start_time, end_time) else {
            return false;
        };
        let (Some(start), Some(end)) = (TripTime::parse(start_time), TripTime::parse(end_time))
        else {
            return false;
        };

        if start.hour > self.max_start_hour {
            return false;
        }

        Self::trip_hours(start, end) <= self.max_trip_hours
    }

    /// Drop every row of `df` that fails [`is_valid`](Self::is_valid).
    ///
    /// Returns the surviving rows in their original order together with the
    /// original position of each of them.
    pub fn filter(
        &self,
        df: &DataFrame,
        start_column: &str,
        end_column: &str,
    ) -> Result<(DataFrame, Vec<usize>)> {
        let starts = raw_string_values(df.column(start_column)?.as_materialized_series())
            .context(format!("Reading '{}'", start_column))?;
        let ends = raw_string_values(df.column(end_column)?.as_materialized_series())
            .context(format!("Reading '{}'", end_column))?;

        let keep: Vec<bool> = starts
            .iter()
            .zip(&ends)
            .map(|(start, end)| self.is_valid(start.as_deref(), end.as_deref()))
            .collect();

        let kept_rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect();

        let mask = Series::new("keep".into(), keep);
        let filtered = df.filter(mask.bool()?)?;

        debug!(
            "Row validation kept {} of {} rows",
            filtered.height(),
            df.height()
        );

        Ok((filtered, kept_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AGE, END_TIME, START_TIME};

    fn valid(start: &str, end: &str) -> bool {
        RowValidator::default().is_valid(Some(start), Some(end))
    }

    // ========================================================================
    // TripTime::parse() tests
    // ========================================================================

    #[test]
    fn test_parse_basic() {
        assert_eq!(
            TripTime::parse("08:30"),
            Some(TripTime { hour: 8, minute: 30 })
        );
        assert_eq!(
            TripTime::parse(" 7 : 05 "),
            Some(TripTime { hour: 7, minute: 5 })
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(TripTime::parse(""), None);
        assert_eq!(TripTime::parse("0830"), None);
        assert_eq!(TripTime::parse("08:30:00"), None);
        assert_eq!(TripTime::parse("8.5:00"), None);
        assert_eq!(TripTime::parse("ab:cd"), None);
        assert_eq!(TripTime::parse("08:"), None);
    }

    // ========================================================================
    // is_valid() tests
    // ========================================================================

    #[test]
    fn test_missing_times_are_invalid() {
        let validator = RowValidator::default();
        assert!(!validator.is_valid(None, Some("09:00")));
        assert!(!validator.is_valid(Some("08:00"), None));
        assert!(!validator.is_valid(None, None));
    }

    #[test]
    fn test_non_integer_components_are_invalid() {
        assert!(!valid("08:xx", "09:00"));
        assert!(!valid("08:00", "nine"));
        assert!(!valid("", "09:00"));
    }

    #[test]
    fn test_short_trip_is_valid() {
        assert!(valid("08:00", "09:30"));
    }

    #[test]
    fn test_trip_crossing_midnight_is_valid() {
        assert!(valid("23:00", "02:00"));
        let start = TripTime::parse("23:00").unwrap();
        let end = TripTime::parse("02:00").unwrap();
        assert_eq!(RowValidator::trip_hours(start, end), 3);
    }

    #[test]
    fn test_trip_boundaries() {
        assert!(valid("06:00", "18:00")); // exactly 12 hours
        assert!(!valid("06:00", "19:00")); // 13 hours
        assert!(valid("10:15", "10:45")); // 0 hours
        assert!(!valid("10:00", "09:00")); // wraps to 23 hours
    }

    #[test]
    fn test_minutes_do_not_count() {
        // 12h59m is still 12 whole hours
        assert!(valid("06:00", "18:59"));
    }

    #[test]
    fn test_start_hour_limit() {
        assert!(!valid("25:00", "01:00"));
        assert!(!valid("25:00", "26:00"));
        assert!(valid("24:00", "01:00"));
    }

    #[test]
    fn test_extreme_hours_do_not_overflow() {
        assert!(valid("-9223372036854775808:00", "01:00"));
        assert!(!valid("9223372036854775807:00", "01:00"));
        // i64::MIN -> i64::MAX spans 15 hours on the clock
        assert!(!valid("-9223372036854775808:00", "9223372036854775807:00"));

        let start = TripTime::parse("-9223372036854775808:00").unwrap();
        let end = TripTime::parse("01:00").unwrap();
        // i64::MIN mod 24 is 16, so the trip is 9 hours
        assert_eq!(RowValidator::trip_hours(start, end), 9);
    }

    #[test]
    fn test_custom_limits() {
        let validator = RowValidator::new(23, 2);
        assert!(!validator.is_valid(Some("24:00"), Some("01:00")));
        assert!(validator.is_valid(Some("08:00"), Some("10:00")));
        assert!(!validator.is_valid(Some("08:00"), Some("11:00")));
    }

    // ========================================================================
    // filter() tests
    // ========================================================================

    #[test]
    fn test_filter_preserves_order_and_positions() {
        let df = df![
            START_TIME => [Some("08:00"), None, Some("23:00"), Some("25:00"), Some("07:00")],
            END_TIME => [Some("09:00"), Some("10:00"), Some("02:00"), Some("01:00"), Some("07:30")],
            AGE => [1i64, 2, 3, 4, 5],
        ]
        .unwrap();

        let (filtered, kept_rows) = RowValidator::default()
            .filter(&df, START_TIME, END_TIME)
            .unwrap();

        assert_eq!(kept_rows, vec![0, 2, 4]);
        assert_eq!(filtered.height(), 3);
        assert_eq!(filtered.width(), df.width());

        let ages: Vec<Option<i64>> = filtered
            .column(AGE)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ages, vec![Some(1), Some(3), Some(5)]);
    }

    #[test]
    fn test_filter_all_rows_invalid() {
        let df = df![
            START_TIME => ["bad", "30:00"],
            END_TIME => ["09:00", "01:00"],
        ]
        .unwrap();

        let (filtered, kept_rows) = RowValidator::default()
            .filter(&df, START_TIME, END_TIME)
            .unwrap();

        assert_eq!(filtered.height(), 0);
        assert!(kept_rows.is_empty());
    }

    #[test]
    fn test_filter_missing_column() {
        let df = df![START_TIME => ["08:00"]].unwrap();
        let result = RowValidator::default().filter(&df, START_TIME, END_TIME);
        assert!(result.is_err());
    }
}
