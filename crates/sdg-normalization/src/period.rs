//! Time-period conversion to decimal years.
//!
//! The warehouse reports periods as `YYYY` or `YYYY-MM`; both map onto a
//! single numeric axis so observations with mixed granularity sort and
//! plot together.

/// Convert a raw time-period string to a decimal year.
///
/// - `"YYYY"` -> `YYYY.0`
/// - `"YYYY-MM"` -> `YYYY + MM/12` (so `"2020-06"` -> `2020.5`)
/// - anything else is tried as a plain number
///
/// Returns `None` for unparseable input; never panics.
pub fn parse_period(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some((year_part, month_part)) = trimmed.split_once('-')
        && year_part.len() == 4
        && let Ok(year) = year_part.parse::<i32>()
        && let Ok(month) = month_part.parse::<u32>()
        && (1..=12).contains(&month)
    {
        return Some(f64::from(year) + f64::from(month) / 12.0);
    }

    if trimmed.len() == 4
        && let Ok(year) = trimmed.parse::<i32>()
    {
        return Some(f64::from(year));
    }

    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::parse_period;
    use proptest::prelude::*;

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-4)
    }

    #[test]
    fn plain_years() {
        assert_eq!(parse_period("2020"), Some(2020.0));
        assert_eq!(parse_period(" 1999 "), Some(1999.0));
    }

    #[test]
    fn month_granular_periods() {
        assert!(close(parse_period("2020-01"), 2020.0833));
        assert!(close(parse_period("2020-06"), 2020.5));
        assert!(close(parse_period("2020-11"), 2020.9167));
        assert!(close(parse_period("2020-12"), 2021.0));
    }

    #[test]
    fn numeric_passthrough_and_failures() {
        assert_eq!(parse_period("2020.5"), Some(2020.5));
        assert_eq!(parse_period(""), None);
        assert_eq!(parse_period("n/a"), None);
        assert_eq!(parse_period("2020-13"), None);
        assert_eq!(parse_period("20-06"), None);
    }

    proptest! {
        #[test]
        fn never_panics(raw in "\\PC*") {
            let _ = parse_period(&raw);
        }

        #[test]
        fn four_digit_years_round_trip(year in 1000i32..=9999) {
            prop_assert_eq!(parse_period(&year.to_string()), Some(f64::from(year)));
        }

        #[test]
        fn months_stay_within_the_year(year in 1000i32..=9998, month in 1u32..=12) {
            let raw = format!("{year}-{month:02}");
            let parsed = parse_period(&raw).expect("month period parses");
            prop_assert!(parsed > f64::from(year));
            prop_assert!(parsed <= f64::from(year) + 1.0);
        }
    }
}
