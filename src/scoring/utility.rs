use chrono::NaiveDate;

/// Days per year used for round-to-round durations.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Fractional years from `start` to `end`, counting 365 days per year.
///
/// `years_between(2020-01-01, 2021-03-01)` is about 1.16. Negative when `end`
/// precedes `start`.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mean_values() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_years_between() {
        let years = years_between(date("2020-01-01"), date("2021-03-01"));
        assert_eq!(years, 425.0 / 365.0);
        assert_eq!(years_between(date("2022-01-01"), date("2021-01-01")), -1.0);
        assert_eq!(years_between(date("2020-06-01"), date("2020-06-01")), 0.0);
    }
}
