use std::str::FromStr;

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum YearPatternError {
    #[error("Invalid year pattern term: {0}")]
    MalformedTerm(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum RangeEnd {
    Year(i32),
    /// `YYYY-*`: no upper bound.
    Open,
    /// `YYYY-*N`: every N years counted from the range start.
    Every(i32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum YearTerm {
    Any,
    Exact(i32),
    Range { from: Option<i32>, to: RangeEnd },
}

impl YearTerm {
    fn matches(&self, year: i32) -> bool {
        match self {
            YearTerm::Any => true,
            YearTerm::Exact(y) => year == *y,
            YearTerm::Range { from, to } => {
                if from.is_some_and(|from| year < from) {
                    return false;
                }
                match to {
                    RangeEnd::Year(last) => year <= *last,
                    RangeEnd::Open => true,
                    RangeEnd::Every(n) => *n > 0 && (year - from.unwrap_or(0)) % n == 0,
                }
            }
        }
    }
}

/// A comma-separated year selection: `*`, exact years, inclusive ranges
/// and repetition ranges (`2020,2022-2024,2025-*,2026-*4`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearPattern {
    terms: Vec<YearTerm>,
}

impl YearPattern {
    pub fn matches(&self, year: i32) -> bool {
        self.terms.iter().any(|term| term.matches(year))
    }
}

impl FromStr for YearPattern {
    type Err = YearPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let terms = s
            .split(',')
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { terms })
    }
}

fn parse_term(term: &str) -> Result<YearTerm, YearPatternError> {
    let e = || YearPatternError::MalformedTerm(term.to_string());

    if term == "*" {
        return Ok(YearTerm::Any);
    }

    if let Ok(year) = term.parse::<i32>() {
        if year >= 0 {
            return Ok(YearTerm::Exact(year));
        }
    }

    let (from_part, to_part) = term.split_once('-').ok_or_else(e)?;

    let from = if from_part == "*" {
        None
    } else {
        Some(from_part.parse::<i32>().map_err(|_| e())?)
    };

    let to = if to_part == "*" {
        RangeEnd::Open
    } else if let Some(freq) = to_part.strip_prefix('*') {
        let n = freq.parse::<i32>().map_err(|_| e())?;
        if n <= 0 {
            return Err(e());
        }
        RangeEnd::Every(n)
    } else {
        RangeEnd::Year(to_part.parse::<i32>().map_err(|_| e())?)
    };

    Ok(YearTerm::Range { from, to })
}

/// Whether an event recurring per `pattern` can occur in `year`. Without
/// a pattern the event's own date bounds decide.
pub fn check_year(
    year: i32,
    date_from: Option<&DateTime<Tz>>,
    date_to: Option<&DateTime<Tz>>,
    pattern: Option<&YearPattern>,
) -> bool {
    match pattern {
        Some(pattern) => pattern.matches(year),
        None => {
            if date_from.is_some_and(|from| from.year() > year) {
                return false;
            }
            if date_to.is_some_and(|to| to.year() < year) {
                return false;
            }
            true
        }
    }
}

/// Whether `date` falls inside the event's `[date_from, date_to)`
/// bounds. With a year pattern, the bounds are re-anchored into the
/// probe's year first.
pub fn check_date(
    date: &DateTime<Tz>,
    date_from: Option<&DateTime<Tz>>,
    date_to: Option<&DateTime<Tz>>,
    pattern: Option<&YearPattern>,
) -> bool {
    let Some(pattern) = pattern else {
        return within_bounds(date, date_from, date_to);
    };

    if !pattern.matches(date.year()) {
        return false;
    }

    let from = date_from.and_then(|t| date::change_year(t, date.year()));
    let to = date_to.and_then(|t| date::change_year(t, date.year()));

    within_bounds(date, from.as_ref(), to.as_ref())
}

fn within_bounds(
    date: &DateTime<Tz>,
    date_from: Option<&DateTime<Tz>>,
    date_to: Option<&DateTime<Tz>>,
) -> bool {
    if date_from.is_some_and(|from| from > date) {
        return false; // before the start date (inclusive)
    }
    if date_to.is_some_and(|to| date >= to) {
        return false; // on or past the end date (exclusive)
    }
    true
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use chrono_tz::Tz;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn matches_exact_years_and_ranges() {
        let p: YearPattern = "2020,2021,2023-2025".parse().unwrap();
        assert!(p.matches(2020));
        assert!(!p.matches(2022));
        assert!(p.matches(2023));
        assert!(p.matches(2025));
        assert!(!p.matches(2026));
    }

    #[test]
    fn wildcard_matches_any_year() {
        let p: YearPattern = "*".parse().unwrap();
        assert!(p.matches(1900));
        assert!(p.matches(2100));
    }

    #[test]
    fn open_ranges_have_no_upper_bound() {
        let p: YearPattern = "2024-*".parse().unwrap();
        assert!(!p.matches(2023));
        assert!(p.matches(2024));
        assert!(p.matches(2999));

        let p: YearPattern = "*-2024".parse().unwrap();
        assert!(p.matches(1900));
        assert!(!p.matches(2025));
    }

    #[test]
    fn repetition_ranges_step_from_the_base_year() {
        let p: YearPattern = "2020,2021,2025-*4".parse().unwrap();
        assert!(p.matches(2025));
        assert!(p.matches(2029));
        assert!(!p.matches(2026));
        assert!(!p.matches(2024));
    }

    #[test]
    fn rejects_malformed_terms() {
        assert!("2020-".parse::<YearPattern>().is_err());
        assert!("-2020".parse::<YearPattern>().is_err());
        assert!("x".parse::<YearPattern>().is_err());
        assert!("2020-*0".parse::<YearPattern>().is_err());
        assert!("2020-2021-2022".parse::<YearPattern>().is_err());
    }

    #[test]
    fn check_year_uses_bounds_without_a_pattern() {
        let from = day(2020, 1, 1);
        let to = day(2025, 12, 31);

        assert!(check_year(2023, Some(&from), Some(&to), None));
        assert!(!check_year(2019, Some(&from), Some(&to), None));
        assert!(!check_year(2026, Some(&from), Some(&to), None));
        assert!(check_year(2026, Some(&from), None, None));
        assert!(check_year(1900, None, None, None));
    }

    #[test]
    fn check_year_prefers_the_pattern() {
        let from = day(2020, 1, 1);
        let to = day(2025, 12, 31);
        let p: YearPattern = "2020,2021,2025-*4".parse().unwrap();

        // 2029 is outside the date bounds but selected by the pattern
        assert!(check_year(2029, Some(&from), Some(&to), Some(&p)));
        assert!(!check_year(2022, Some(&from), Some(&to), Some(&p)));
    }

    #[test]
    fn check_date_reanchors_bounds_into_the_probe_year() {
        let from = day(2020, 3, 1);
        let to = day(2020, 9, 1);
        let p: YearPattern = "2020-*2".parse().unwrap();

        // Pattern year, inside the re-anchored March-September window
        assert!(check_date(&day(2024, 6, 15), Some(&from), Some(&to), Some(&p)));
        // Pattern year, outside the window
        assert!(!check_date(&day(2024, 10, 15), Some(&from), Some(&to), Some(&p)));
        // Non-pattern year
        assert!(!check_date(&day(2023, 6, 15), Some(&from), Some(&to), Some(&p)));
    }

    #[test]
    fn check_date_without_a_pattern_is_a_plain_bounds_test() {
        let from = day(2024, 3, 1);
        let to = day(2024, 9, 1);

        assert!(check_date(&day(2024, 3, 1), Some(&from), Some(&to), None));
        assert!(!check_date(&day(2024, 9, 1), Some(&from), Some(&to), None));
        assert!(!check_date(&day(2023, 6, 1), Some(&from), Some(&to), None));
    }
}
