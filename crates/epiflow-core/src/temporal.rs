//! Temporal bucketing: date strings → granularity keys, and range generation.
//!
//! Bucket keys are zero-padded so lexicographic order is chronological:
//! day `YYYY-MM-DD`, week `YYYY-Www` (ISO week), month `YYYY-MM`, year `YYYY`.
//! A `None` key means "unknown date" and sorts after every known key.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            other => Err(Error::Config(format!("unknown granularity '{other}'"))),
        }
    }
}

/// Coarsen a date into its bucket key. Day granularity keeps the string as
/// given once it parses as a date.
pub fn bucket_for(date: Option<&str>, granularity: Granularity) -> Result<Option<String>> {
    let Some(date) = date else {
        return Ok(None);
    };

    let d = parse_date(date)?;
    let key = match granularity {
        Granularity::Day => date.to_string(),
        Granularity::Week => {
            let iso = d.iso_week();
            format!("{:04}-W{:02}", iso.year(), iso.week())
        }
        Granularity::Month => format!("{:04}-{:02}", d.year(), d.month()),
        Granularity::Year => format!("{:04}", d.year()),
    };
    Ok(Some(key))
}

/// Every bucket from `min` to `max` inclusive, one granularity unit apart.
///
/// Month/year stepping is calendar arithmetic, not a fixed day count.
/// `min > max` yields an empty sequence.
pub fn generate_all_in_range(min: &str, max: &str, granularity: Granularity) -> Result<Vec<String>> {
    let start = Bucket::parse(min, granularity)?;
    let end = Bucket::parse(max, granularity)?;

    let mut out = Vec::new();
    let mut current = start;
    while current <= end {
        out.push(current.key());
        current = current.next()?;
    }
    Ok(out)
}

/// Lexicographic for known keys; `None` compares greater than any known key.
pub fn compare_bucket_keys(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Smallest and largest non-null key. Fails with `EmptyRange` when every key is null.
pub fn get_min_max_string<'a, I>(keys: I) -> Result<(String, String)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut min_max: Option<(&str, &str)> = None;
    for key in keys.into_iter().flatten() {
        min_max = Some(match min_max {
            None => (key, key),
            Some((lo, hi)) => (lo.min(key), hi.max(key)),
        });
    }
    min_max
        .map(|(lo, hi)| (lo.to_string(), hi.to_string()))
        .ok_or(Error::EmptyRange)
}

/// Accepts `YYYY-MM-DD` and anything that starts with it (e.g. an ISO timestamp).
fn parse_date(date: &str) -> Result<NaiveDate> {
    let head = date.get(..10).unwrap_or(date);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|e| Error::InvalidDate(format!("{date}: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Day(NaiveDate),
    /// Monday of the ISO week.
    Week(NaiveDate),
    Month { year: i32, month: u32 },
    Year(i32),
}

impl Bucket {
    fn parse(key: &str, granularity: Granularity) -> Result<Self> {
        let invalid = || Error::InvalidDate(format!("'{key}' is not a {granularity} key"));
        match granularity {
            Granularity::Day => Ok(Bucket::Day(parse_date(key)?)),
            Granularity::Week => {
                let (year, week) = key.split_once("-W").ok_or_else(invalid)?;
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let week: u32 = week.parse().map_err(|_| invalid())?;
                NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
                    .map(Bucket::Week)
                    .ok_or_else(invalid)
            }
            Granularity::Month => {
                let (year, month) = key.split_once('-').ok_or_else(invalid)?;
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&month) {
                    return Err(invalid());
                }
                Ok(Bucket::Month { year, month })
            }
            Granularity::Year => key.parse().map(Bucket::Year).map_err(|_| invalid()),
        }
    }

    fn next(self) -> Result<Self> {
        let overflow = || Error::InvalidDate("date range overflows the calendar".into());
        Ok(match self {
            Bucket::Day(d) => Bucket::Day(d.succ_opt().ok_or_else(overflow)?),
            Bucket::Week(d) => Bucket::Week(
                d.checked_add_signed(Duration::days(7))
                    .ok_or_else(overflow)?,
            ),
            Bucket::Month { year, month: 12 } => Bucket::Month {
                year: year.checked_add(1).ok_or_else(overflow)?,
                month: 1,
            },
            Bucket::Month { year, month } => Bucket::Month {
                year,
                month: month + 1,
            },
            Bucket::Year(y) => Bucket::Year(y.checked_add(1).ok_or_else(overflow)?),
        })
    }

    fn key(&self) -> String {
        match self {
            Bucket::Day(d) => d.format("%Y-%m-%d").to_string(),
            Bucket::Week(d) => {
                let iso = d.iso_week();
                format!("{:04}-W{:02}", iso.year(), iso.week())
            }
            Bucket::Month { year, month } => format!("{year:04}-{month:02}"),
            Bucket::Year(y) => format!("{y:04}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_by_granularity() {
        let d = Some("2023-03-07");
        assert_eq!(bucket_for(d, Granularity::Day).unwrap().as_deref(), Some("2023-03-07"));
        assert_eq!(bucket_for(d, Granularity::Month).unwrap().as_deref(), Some("2023-03"));
        assert_eq!(bucket_for(d, Granularity::Year).unwrap().as_deref(), Some("2023"));
        assert_eq!(bucket_for(d, Granularity::Week).unwrap().as_deref(), Some("2023-W10"));
        assert_eq!(bucket_for(None, Granularity::Month).unwrap(), None);
    }

    #[test]
    fn iso_week_belongs_to_previous_year_at_new_year() {
        assert_eq!(
            bucket_for(Some("2021-01-01"), Granularity::Week).unwrap().as_deref(),
            Some("2020-W53")
        );
    }

    #[test]
    fn month_bucket_rejects_garbage() {
        assert!(matches!(
            bucket_for(Some("not a date"), Granularity::Month),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn day_bucket_rejects_garbage() {
        assert!(matches!(
            bucket_for(Some("not-a-date"), Granularity::Day),
            Err(Error::InvalidDate(_))
        ));
        assert_eq!(
            bucket_for(Some("2023-03-07"), Granularity::Day).unwrap().as_deref(),
            Some("2023-03-07")
        );
    }

    #[test]
    fn range_at_end_of_calendar_fails_instead_of_overflowing() {
        let max = i32::MAX.to_string();
        assert!(matches!(
            generate_all_in_range(&max, &max, Granularity::Year),
            Err(Error::InvalidDate(_))
        ));
        let month = format!("{max}-12");
        assert!(matches!(
            generate_all_in_range(&month, &month, Granularity::Month),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn month_range_crosses_year_boundary() {
        let months = generate_all_in_range("2022-11", "2023-02", Granularity::Month).unwrap();
        assert_eq!(months, vec!["2022-11", "2022-12", "2023-01", "2023-02"]);
    }

    #[test]
    fn day_range_handles_leap_day() {
        let days = generate_all_in_range("2024-02-28", "2024-03-01", Granularity::Day).unwrap();
        assert_eq!(days, vec!["2024-02-28", "2024-02-29", "2024-03-01"]);
    }

    #[test]
    fn week_range_steps_seven_days() {
        let weeks = generate_all_in_range("2020-W52", "2021-W02", Granularity::Week).unwrap();
        assert_eq!(weeks, vec!["2020-W52", "2020-W53", "2021-W01", "2021-W02"]);
    }

    #[test]
    fn single_and_inverted_ranges() {
        assert_eq!(
            generate_all_in_range("2023", "2023", Granularity::Year).unwrap(),
            vec!["2023"]
        );
        assert!(generate_all_in_range("2024", "2023", Granularity::Year)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn range_endpoints_are_the_buckets_of_the_dates() {
        for g in [
            Granularity::Day,
            Granularity::Week,
            Granularity::Month,
            Granularity::Year,
        ] {
            let lo = bucket_for(Some("2021-12-30"), g).unwrap().unwrap();
            let hi = bucket_for(Some("2023-01-02"), g).unwrap().unwrap();
            let all = generate_all_in_range(&lo, &hi, g).unwrap();
            assert_eq!(all.first(), Some(&lo), "{g}");
            assert_eq!(all.last(), Some(&hi), "{g}");
        }
    }

    #[test]
    fn null_keys_sort_last() {
        assert_eq!(compare_bucket_keys(None, Some("2023")), Ordering::Greater);
        assert_eq!(compare_bucket_keys(Some("2023"), None), Ordering::Less);
        assert_eq!(compare_bucket_keys(Some("2022"), Some("2023")), Ordering::Less);
        assert_eq!(compare_bucket_keys(None, None), Ordering::Equal);
    }

    #[test]
    fn min_max_ignores_nulls() {
        let keys = [Some("2023-02"), None, Some("2022-12"), Some("2023-01")];
        assert_eq!(
            get_min_max_string(keys).unwrap(),
            ("2022-12".to_string(), "2023-02".to_string())
        );
        assert!(matches!(
            get_min_max_string([None, None]),
            Err(Error::EmptyRange)
        ));
    }

    #[test]
    fn granularity_parses_case_insensitively() {
        assert_eq!("Month".parse::<Granularity>().unwrap(), Granularity::Month);
        assert!("fortnight".parse::<Granularity>().is_err());
    }
}
