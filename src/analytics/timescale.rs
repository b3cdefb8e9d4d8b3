//! Rolling time windows
//!
//! Each timescale maps to a fixed number of buckets of a fixed width. Bucket
//! boundaries are computed backwards from "now" and truncated to the bucket
//! resolution in UTC.

use chrono::{
    DateTime, Datelike, DurationRound, Months, NaiveDate, NaiveTime, SecondsFormat, TimeDelta,
    Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timescale {
    Hour,
    Day,
    Month,
    Year,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown timescale '{0}', expected one of: hour, day, month, year")]
pub struct TimescaleParseError(pub String);

impl Timescale {
    pub const ALL: [Timescale; 4] = [
        Timescale::Hour,
        Timescale::Day,
        Timescale::Month,
        Timescale::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Timescale::Hour => "hour",
            Timescale::Day => "day",
            Timescale::Month => "month",
            Timescale::Year => "year",
        }
    }

    /// Bucket layout for this timescale
    pub fn window(self) -> TimeWindow {
        match self {
            Timescale::Hour => TimeWindow {
                bucket_count: 60,
                width: BucketWidth::Minute,
            },
            Timescale::Day => TimeWindow {
                bucket_count: 24,
                width: BucketWidth::Hour,
            },
            Timescale::Month => TimeWindow {
                bucket_count: 30,
                width: BucketWidth::Day,
            },
            Timescale::Year => TimeWindow {
                bucket_count: 12,
                width: BucketWidth::Month,
            },
        }
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timescale {
    type Err = TimescaleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" => Ok(Timescale::Hour),
            "day" => Ok(Timescale::Day),
            "month" => Ok(Timescale::Month),
            "year" => Ok(Timescale::Year),
            _ => Err(TimescaleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketWidth {
    Minute,
    Hour,
    Day,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub bucket_count: usize,
    pub width: BucketWidth,
}

impl TimeWindow {
    /// Start of the bucket `steps_back` buckets before the one containing `now`.
    ///
    /// `steps_back == 0` is the current, possibly partial, bucket.
    pub fn boundary_at(&self, now: DateTime<Utc>, steps_back: u32) -> DateTime<Utc> {
        match self.width {
            BucketWidth::Minute => {
                truncate(now, TimeDelta::minutes(1)) - TimeDelta::minutes(i64::from(steps_back))
            }
            BucketWidth::Hour => {
                truncate(now, TimeDelta::hours(1)) - TimeDelta::hours(i64::from(steps_back))
            }
            BucketWidth::Day => {
                truncate(now, TimeDelta::days(1)) - TimeDelta::days(i64::from(steps_back))
            }
            BucketWidth::Month => {
                let first_of_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
                    .unwrap_or_else(|| now.date_naive())
                    .and_time(NaiveTime::MIN)
                    .and_utc();
                first_of_month
                    .checked_sub_months(Months::new(steps_back))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC)
            }
        }
    }

    /// Human-readable bucket label. Cosmetic only.
    pub fn format_label(&self, boundary: DateTime<Utc>) -> String {
        let pattern = match self.width {
            BucketWidth::Minute => "%H:%M",
            BucketWidth::Hour => "%H:00",
            BucketWidth::Day => "%b %d",
            BucketWidth::Month => "%b",
        };
        boundary.format(pattern).to_string()
    }
}

fn truncate(now: DateTime<Utc>, resolution: TimeDelta) -> DateTime<Utc> {
    now.duration_trunc(resolution).unwrap_or(now)
}

/// Key under which the backend stores a bucket, e.g. `2024-01-01T00:00:00Z`
pub fn boundary_key(boundary: DateTime<Utc>) -> String {
    boundary.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One value per timescale, addressed by an exhaustive match instead of by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTimescale<T> {
    pub hour: T,
    pub day: T,
    pub month: T,
    pub year: T,
}

impl<T> PerTimescale<T> {
    pub fn from_fn(mut f: impl FnMut(Timescale) -> T) -> Self {
        Self {
            hour: f(Timescale::Hour),
            day: f(Timescale::Day),
            month: f(Timescale::Month),
            year: f(Timescale::Year),
        }
    }

    pub fn get(&self, timescale: Timescale) -> &T {
        match timescale {
            Timescale::Hour => &self.hour,
            Timescale::Day => &self.day,
            Timescale::Month => &self.month,
            Timescale::Year => &self.year,
        }
    }

    pub fn get_mut(&mut self, timescale: Timescale) -> &mut T {
        match timescale {
            Timescale::Hour => &mut self.hour,
            Timescale::Day => &mut self.day,
            Timescale::Month => &mut self.month,
            Timescale::Year => &mut self.year,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Timescale, &T) -> U) -> PerTimescale<U> {
        PerTimescale::from_fn(|timescale| f(timescale, self.get(timescale)))
    }

    pub fn into_map<U>(self, mut f: impl FnMut(Timescale, T) -> U) -> PerTimescale<U> {
        PerTimescale {
            hour: f(Timescale::Hour, self.hour),
            day: f(Timescale::Day, self.day),
            month: f(Timescale::Month, self.month),
            year: f(Timescale::Year, self.year),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timescale, &T)> {
        Timescale::ALL
            .into_iter()
            .map(move |timescale| (timescale, self.get(timescale)))
    }
}

impl<T> IntoIterator for PerTimescale<T> {
    type Item = (Timescale, T);
    type IntoIter = std::array::IntoIter<(Timescale, T), 4>;

    fn into_iter(self) -> Self::IntoIter {
        [
            (Timescale::Hour, self.hour),
            (Timescale::Day, self.day),
            (Timescale::Month, self.month),
            (Timescale::Year, self.year),
        ]
        .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_bucket_counts() {
        assert_eq!(Timescale::Hour.window().bucket_count, 60);
        assert_eq!(Timescale::Day.window().bucket_count, 24);
        assert_eq!(Timescale::Month.window().bucket_count, 30);
        assert_eq!(Timescale::Year.window().bucket_count, 12);
    }

    #[test]
    fn test_hour_boundaries_truncate_to_minute() {
        let window = Timescale::Hour.window();
        let now = at(2024, 1, 1, 0, 0, 30);

        assert_eq!(window.boundary_at(now, 0), at(2024, 1, 1, 0, 0, 0));
        assert_eq!(window.boundary_at(now, 1), at(2023, 12, 31, 23, 59, 0));
        assert_eq!(window.boundary_at(now, 59), at(2023, 12, 31, 23, 1, 0));
    }

    #[test]
    fn test_day_and_month_boundaries() {
        let now = at(2024, 3, 1, 5, 42, 10);

        assert_eq!(Timescale::Day.window().boundary_at(now, 6), at(2024, 2, 29, 23, 0, 0));
        assert_eq!(Timescale::Month.window().boundary_at(now, 1), at(2024, 2, 29, 0, 0, 0));
    }

    #[test]
    fn test_year_boundaries_step_calendar_months() {
        let window = Timescale::Year.window();
        let now = at(2024, 3, 31, 12, 0, 0);

        assert_eq!(window.boundary_at(now, 0), at(2024, 3, 1, 0, 0, 0));
        assert_eq!(window.boundary_at(now, 1), at(2024, 2, 1, 0, 0, 0));
        assert_eq!(window.boundary_at(now, 11), at(2023, 4, 1, 0, 0, 0));
    }

    #[test]
    fn test_labels() {
        let boundary = at(2024, 7, 4, 9, 5, 0);
        assert_eq!(Timescale::Hour.window().format_label(boundary), "09:05");
        assert_eq!(Timescale::Day.window().format_label(boundary), "09:00");
        assert_eq!(Timescale::Month.window().format_label(boundary), "Jul 04");
        assert_eq!(Timescale::Year.window().format_label(boundary), "Jul");
    }

    #[test]
    fn test_boundary_key_format() {
        assert_eq!(boundary_key(at(2024, 1, 1, 0, 0, 0)), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_timescale() {
        assert_eq!("Hour".parse::<Timescale>(), Ok(Timescale::Hour));
        assert_eq!("year".parse::<Timescale>(), Ok(Timescale::Year));
        assert!("week".parse::<Timescale>().is_err());
    }

    #[test]
    fn test_per_timescale_dispatch() {
        let counts = PerTimescale::from_fn(|t| t.window().bucket_count);
        assert_eq!(*counts.get(Timescale::Month), 30);

        let names: Vec<&str> = counts.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["hour", "day", "month", "year"]);
    }
}
