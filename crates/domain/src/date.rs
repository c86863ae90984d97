use chrono::{
    DateTime,
    Datelike,
    Days,
    Duration,
    Months,
    NaiveDate,
    NaiveDateTime,
    TimeZone,
    Timelike,
    Utc,
    Weekday,
};
use chrono_tz::Tz;
use thiserror::Error;

use crate::shared::recurrence::Frequency;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown timezone: {0}")]
pub struct UnknownTimezone(pub String);

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid datetime: {0}")]
pub struct InvalidDateTime(pub String);

/// Resolve an IANA timezone name. The empty string means UTC.
pub fn parse_timezone(name: &str) -> Result<Tz, UnknownTimezone> {
    if name.is_empty() {
        return Ok(Tz::UTC);
    }

    name.parse::<Tz>()
        .map_err(|_| UnknownTimezone(name.to_string()))
}

/// Parse an RFC 5545 date or date-time value into a UTC instant.
///
/// Accepted forms:
/// - `YYYYMMDDTHHMMSSZ` - UTC
/// - `YYYYMMDDTHHMMSS` - wall clock in `tz`
/// - `YYYYMMDD` - midnight in `tz`
pub fn parse_datetime(s: &str, tz: Tz) -> Result<DateTime<Utc>, InvalidDateTime> {
    let err = || InvalidDateTime(s.to_string());

    if let Some(stripped) = s.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").map_err(|_| err())?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if s.len() == 8 {
        let naive = NaiveDate::parse_from_str(s, "%Y%m%d")
            .map_err(|_| err())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(err)?;
        return localize(tz, naive)
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(err);
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").map_err(|_| err())?;
    localize(tz, naive)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(err)
}

/// The two-letter RFC 5545 token for a weekday.
pub fn weekday_token(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}

pub fn weekday_from_token(token: &str) -> Option<Weekday> {
    match token.to_uppercase().as_str() {
        "SU" => Some(Weekday::Sun),
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        _ => None,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Rebuild `base` on another calendar date, carrying its time of day.
///
/// Returns `None` when the wall-clock time does not exist in the zone
/// (DST gap) or the date is out of range.
pub fn on_date(base: &DateTime<Tz>, year: i32, month: u32, day: u32) -> Option<DateTime<Tz>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(
        base.hour(),
        base.minute(),
        base.second(),
    )?;

    base.timezone().from_local_datetime(&naive).earliest()
}

/// The day starting `t`'s week, given the week-start weekday.
pub fn start_of_week(t: &DateTime<Tz>, wkst: Weekday) -> Option<DateTime<Tz>> {
    let delta =
        (7 + t.weekday().num_days_from_monday() - wkst.num_days_from_monday()) % 7;
    let date = t.date_naive().checked_sub_days(Days::new(u64::from(delta)))?;

    on_date(t, date.year(), date.month(), date.day())
}

/// Rebuild `t` in another year, keeping all other fields. Feb 29 clamps
/// to Feb 28 in non-leap years.
pub fn change_year(t: &DateTime<Tz>, year: i32) -> Option<DateTime<Tz>> {
    let day = t.day().min(days_in_month(year, t.month()));

    on_date(t, year, t.month(), day)
}

/// Step an instant forward by one recurrence period.
///
/// Day-and-coarser steps are wall-clock calendar arithmetic in the
/// instant's zone; month and year steps clamp the day of month
/// (Feb 29 + 1 year lands on Feb 28 in a non-leap year).
pub fn add_by_freq(t: &DateTime<Tz>, freq: Frequency, interval: u32) -> DateTime<Tz> {
    let interval = interval.max(1);

    match freq {
        Frequency::Secondly => *t + Duration::seconds(i64::from(interval)),
        Frequency::Minutely => *t + Duration::minutes(i64::from(interval)),
        Frequency::Hourly => *t + Duration::hours(i64::from(interval)),
        Frequency::Daily | Frequency::Weekly | Frequency::Monthly | Frequency::Yearly => {
            let naive = t.naive_local();
            let shifted = match freq {
                Frequency::Daily => naive.checked_add_days(Days::new(u64::from(interval))),
                Frequency::Weekly => naive.checked_add_days(Days::new(7 * u64::from(interval))),
                Frequency::Monthly => naive.checked_add_months(Months::new(interval)),
                _ => naive.checked_add_months(Months::new(interval.saturating_mul(12))),
            };

            match shifted.and_then(|n| localize(t.timezone(), n)) {
                Some(dt) => dt,
                // Unresolvable wall-clock time; fall back to absolute
                // arithmetic so the outer walk keeps moving forward.
                None => {
                    let step_days = match freq {
                        Frequency::Daily => 1,
                        Frequency::Weekly => 7,
                        Frequency::Monthly => 31,
                        _ => 366,
                    };
                    *t + Duration::days(i64::from(interval) * step_days)
                }
            }
        }
    }
}

/// Attach a zone to a wall-clock time. DST-ambiguous times resolve to the
/// earlier instant; times inside a DST gap are shifted past it.
fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}
