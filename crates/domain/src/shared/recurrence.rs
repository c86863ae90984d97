use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, de::Visitor};
use thiserror::Error;

use crate::date::{self, InvalidDateTime};

/// Frequency of a recurrence rule (RFC 5545 FREQ)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SECONDLY" => Ok(Frequency::Secondly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            _ => Err(RecurrenceError::InvalidFrequency(s.to_string())),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        };
        write!(f, "{}", token)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecurrenceError {
    #[error("Malformed RRULE part: {0}")]
    MalformedPair(String),

    #[error("Invalid integer for {key}: {value}")]
    InvalidInt { key: String, value: String },

    #[error(transparent)]
    InvalidDateTime(#[from] InvalidDateTime),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Malformed weekday: {0}")]
    InvalidWeekDay(String),
}

/// A BYDAY entry: a weekday with an optional signed ordinal
/// (`TU`, `1MO`, `-1SU`). The ordinal is only meaningful under a
/// monthly or yearly frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeekDaySpec {
    ordinal: Option<i32>,
    weekday: Weekday,
}

impl WeekDaySpec {
    pub fn new(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    pub fn new_nth(weekday: Weekday, n: i32) -> Option<Self> {
        if n == 0 || !(-53..=53).contains(&n) {
            return None;
        }
        Some(Self {
            ordinal: Some(n),
            weekday,
        })
    }

    pub fn ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }
}

impl FromStr for WeekDaySpec {
    type Err = RecurrenceError;

    fn from_str(day: &str) -> Result<Self, Self::Err> {
        let e = || RecurrenceError::InvalidWeekDay(day.to_string());

        if !day.is_ascii() || day.len() < 2 {
            return Err(e());
        }

        let (prefix, token) = day.split_at(day.len() - 2);
        let weekday = date::weekday_from_token(token).ok_or_else(e)?;
        if prefix.is_empty() {
            return Ok(WeekDaySpec::new(weekday));
        }

        let n = prefix.parse::<i32>().map_err(|_| e())?;
        WeekDaySpec::new_nth(weekday, n).ok_or_else(e)
    }
}

impl Display for WeekDaySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ordinal {
            Some(n) => write!(f, "{}{}", n, date::weekday_token(self.weekday)),
            None => write!(f, "{}", date::weekday_token(self.weekday)),
        }
    }
}

impl Serialize for WeekDaySpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WeekDaySpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct WeekDayVisitor;

        impl Visitor<'_> for WeekDayVisitor {
            type Value = WeekDaySpec;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("A valid string representation of weekday")
            }

            fn visit_str<E>(self, value: &str) -> Result<WeekDaySpec, E>
            where
                E: serde::de::Error,
            {
                value
                    .parse::<WeekDaySpec>()
                    .map_err(|_| E::custom(format!("Malformed weekday: {}", value)))
            }
        }

        deserializer.deserialize_str(WeekDayVisitor)
    }
}

/// A single parsed RFC 5545 RRULE body.
///
/// Immutable after parse; the occurrence engine evaluates it without
/// touching shared state. A rule without a frequency never matches but
/// is not an error, so absent and inert rules can be handled uniformly.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecurrenceRule {
    pub freq: Option<Frequency>,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    pub by_second: Vec<u32>,
    pub by_minute: Vec<u32>,
    pub by_hour: Vec<u32>,
    pub by_day: Vec<WeekDaySpec>,
    pub by_month_day: Vec<i32>,
    pub by_year_day: Vec<i32>,
    pub by_week_no: Vec<i32>,
    pub by_month: Vec<u32>,
    pub by_set_pos: Vec<i32>,
    pub wkst: Weekday,
    /// Verbatim pre-parse body, kept for lossless re-emission.
    pub original: String,
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self {
            freq: None,
            interval: 1,
            count: None,
            until: None,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
            wkst: Weekday::Mon,
            original: String::new(),
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = RecurrenceError;

    /// Parse the body following `RRULE:` - a `;`-separated list of
    /// `KEY=VALUE` pairs. Keys are case-insensitive, unknown keys are
    /// dropped, empty segments are tolerated, and a segment without `=`
    /// is fatal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rule = RecurrenceRule {
            original: s.to_string(),
            ..Default::default()
        };

        for part in s.split(';') {
            if part.is_empty() {
                continue;
            }

            let Some((key, value)) = part.split_once('=') else {
                return Err(RecurrenceError::MalformedPair(part.to_string()));
            };

            match key.to_uppercase().as_str() {
                "FREQ" => rule.freq = Some(value.parse()?),
                "UNTIL" => rule.until = Some(date::parse_datetime(value, Tz::UTC)?),
                "COUNT" => rule.count = Some(parse_int(key, value)?),
                "INTERVAL" => rule.interval = parse_int::<u32>(key, value)?.max(1),
                "BYSECOND" => rule.by_second = parse_int_list(key, value)?,
                "BYMINUTE" => rule.by_minute = parse_int_list(key, value)?,
                "BYHOUR" => rule.by_hour = parse_int_list(key, value)?,
                "BYDAY" => {
                    rule.by_day = value
                        .split(',')
                        .map(WeekDaySpec::from_str)
                        .collect::<Result<_, _>>()?;
                }
                "BYMONTHDAY" => rule.by_month_day = parse_int_list(key, value)?,
                "BYYEARDAY" => rule.by_year_day = parse_int_list(key, value)?,
                "BYWEEKNO" => rule.by_week_no = parse_int_list(key, value)?,
                "BYMONTH" => rule.by_month = parse_int_list(key, value)?,
                "BYSETPOS" => rule.by_set_pos = parse_int_list(key, value)?,
                "WKST" => {
                    rule.wkst = date::weekday_from_token(value)
                        .ok_or_else(|| RecurrenceError::InvalidWeekDay(value.to_string()))?;
                }
                _ => {}
            }
        }

        Ok(rule)
    }
}

fn parse_int<T: FromStr>(key: &str, value: &str) -> Result<T, RecurrenceError> {
    value.parse::<T>().map_err(|_| RecurrenceError::InvalidInt {
        key: key.to_uppercase(),
        value: value.to_string(),
    })
}

fn parse_int_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>, RecurrenceError> {
    value.split(',').map(|v| parse_int(key, v)).collect()
}
