use calendar_utils::config::APP_CONFIG;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A dynamically typed value arriving from the query layer.
///
/// The service boundary collapses untyped request parameters into this
/// tagged form so that probes with the wrong shape fail before any
/// expansion work starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum QueryValue {
    Int(i64),
    Str(String),
    Time(DateTime<Utc>),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Query value has the wrong type: expected {expected}, got {got}")]
pub struct MisTaggedValue {
    expected: &'static str,
    got: &'static str,
}

impl QueryValue {
    fn kind(&self) -> &'static str {
        match self {
            QueryValue::Int(_) => "int",
            QueryValue::Str(_) => "string",
            QueryValue::Time(_) => "time",
        }
    }

    pub fn as_time(&self) -> Result<DateTime<Utc>, MisTaggedValue> {
        match self {
            QueryValue::Time(t) => Ok(*t),
            other => Err(MisTaggedValue {
                expected: "time",
                got: other.kind(),
            }),
        }
    }

    /// Years arrive either as integers or as numeric strings.
    pub fn as_year(&self) -> Result<i32, MisTaggedValue> {
        let err = |got| MisTaggedValue {
            expected: "year",
            got,
        };

        match self {
            QueryValue::Int(i) => i32::try_from(*i).map_err(|_| err("int")),
            QueryValue::Str(s) => s.parse::<i32>().map_err(|_| err("string")),
            QueryValue::Time(_) => Err(err("time")),
        }
    }
}

/// A question the expander answers: "does the event occur at this
/// instant?" or "which occurrences fall in these years?".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ExpandQuery {
    At(DateTime<Utc>),
    Years(Vec<i32>),
}

impl ExpandQuery {
    pub fn at(value: &QueryValue) -> Result<Self, MisTaggedValue> {
        value.as_time().map(ExpandQuery::At)
    }

    /// Build a year query from raw values; with no values, fall back to
    /// the configured window around the pivot year.
    pub fn years_from(values: &[QueryValue], pivot: i32) -> Result<Self, MisTaggedValue> {
        if values.is_empty() {
            return Ok(Self::years_around(pivot));
        }

        let years = values
            .iter()
            .map(QueryValue::as_year)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExpandQuery::Years(years))
    }

    /// The configured default window around a pivot year.
    pub fn years_around(pivot: i32) -> Self {
        let first = pivot - APP_CONFIG.expand_past_years;
        let last = pivot + APP_CONFIG.expand_future_years;

        ExpandQuery::Years((first..=last).collect())
    }
}
