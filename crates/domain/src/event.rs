use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    date,
    shared::{
        entity::{Entity, ID},
        query::ExpandQuery,
        repeat::Repeat,
    },
    timespan::TimeSpan,
};

/// A stored calendar event.
///
/// `date_from`/`date_to` are absolute instants (`date_to > date_from`);
/// for all-day events both are midnight in the event's zone, 24 hours
/// apart. `rrule` holds the repeat string - whitespace-composed
/// `RRULE:`/`FUNC:` tokens - and is empty for single occurrences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: ID,
    pub name: String,
    pub description: String,
    pub event_group: Option<String>,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    /// IANA zone the event is wall-clock authoritative in; empty means UTC.
    pub tz: String,
    pub all_day: bool,
    pub rrule: String,
    /// Soft-hide; the expansion engine treats the event as absent.
    pub disabled: bool,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl Entity<ID> for Event {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

/// Associates an event (by id) or an event group with an entity name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: ID,
    pub event_id: Option<ID>,
    pub event_group: Option<String>,
    pub entity: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl Entity<ID> for Relation {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

impl Event {
    /// The zone this event is wall-clock authoritative in.
    pub fn zone(&self) -> Result<Tz, date::UnknownTimezone> {
        date::parse_timezone(&self.tz)
    }

    /// Realize this event against a query: zero or more copies with
    /// `date_from`/`date_to` rewritten to the matched occurrence.
    ///
    /// Point queries may emit duplicates when several rules of the
    /// repeat cover the probe; the caller dedupes if it cares. Year
    /// queries emit at most one occurrence per rule, with `rrule`
    /// rewritten to the matching rule's verbatim body so the result
    /// re-emits losslessly as ICS.
    pub fn expand(&self, query: &ExpandQuery) -> anyhow::Result<Vec<Event>> {
        if self.disabled {
            return Ok(Vec::new());
        }

        let tz = self
            .zone()
            .with_context(|| format!("failed to resolve timezone of event {}", self.id))?;
        let date_from = self.date_from.with_timezone(&tz);
        let date_to = self.date_to.with_timezone(&tz);

        match query {
            ExpandQuery::At(at) => self.expand_at(date_from, date_to, at.with_timezone(&tz)),
            ExpandQuery::Years(years) => self.expand_years(tz, date_from, date_to, years),
        }
    }

    fn expand_at(
        &self,
        date_from: DateTime<Tz>,
        date_to: DateTime<Tz>,
        at: DateTime<Tz>,
    ) -> anyhow::Result<Vec<Event>> {
        let mut events = Vec::new();

        if self.rrule.trim().is_empty() {
            if at >= date_from && at < date_to {
                events.push(self.clone());
            }
            return Ok(events);
        }

        let repeat: Repeat = self
            .rrule
            .parse()
            .with_context(|| format!("failed to parse repeat of event {}", self.id))?;

        for rule in &repeat.rules {
            if let Some((start, stop)) = rule.point_match(date_from, date_to, at) {
                let mut event = self.clone();
                event.date_from = start.with_timezone(&Utc);
                event.date_to = stop.with_timezone(&Utc);
                events.push(event);
            }
        }

        let at_utc = at.with_timezone(&Utc);
        for feast in &repeat.funcs {
            let start = feast.date(at.year());
            let stop = start + Duration::days(1);
            if at_utc >= start && at_utc < stop {
                let mut event = self.clone();
                event.date_from = start;
                event.date_to = stop;
                events.push(event);
            }
        }

        Ok(events)
    }

    fn expand_years(
        &self,
        tz: Tz,
        date_from: DateTime<Tz>,
        date_to: DateTime<Tz>,
        years: &[i32],
    ) -> anyhow::Result<Vec<Event>> {
        let mut events = Vec::new();

        if self.rrule.trim().is_empty() {
            if years.contains(&date_from.year()) {
                events.push(self.clone());
            }
            return Ok(events);
        }

        let Some((min_year, max_year)) = years.iter().minmax().into_option() else {
            return Ok(events);
        };

        let repeat: Repeat = self
            .rrule
            .parse()
            .with_context(|| format!("failed to parse repeat of event {}", self.id))?;

        let window = year_span(tz, *min_year, *max_year)?;
        let probe = window.as_datetime(&tz);

        for rule in &repeat.rules {
            if let Some((start, stop)) = rule.window_match(date_from, date_to, probe.start, probe.end)
            {
                let mut event = self.clone();
                event.date_from = start.with_timezone(&Utc);
                event.date_to = stop.with_timezone(&Utc);
                event.rrule = rule.original.clone();
                events.push(event);
            }
        }

        for feast in &repeat.funcs {
            for &year in years {
                let start = feast.date(year);
                let stop = start + Duration::days(1);
                if start <= window.end() && stop >= window.start() {
                    let mut event = self.clone();
                    event.date_from = start;
                    event.date_to = stop;
                    event.rrule = String::new();
                    events.push(event);
                }
            }
        }

        Ok(events)
    }
}

/// The window `[Jan 1 of min_year, Jan 1 of max_year + 1)` in the given
/// zone.
fn year_span(tz: Tz, min_year: i32, max_year: i32) -> anyhow::Result<TimeSpan> {
    let start = tz
        .with_ymd_and_hms(min_year, 1, 1, 0, 0, 0)
        .earliest()
        .with_context(|| format!("no January 1st midnight in year {min_year}"))?;
    let end = tz
        .with_ymd_and_hms(max_year + 1, 1, 1, 0, 0, 0)
        .earliest()
        .with_context(|| format!("no January 1st midnight in year {}", max_year + 1))?;

    Ok(TimeSpan::new(
        start.with_timezone(&Utc),
        end.with_timezone(&Utc),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn istanbul_event(rrule: &str) -> Event {
        // 2021-11-10 00:00 in Istanbul (UTC+3), 24 hours long
        Event {
            id: ID::new(),
            name: "Anma Günü".to_string(),
            date_from: utc(2021, 11, 9, 21, 0, 0),
            date_to: utc(2021, 11, 10, 21, 0, 0),
            tz: "Europe/Istanbul".to_string(),
            all_day: true,
            rrule: rrule.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn disabled_events_expand_to_nothing() {
        let mut event = istanbul_event("RRULE:FREQ=YEARLY");
        event.disabled = true;

        let found = event
            .expand(&ExpandQuery::At(utc(2021, 11, 10, 0, 0, 0)))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn unknown_timezone_surfaces() {
        let mut event = istanbul_event("RRULE:FREQ=YEARLY");
        event.tz = "Atlantis/Lost_City".to_string();

        assert!(event.expand(&ExpandQuery::Years(vec![2024])).is_err());
    }

    #[test]
    fn single_occurrence_point_containment() {
        let event = istanbul_event("");

        let hit = event
            .expand(&ExpandQuery::At(utc(2021, 11, 10, 12, 0, 0)))
            .unwrap();
        assert_eq!(hit.len(), 1);

        let miss = event
            .expand(&ExpandQuery::At(utc(2021, 11, 11, 12, 0, 0)))
            .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn single_occurrence_year_containment() {
        let event = istanbul_event("");

        assert_eq!(event.expand(&ExpandQuery::Years(vec![2021])).unwrap().len(), 1);
        assert!(event
            .expand(&ExpandQuery::Years(vec![2020, 2022]))
            .unwrap()
            .is_empty());
        assert!(event.expand(&ExpandQuery::Years(vec![])).unwrap().is_empty());
    }

    #[test]
    fn yearly_rule_rewrites_the_occurrence_window() {
        let event = istanbul_event("RRULE:FREQ=YEARLY;COUNT=6");

        let found = event.expand(&ExpandQuery::Years(vec![2022])).unwrap();
        assert_eq!(found.len(), 1);
        // 2022-11-10 00:00 Istanbul
        assert_eq!(found[0].date_from, utc(2022, 11, 9, 21, 0, 0));
        assert_eq!(found[0].date_to, utc(2022, 11, 10, 21, 0, 0));
        // rrule rewritten to the matched rule body, ready for ICS emission
        assert_eq!(found[0].rrule, "FREQ=YEARLY;COUNT=6");
        // duration preserved
        assert_eq!(
            found[0].date_to - found[0].date_from,
            event.date_to - event.date_from
        );
    }

    #[test]
    fn point_query_keeps_the_stored_repeat_string() {
        let event = istanbul_event("RRULE:FREQ=YEARLY;COUNT=6");

        let found = event
            .expand(&ExpandQuery::At(utc(2023, 11, 10, 12, 0, 0)))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date_from, utc(2023, 11, 9, 21, 0, 0));
        assert_eq!(found[0].rrule, "RRULE:FREQ=YEARLY;COUNT=6");
    }

    #[test]
    fn overlapping_rules_may_duplicate_point_matches() {
        // 2024-05-19 is the third Sunday of May
        let event = Event {
            date_from: utc(2024, 5, 19, 0, 0, 0),
            date_to: utc(2024, 5, 20, 0, 0, 0),
            rrule: "RRULE:FREQ=YEARLY;BYMONTH=5;BYMONTHDAY=19 RRULE:FREQ=YEARLY;BYMONTH=5;BYDAY=3SU"
                .to_string(),
            ..Default::default()
        };

        let found = event
            .expand(&ExpandQuery::At(utc(2024, 5, 19, 6, 0, 0)))
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn feast_point_containment() {
        let event = Event {
            name: "Good Friday".to_string(),
            date_from: utc(2021, 4, 2, 0, 0, 0),
            date_to: utc(2021, 4, 3, 0, 0, 0),
            rrule: "FUNC:GoodFriday".to_string(),
            ..Default::default()
        };

        // Good Friday 2024 is March 29
        let hit = event
            .expand(&ExpandQuery::At(utc(2024, 3, 29, 10, 0, 0)))
            .unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].date_from, utc(2024, 3, 29, 0, 0, 0));
        assert_eq!(hit[0].date_to, utc(2024, 3, 30, 0, 0, 0));

        let miss = event
            .expand(&ExpandQuery::At(utc(2024, 3, 28, 10, 0, 0)))
            .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn feast_year_expansion_iterates_year_values() {
        let event = Event {
            name: "Good Friday".to_string(),
            date_from: utc(2021, 4, 2, 0, 0, 0),
            date_to: utc(2021, 4, 3, 0, 0, 0),
            rrule: "FUNC:GoodFriday".to_string(),
            ..Default::default()
        };

        let found = event
            .expand(&ExpandQuery::Years(vec![2024, 2025]))
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].date_from, utc(2024, 3, 29, 0, 0, 0));
        assert_eq!(found[1].date_from, utc(2025, 4, 18, 0, 0, 0));
        assert!(found[0].rrule.is_empty());
    }

    #[test]
    fn mixed_repeat_emits_rule_and_feast_occurrences() {
        let event = Event {
            date_from: utc(2021, 12, 25, 0, 0, 0),
            date_to: utc(2021, 12, 26, 0, 0, 0),
            rrule: "RRULE:FREQ=YEARLY;BYMONTH=12;BYMONTHDAY=25 FUNC:GoodFriday".to_string(),
            ..Default::default()
        };

        let found = event.expand(&ExpandQuery::Years(vec![2024])).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].date_from, utc(2024, 12, 25, 0, 0, 0));
        assert_eq!(found[1].date_from, utc(2024, 3, 29, 0, 0, 0));
    }

    #[test]
    fn malformed_repeat_surfaces() {
        let event = Event {
            date_from: utc(2024, 1, 1, 0, 0, 0),
            date_to: utc(2024, 1, 2, 0, 0, 0),
            rrule: "EVERY:Day".to_string(),
            ..Default::default()
        };

        assert!(event.expand(&ExpandQuery::Years(vec![2024])).is_err());
    }

    #[test]
    fn event_json_uses_camel_case_fields() {
        let event = istanbul_event("");
        let json = serde_json::to_value(&event).unwrap();

        assert!(json.get("dateFrom").is_some());
        assert!(json.get("eventGroup").is_some());
        assert!(json.get("allDay").is_some());

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back.date_from, event.date_from);
        assert_eq!(back.tz, event.tz);
    }
}
