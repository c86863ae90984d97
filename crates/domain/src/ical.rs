use calendar_utils::config::APP_CONFIG;
use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::{date, event::Event, shared::entity::ID};

const PRODID: &str = "-//calendar//calendar domain//EN";

/// Generates iCalendar content for the given events, categorized per the
/// application configuration.
pub fn generate_ics(events: &[Event]) -> String {
    generate_ics_with_category(events, &APP_CONFIG.ics_category)
}

/// Generates iCalendar content for the given events.
///
/// All-day events (flagged, midnight-anchored and exactly 24 hours long)
/// are written in `VALUE=DATE` form; other events are written as UTC
/// instants, or as wall-clock times with a `TZID` parameter when the
/// event names a zone. Lines are CRLF-terminated and not folded.
pub fn generate_ics_with_category(events: &[Event], category: &str) -> String {
    let mut ical = String::new();

    ical.push_str("BEGIN:VCALENDAR\r\n");
    ical.push_str("VERSION:2.0\r\n");
    ical.push_str(&format!("PRODID:{}\r\n", PRODID));

    for event in events {
        ical.push_str(&generate_vevent(event, category));
    }

    ical.push_str("END:VCALENDAR\r\n");

    ical
}

fn generate_vevent(event: &Event, category: &str) -> String {
    let tz = match event.zone() {
        Ok(tz) => tz,
        Err(err) => {
            warn!("{}, writing event {} as UTC", err, event.id);
            Tz::UTC
        }
    };

    let mut ical = String::new();

    ical.push_str("BEGIN:VEVENT\r\n");
    ical.push_str(&format!("UID:{}\r\n", event.id));
    ical.push_str(&format!("CATEGORIES:{}\r\n", category));
    ical.push_str("CLASS:PUBLIC\r\n");
    ical.push_str("STATUS:CONFIRMED\r\n");
    ical.push_str(&format!("SUMMARY:{}\r\n", escape_ics(&event.name)));
    if !event.description.is_empty() {
        ical.push_str(&format!("DESCRIPTION:{}\r\n", escape_ics(&event.description)));
    }

    let from = event.date_from.with_timezone(&tz);
    let to = event.date_to.with_timezone(&tz);

    let is_all_day = event.all_day
        && is_midnight(&from)
        && is_midnight(&to)
        && to - from == Duration::hours(24);

    if is_all_day {
        ical.push_str("X-MICROSOFT-CDO-ALLDAYEVENT:TRUE\r\n");
        ical.push_str(&format!("DTSTART;VALUE=DATE:{}\r\n", from.format("%Y%m%d")));
        ical.push_str(&format!("DTEND;VALUE=DATE:{}\r\n", to.format("%Y%m%d")));
    } else if tz == Tz::UTC {
        ical.push_str(&format!(
            "DTSTART:{}\r\n",
            event.date_from.format("%Y%m%dT%H%M%SZ")
        ));
        ical.push_str(&format!(
            "DTEND:{}\r\n",
            event.date_to.format("%Y%m%dT%H%M%SZ")
        ));
    } else {
        ical.push_str(&format!(
            "DTSTART;TZID={}:{}\r\n",
            event.tz,
            from.format("%Y%m%dT%H%M%S")
        ));
        ical.push_str(&format!(
            "DTEND;TZID={}:{}\r\n",
            event.tz,
            to.format("%Y%m%dT%H%M%S")
        ));
    }

    if !event.rrule.is_empty() {
        ical.push_str(&format!("RRULE:{}\r\n", event.rrule));
    }
    ical.push_str("TRANSP:TRANSPARENT\r\n");
    ical.push_str("END:VEVENT\r\n");

    ical
}

fn is_midnight<T: Timelike>(t: &T) -> bool {
    t.hour() == 0 && t.minute() == 0 && t.second() == 0
}

/// Which text property a folded continuation line appends to.
#[derive(Clone, Copy, PartialEq)]
enum TextProp {
    None,
    Summary,
    Description,
}

/// Parses iCalendar content into events.
///
/// The reader is tolerant: it accepts LF or CRLF line endings, ignores
/// unknown properties and anything outside `BEGIN:VEVENT`/`END:VEVENT`,
/// does not require `END:VCALENDAR`, and treats unparsable date values
/// as absent. Date-times without `TZID` or a `Z` suffix are read in
/// `default_tz`, and committed events carry that zone's name.
pub fn parse_ics(data: &str, default_tz: Tz) -> Vec<Event> {
    let mut events = Vec::new();
    let mut in_event = false;
    let mut event = Event::default();
    let mut dt_start: Option<DateTime<Utc>> = None;
    let mut dt_end: Option<DateTime<Utc>> = None;
    let mut current = TextProp::None;

    for raw in data.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if line == "BEGIN:VEVENT" {
            in_event = true;
            event = Event::default();
            dt_start = None;
            dt_end = None;
            current = TextProp::None;
            continue;
        }
        if line == "END:VEVENT" && in_event {
            in_event = false;
            event.date_from = dt_start.unwrap_or_default();
            event.date_to = dt_end
                .or_else(|| dt_start.map(|t| t + Duration::hours(24)))
                .unwrap_or_default();
            event.tz = default_tz.name().to_string();
            events.push(std::mem::take(&mut event));
            continue;
        }
        if !in_event {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match current {
                TextProp::Summary => event.name.push_str(&unescape_ics(line.trim())),
                TextProp::Description => event.description.push_str(&unescape_ics(line.trim())),
                TextProp::None => {}
            }
        } else if let Some(value) = line.strip_prefix("UID:") {
            event.id = ID::from(value);
            current = TextProp::None;
        } else if let Some(value) = line.strip_prefix("SUMMARY:") {
            event.name = unescape_ics(value);
            current = TextProp::Summary;
        } else if let Some(value) = line.strip_prefix("DESCRIPTION:") {
            event.description = unescape_ics(value);
            current = TextProp::Description;
        } else if line.starts_with("DTSTART") {
            current = TextProp::None;
            let (parsed, is_date) = parse_dt_property(line, default_tz);
            dt_start = parsed;
            event.all_day |= is_date;
        } else if line.starts_with("DTEND") {
            current = TextProp::None;
            let (parsed, is_date) = parse_dt_property(line, default_tz);
            dt_end = parsed;
            event.all_day |= is_date;
        } else if let Some(value) = line.strip_prefix("RRULE:") {
            event.rrule = value.to_string();
            current = TextProp::None;
        } else {
            current = TextProp::None;
        }
    }

    events
}

/// Parse a `DTSTART`/`DTEND` line: the value follows the first `:`, the
/// parameters between `;` and `:` are scanned for `TZID=` and
/// `VALUE=DATE`. An unknown `TZID` falls back to the default zone.
fn parse_dt_property(line: &str, default_tz: Tz) -> (Option<DateTime<Utc>>, bool) {
    let Some((head, value)) = line.split_once(':') else {
        return (None, false);
    };

    let mut tz = default_tz;
    let mut is_date = false;
    for param in head.split(';').skip(1) {
        if let Some(tzid) = param.strip_prefix("TZID=") {
            match date::parse_timezone(tzid) {
                Ok(parsed) => tz = parsed,
                Err(err) => warn!("{}, falling back to {}", err, default_tz.name()),
            }
        } else if param.eq_ignore_ascii_case("VALUE=DATE") {
            is_date = true;
        }
    }

    (date::parse_datetime(value, tz).ok(), is_date)
}

/// Escapes special characters for ICS text fields
fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Reverses `escape_ics`
fn unescape_ics(s: &str) -> String {
    s.replace("\\n", "\n")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
}
