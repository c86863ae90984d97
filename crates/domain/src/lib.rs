mod date;
mod event;
pub mod ical;
mod shared;
mod timespan;

pub use chrono::Weekday;
pub use chrono_tz::Tz;
pub use date::{
    InvalidDateTime,
    UnknownTimezone,
    add_by_freq,
    days_in_month,
    days_in_year,
    is_leap_year,
    parse_datetime,
    parse_timezone,
    weekday_token,
};
pub use event::{Event, Relation};
pub use ical::{generate_ics, generate_ics_with_category, parse_ics};
pub use shared::{
    entity::{Entity, ID},
    feasts::{FeastFn, easter_sunday, feast_fn},
    query::{ExpandQuery, MisTaggedValue, QueryValue},
    recurrence::{Frequency, RecurrenceError, RecurrenceRule, WeekDaySpec},
    repeat::{Feast, Repeat, RepeatError},
    years::{YearPattern, YearPatternError, check_date, check_year},
};
pub use timespan::{TimeSpan, TimeSpanDateTime};
