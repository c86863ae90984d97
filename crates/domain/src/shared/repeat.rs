use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::shared::{
    feasts::{self, FeastFn},
    recurrence::{RecurrenceError, RecurrenceRule},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepeatError {
    #[error("Invalid repeat token: {0}")]
    MalformedRepeat(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error(transparent)]
    Rule(#[from] RecurrenceError),
}

/// A resolved `FUNC:` token: the registry entry together with the name
/// it was requested under.
#[derive(Clone, Debug)]
pub struct Feast {
    name: String,
    func: FeastFn,
}

impl Feast {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// UTC midnight of the feast in the given year.
    pub fn date(&self, year: i32) -> DateTime<Utc> {
        (self.func)(year)
    }
}

/// The parsed form of a repeat string: any number of `RRULE:` clauses
/// and named `FUNC:` closed forms, composed by whitespace.
///
/// The empty repeat is valid and means "single occurrence".
#[derive(Clone, Debug, Default)]
pub struct Repeat {
    pub rules: Vec<RecurrenceRule>,
    pub funcs: Vec<Feast>,
}

impl Repeat {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.funcs.is_empty()
    }
}

impl FromStr for Repeat {
    type Err = RepeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut repeat = Repeat::default();

        for token in s.split_whitespace() {
            if let Some(body) = token.strip_prefix("RRULE:") {
                repeat.rules.push(body.parse()?);
            } else if let Some(name) = token.strip_prefix("FUNC:") {
                let func = feasts::feast_fn(name)
                    .ok_or_else(|| RepeatError::UnknownFunction(name.to_string()))?;
                repeat.funcs.push(Feast {
                    name: name.to_string(),
                    func,
                });
            } else {
                return Err(RepeatError::MalformedRepeat(token.to_string()));
            }
        }

        Ok(repeat)
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;
    use crate::shared::recurrence::Frequency;

    #[test]
    fn parses_a_single_rule() {
        let repeat: Repeat = "RRULE:FREQ=YEARLY;BYMONTH=4;BYDAY=1MO".parse().unwrap();
        assert_eq!(repeat.rules.len(), 1);
        assert!(repeat.funcs.is_empty());
        assert_eq!(repeat.rules[0].freq, Some(Frequency::Yearly));
        assert_eq!(repeat.rules[0].original, "FREQ=YEARLY;BYMONTH=4;BYDAY=1MO");
    }

    #[test]
    fn parses_a_single_function() {
        let repeat: Repeat = "FUNC:GoodFriday".parse().unwrap();
        assert!(repeat.rules.is_empty());
        assert_eq!(repeat.funcs.len(), 1);
        assert_eq!(repeat.funcs[0].name(), "GoodFriday");
        assert_eq!(
            repeat.funcs[0].date(2024),
            Utc.with_ymd_and_hms(2024, 3, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_mixed_rules_and_functions() {
        let repeat: Repeat = "RRULE:FREQ=YEARLY;BYMONTH=12;BYMONTHDAY=25 FUNC:GoodFriday"
            .parse()
            .unwrap();
        assert_eq!(repeat.rules.len(), 1);
        assert_eq!(repeat.funcs.len(), 1);
    }

    #[test]
    fn empty_input_is_a_single_occurrence() {
        let repeat: Repeat = "".parse().unwrap();
        assert!(repeat.is_empty());

        let repeat: Repeat = "  \n ".parse().unwrap();
        assert!(repeat.is_empty());
    }

    #[test]
    fn rejects_tokens_without_a_known_prefix() {
        assert!(matches!(
            "FREQ=YEARLY".parse::<Repeat>(),
            Err(RepeatError::MalformedRepeat(_))
        ));
    }

    #[test]
    fn rejects_unknown_functions() {
        assert!(matches!(
            "FUNC:Midsummer".parse::<Repeat>(),
            Err(RepeatError::UnknownFunction(name)) if name == "Midsummer"
        ));
    }

    #[test]
    fn propagates_rule_errors() {
        assert!(matches!(
            "RRULE:FREQ=DAILY;COUNT".parse::<Repeat>(),
            Err(RepeatError::Rule(RecurrenceError::MalformedPair(_)))
        ));
    }
}
